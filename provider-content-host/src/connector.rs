//! Content host connector implementation
//!
//! Implements the `StorageProvider` trait for folder-listing JSON APIs.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use bridge_traits::storage::{RemoteFile, StorageProvider};
use core_runtime::config::ContentHostConfig;
use core_runtime::logging::redact_url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::ContentHostError;
use crate::types::ContentsItem;

/// Per-request timeout for listing calls
const LISTING_TIMEOUT: Duration = Duration::from_secs(30);

/// Content host connector
///
/// Lists one folder per call with `GET {base_url}/{path}`.
///
/// # Example
///
/// ```ignore
/// use provider_content_host::ContentHostConnector;
/// use bridge_traits::storage::StorageProvider;
///
/// let connector = ContentHostConnector::new(http_client, &config.content_host);
/// let files = connector.list_directory("child").await?;
/// ```
pub struct ContentHostConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Listing root without a trailing slash
    base_url: String,

    /// Optional bearer token
    auth_token: Option<String>,

    retry_policy: RetryPolicy,
}

impl ContentHostConnector {
    /// Create a new connector for the configured host
    pub fn new(http_client: Arc<dyn HttpClient>, config: &ContentHostConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy used for listing requests
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    fn listing_url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn build_request(&self, url: &str) -> HttpRequest {
        let request = HttpRequest::new(HttpMethod::Get, url)
            .header("Accept", "application/json")
            .timeout(LISTING_TIMEOUT);

        match &self.auth_token {
            Some(token) => request.bearer_token(token.as_str()),
            None => request,
        }
    }

    fn convert_item(item: ContentsItem) -> RemoteFile {
        let is_folder = item.is_folder();
        RemoteFile {
            name: item.name,
            path: item.path,
            download_url: item.download_url.filter(|url| !url.trim().is_empty()),
            size: item.size,
            is_folder,
        }
    }

    /// Fetch and parse one folder listing
    async fn fetch_listing(&self, path: &str) -> std::result::Result<Vec<ContentsItem>, ContentHostError> {
        let url = self.listing_url(path);
        let response = self
            .http_client
            .execute_with_retry(self.build_request(&url), self.retry_policy.clone())
            .await?;

        if !response.is_success() {
            warn!(
                status = response.status,
                url = %redact_url(&url),
                "Content host listing failed"
            );
            return Err(ContentHostError::ApiError {
                status_code: response.status,
                url: redact_url(&url).to_string(),
            });
        }

        let body: serde_json::Value = serde_json::from_slice(&response.body)
            .map_err(|e| ContentHostError::ParseError(e.to_string()))?;

        if !body.is_array() {
            return Err(ContentHostError::NotAFolder {
                path: path.to_string(),
            });
        }

        serde_json::from_value(body).map_err(|e| ContentHostError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl StorageProvider for ContentHostConnector {
    #[instrument(skip(self))]
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteFile>> {
        debug!("Listing content host folder");

        let items = self.fetch_listing(path).await?;
        let files: Vec<RemoteFile> = items.into_iter().map(Self::convert_item).collect();

        info!(entries = files.len(), "Listed content host folder");
        Ok(files)
    }
}
