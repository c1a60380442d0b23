//! Document index catalog store
//!
//! Implements `RemoteCatalogStore` over the index's REST JSON API.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use core_library::models::{dedup_last_wins, CatalogEntry};
use core_library::{LibraryError, RemoteCatalogStore};
use core_runtime::config::DocumentIndexConfig;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{DocumentIndexError, Result};
use crate::types::{DocumentsListResponse, IndexDocument};

/// Requests kept in flight while writing or deleting a batch
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Per-request timeout for index calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote catalog mirror backed by a REST document index
///
/// # Example
///
/// ```ignore
/// use provider_document_index::DocumentIndexCatalogStore;
/// use core_library::RemoteCatalogStore;
///
/// let store = DocumentIndexCatalogStore::new(http_client, &config.document_index)?;
/// store.delete_all().await?;
/// store.add_entries(&entries).await?;
/// ```
pub struct DocumentIndexCatalogStore {
    http_client: Arc<dyn HttpClient>,

    /// `{base_url}/collections/{collection}/documents`
    collection_url: Url,

    /// Optional bearer API key
    api_key: Option<String>,

    retry_policy: RetryPolicy,
    max_in_flight: usize,
}

impl DocumentIndexCatalogStore {
    /// Create a store for the configured collection
    ///
    /// # Errors
    ///
    /// Returns [`DocumentIndexError::InvalidBaseUrl`] if the base URL does not
    /// parse or cannot carry a path.
    pub fn new(http_client: Arc<dyn HttpClient>, config: &DocumentIndexConfig) -> Result<Self> {
        let invalid = || DocumentIndexError::InvalidBaseUrl(config.base_url.clone());

        let mut collection_url = Url::parse(&config.base_url).map_err(|_| invalid())?;
        collection_url
            .path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["collections", config.collection.trim(), "documents"]);

        Ok(Self {
            http_client,
            collection_url,
            api_key: config.api_key.clone(),
            retry_policy: RetryPolicy::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        })
    }

    /// Replace the retry policy used for every request
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Bound the number of concurrent writes or deletes
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = limit.max(1);
        self
    }

    fn document_url(&self, id: &str) -> String {
        let mut url = self.collection_url.clone();
        // The collection URL was validated as hierarchical in `new`.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id);
        }
        url.to_string()
    }

    fn request(&self, method: HttpMethod, url: &str) -> HttpRequest {
        let request = HttpRequest::new(method, url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        match &self.api_key {
            Some(key) => request.bearer_token(key.as_str()),
            None => request,
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        Ok(self
            .http_client
            .execute_with_retry(request, self.retry_policy.clone())
            .await?)
    }

    fn api_error(response: &HttpResponse, url: &str) -> DocumentIndexError {
        warn!(status = response.status, url = %url, "Document index request failed");
        DocumentIndexError::ApiError {
            status_code: response.status,
            url: url.to_string(),
        }
    }

    async fn fetch_documents(&self) -> Result<Vec<IndexDocument>> {
        let url = self.collection_url.to_string();
        let response = self.send(self.request(HttpMethod::Get, &url)).await?;

        if !response.is_success() {
            return Err(Self::api_error(&response, &url));
        }

        let listing: DocumentsListResponse = serde_json::from_slice(&response.body)
            .map_err(|e| DocumentIndexError::ParseError(e.to_string()))?;

        Ok(listing.documents)
    }

    async fn put_document(&self, document: IndexDocument) -> Result<()> {
        let url = self.document_url(&document.id);
        let request = self.request(HttpMethod::Put, &url).json(&document)?;
        let response = self.send(request).await?;

        if !response.is_success() {
            return Err(Self::api_error(&response, &url));
        }

        debug!(id = %document.id, "Stored index document");
        Ok(())
    }

    /// Returns `false` when the document was already gone.
    async fn delete_document(&self, id: String) -> Result<bool> {
        let url = self.document_url(&id);
        let response = self.send(self.request(HttpMethod::Delete, &url)).await?;

        match response.status {
            404 => Ok(false),
            _ if response.is_success() => Ok(true),
            _ => Err(Self::api_error(&response, &url)),
        }
    }
}

#[async_trait]
impl RemoteCatalogStore for DocumentIndexCatalogStore {
    #[instrument(skip(self))]
    async fn delete_all(&self) -> core_library::Result<()> {
        let ids: Vec<String> = self
            .fetch_documents()
            .await?
            .into_iter()
            .map(|document| document.id)
            .collect();
        let total = ids.len();

        let deleted: Vec<bool> = stream::iter(ids)
            .map(|id| self.delete_document(id))
            .buffer_unordered(self.max_in_flight)
            .try_collect()
            .await?;

        let removed = deleted.into_iter().filter(|gone| *gone).count();
        info!(total, removed, "Cleared document index collection");
        Ok(())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn add_entries(&self, entries: &[CatalogEntry]) -> core_library::Result<()> {
        let (entries, duplicates) = dedup_last_wins(entries);
        if !duplicates.is_empty() {
            warn!(?duplicates, "Duplicate ids in batch, keeping the last occurrence");
        }

        for entry in &entries {
            entry
                .validate()
                .map_err(|message| LibraryError::InvalidInput {
                    field: "entry".to_string(),
                    message,
                })?;
        }

        let documents: Vec<IndexDocument> = entries.iter().map(IndexDocument::from).collect();
        let written = documents.len();
        stream::iter(documents)
            .map(|document| self.put_document(document))
            .buffer_unordered(self.max_in_flight)
            .try_collect::<Vec<()>>()
            .await?;

        info!(written, "Stored catalog entries in document index");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_all(&self) -> core_library::Result<Vec<CatalogEntry>> {
        let entries = self
            .fetch_documents()
            .await?
            .into_iter()
            .map(CatalogEntry::try_from)
            .collect::<Result<Vec<_>>>()?;

        debug!(count = entries.len(), "Fetched document index collection");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::DynAsyncRead;
    use bytes::Bytes;
    use core_library::models::Audience;
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::Mutex;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn download_stream(&self, url: String) -> BridgeResult<Box<DynAsyncRead>>;
        }
    }

    type Recorded = Arc<Mutex<Vec<(HttpMethod, String, Option<Bytes>)>>>;

    fn response(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            use_exponential_backoff: true,
        }
    }

    fn config() -> DocumentIndexConfig {
        DocumentIndexConfig::new("https://index.example.com/v1/").with_api_key("index-key")
    }

    fn store(http: MockHttpClient) -> DocumentIndexCatalogStore {
        DocumentIndexCatalogStore::new(Arc::new(http), &config())
            .unwrap()
            .with_retry_policy(fast_retry())
    }

    fn entry(id: &str, url: &str) -> CatalogEntry {
        CatalogEntry::new(id, id, Audience::Child, url)
    }

    const LISTING: &str = r#"{"documents": [
        {"id": "Alpha", "title": "Alpha", "role": "child",
         "document_url": "https://raw.example.com/child/Alpha.pdf"},
        {"id": "Guide", "title": "Guide", "role": "Parent",
         "document_url": "https://raw.example.com/parent/Guide.pdf"}
    ]}"#;

    #[test]
    fn test_document_urls() {
        let store = store(MockHttpClient::new());

        assert_eq!(
            store.collection_url.as_str(),
            "https://index.example.com/v1/collections/books/documents"
        );
        assert_eq!(
            store.document_url("Bedtime#2"),
            "https://index.example.com/v1/collections/books/documents/Bedtime%232"
        );
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        let config = DocumentIndexConfig::new("mailto:index@example.com");
        let result = DocumentIndexCatalogStore::new(Arc::new(MockHttpClient::new()), &config);

        assert!(matches!(result, Err(DocumentIndexError::InvalidBaseUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_all_parses_documents() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Get);
            assert_eq!(
                req.headers.get("Authorization"),
                Some(&"Bearer index-key".to_string())
            );
            Ok(response(200, LISTING))
        });

        let entries = store(mock_http).fetch_all().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].audience, Audience::Child);
        assert_eq!(entries[1].audience, Audience::Parent);
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_unknown_role() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|_| {
            Ok(response(
                200,
                r#"{"documents": [{"id": "X", "title": "X", "role": "grandparent", "document_url": "https://x"}]}"#,
            ))
        });

        let result = store(mock_http).fetch_all().await;

        assert!(matches!(
            result,
            Err(LibraryError::Bridge(BridgeError::Decode(_)))
        ));
    }

    #[tokio::test]
    async fn test_add_entries_writes_last_duplicate_once() {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();

        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(2).returning(move |req| {
            sink.lock()
                .unwrap()
                .push((req.method, req.url.clone(), req.body.clone()));
            Ok(response(200, "{}"))
        });

        let entries = vec![
            entry("Alpha", "https://raw.example.com/child/old.pdf"),
            entry("Beta", "https://raw.example.com/child/Beta.pdf"),
            entry("Alpha", "https://raw.example.com/child/Alpha.pdf"),
        ];
        store(mock_http).add_entries(&entries).await.unwrap();

        let mut calls = recorded.lock().unwrap().clone();
        calls.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(method, _, _)| *method == HttpMethod::Put));
        assert!(calls[0].1.ends_with("/documents/Alpha"));

        let body: IndexDocument = serde_json::from_slice(calls[0].2.as_ref().unwrap()).unwrap();
        assert_eq!(body.document_url, "https://raw.example.com/child/Alpha.pdf");
        assert_eq!(body.role, "child");
    }

    #[tokio::test]
    async fn test_add_entries_rejects_invalid_entry_before_writing() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(0);

        let entries = vec![entry("Alpha", "https://raw.example.com/Alpha.pdf"), entry("Beta", "")];
        let result = store(mock_http).add_entries(&entries).await;

        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_add_entries_surfaces_write_failure() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(400, r#"{"error": "bad document"}"#)));

        let result = store(mock_http)
            .add_entries(&[entry("Alpha", "https://raw.example.com/Alpha.pdf")])
            .await;

        assert!(matches!(
            result,
            Err(LibraryError::Bridge(BridgeError::HttpStatus { status: 400, .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete_all_treats_missing_documents_as_deleted() {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();

        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(3).returning(move |req| {
            sink.lock().unwrap().push((req.method, req.url.clone(), None));
            match req.method {
                HttpMethod::Get => Ok(response(200, LISTING)),
                _ if req.url.ends_with("/Guide") => Ok(response(404, "")),
                _ => Ok(response(204, "")),
            }
        });

        store(mock_http).delete_all().await.unwrap();

        let calls = recorded.lock().unwrap();
        let deletes = calls
            .iter()
            .filter(|(method, _, _)| *method == HttpMethod::Delete)
            .count();
        assert_eq!(deletes, 2);
    }

    #[tokio::test]
    async fn test_delete_all_retries_then_fails() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(3)
            .returning(|_| Ok(response(500, "boom")));

        let result = store(mock_http).delete_all().await;

        assert!(matches!(
            result,
            Err(LibraryError::Bridge(BridgeError::HttpStatus { status: 500, .. }))
        ));
    }

    #[tokio::test]
    async fn test_empty_collection_makes_no_deletes() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, r#"{"documents": []}"#)));

        store(mock_http).delete_all().await.unwrap();
    }
}
