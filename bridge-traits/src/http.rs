//! HTTP Client Abstraction
//!
//! Async HTTP operations used to list remote catalogs, mirror them into the
//! document index and download document bytes.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::platform::DynAsyncRead;

/// Methods the catalog and document-index clients issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Delete,
}

/// A buffered request. `timeout` overrides the client's default.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// A fully buffered response; non-2xx statuses are not errors at this level.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Decode the body, mapping malformed JSON to [`BridgeError::Decode`].
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::Decode(format!("JSON deserialization failed: {}", e)))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 5xx and 429 Too Many Requests
    pub fn is_retryable(&self) -> bool {
        self.status >= 500 || self.status == 429
    }

    /// Turn a non-2xx response into [`BridgeError::HttpStatus`].
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(BridgeError::HttpStatus {
                status: self.status,
                url: url.to_string(),
            })
        }
    }
}

/// Backoff schedule for [`HttpClient::execute_with_retry`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
    /// Double the delay after each failure instead of keeping it flat
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that performs exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if !self.use_exponential_backoff {
            return self.base_delay.min(self.max_delay);
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Transport seam for every remote call the core makes.
///
/// Implementations own connection pooling, TLS and transport timeouts.
///
/// ```ignore
/// let request = HttpRequest::new(HttpMethod::Get, listing_url).bearer_token(token);
/// let entries: Vec<ContentItem> = client
///     .execute_with_retry(request, RetryPolicy::default())
///     .await?
///     .error_for_status(&listing_url)?
///     .json()?;
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send one request. Only transport failures (connect, TLS, timeout) are
    /// errors, reported as [`BridgeError::Network`].
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute an HTTP request, retrying network failures and retryable
    /// statuses (5xx, 429) according to `policy`.
    ///
    /// The last response is returned as-is once attempts are exhausted.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.execute(request.clone()).await {
                Ok(response) if response.is_retryable() && attempt < max_attempts => {}
                Err(BridgeError::Network(_)) if attempt < max_attempts => {}
                outcome => return outcome,
            }
            core_async::time::sleep(policy.delay_for_attempt(attempt)).await;
        }
    }

    /// Stream a document body without buffering it.
    ///
    /// A non-2xx status fails with [`BridgeError::HttpStatus`] before any
    /// bytes are handed out.
    async fn download_stream(&self, url: String) -> Result<Box<DynAsyncRead>>;
}
