//! [`HttpClient`] over a pooled reqwest client with rustls.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
    platform::DynAsyncRead,
};
use futures_util::TryStreamExt;
use reqwest::{Client, Method};
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("reading-shelf-core/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Retries come from the trait's default `execute_with_retry`, which calls
/// back into `execute` once per attempt.
///
/// Only `execute` carries a total deadline. Downloads are bounded by the
/// connect and read-idle timeouts, so a slow but steady transfer completes.
pub struct ReqwestHttpClient {
    client: Client,
    timeout: Duration,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// `timeout` bounds a whole `execute` call, body included, unless the
    /// request sets its own.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_IDLE_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn classify(e: reqwest::Error) -> BridgeError {
    match e {
        e if e.is_builder() => BridgeError::InvalidUrl(e.to_string()),
        e if e.is_decode() => BridgeError::Decode(e.to_string()),
        e if e.is_timeout() => BridgeError::Network(format!("timed out: {}", e)),
        e => BridgeError::Network(e.to_string()),
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = ?request.method, url = %request.url, "HTTP request");

        let mut builder = self.client.request(method(request.method), &request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder = builder.timeout(request.timeout.unwrap_or(self.timeout));

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response.bytes().await.map_err(classify)?;

        if !(200..300).contains(&status) {
            warn!(status, "HTTP request returned an error status");
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn download_stream(&self, url: String) -> Result<Box<DynAsyncRead>> {
        let response = self.client.get(&url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_custom_timeout() {
        assert!(ReqwestHttpClient::with_timeout(Duration::from_secs(120)).is_ok());
    }

    #[test]
    fn test_bridge_methods_map_to_reqwest() {
        assert_eq!(method(HttpMethod::Get), Method::GET);
        assert_eq!(method(HttpMethod::Put), Method::PUT);
        assert_eq!(method(HttpMethod::Delete), Method::DELETE);
    }

    #[tokio::test]
    async fn test_malformed_url_is_not_a_network_error() {
        let client = ReqwestHttpClient::new().unwrap();

        let result = client
            .execute(HttpRequest::new(HttpMethod::Get, "not a url"))
            .await;

        assert!(matches!(result, Err(BridgeError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_download_of_malformed_url_fails_before_streaming() {
        let client = ReqwestHttpClient::new().unwrap();

        let result = client.download_stream("ftp//nowhere".to_string()).await;

        assert!(matches!(result, Err(BridgeError::InvalidUrl(_))));
    }
}
