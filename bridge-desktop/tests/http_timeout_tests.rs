//! Deadline behaviour of the desktop HTTP client against a local socket.

use bridge_desktop::ReqwestHttpClient;
use bridge_traits::{
    error::BridgeError,
    http::{HttpClient, HttpMethod, HttpRequest},
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const BODY: &[u8] = b"%PDF-1.7 slow stream";

/// Serve one response whose body arrives a byte at a time, `gap` apart.
async fn trickling_server(gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await.unwrap();

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            BODY.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        for byte in BODY {
            socket.write_all(&[*byte]).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(gap).await;
        }
    });

    format!("http://{}/books/slow.pdf", addr)
}

/// Accept one connection and never answer it.
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(socket);
    });

    format!("http://{}/collections/books/documents", addr)
}

#[tokio::test]
async fn test_slow_download_outlives_request_timeout() {
    let url = trickling_server(Duration::from_millis(100)).await;
    let client = ReqwestHttpClient::with_timeout(Duration::from_millis(500)).unwrap();

    let mut reader = client.download_stream(url).await.unwrap();
    let mut body = Vec::new();
    reader.read_to_end(&mut body).await.unwrap();

    assert_eq!(body, BODY);
}

#[tokio::test]
async fn test_execute_is_bounded_by_request_timeout() {
    let url = silent_server().await;
    let client = ReqwestHttpClient::with_timeout(Duration::from_millis(200)).unwrap();

    let result = client.execute(HttpRequest::new(HttpMethod::Get, url)).await;

    assert!(matches!(result, Err(BridgeError::Network(_))));
}
