//! Resource fetching against a mock image host

use directory_harvest::fetcher::{ResourceFetcher, RetryPolicy};
use directory_harvest::FetchError;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0portrait-bytes\xff\xd9";

fn fast_fetcher(dir: &TempDir) -> ResourceFetcher {
    let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(4));
    ResourceFetcher::new(Client::new(), dir.path(), policy).unwrap()
}

fn leftover_files(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_fetch_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/photos/smith.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BYTES))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(&dir);
    let url = format!("{}/photos/smith.jpg", server.uri());

    let first = fetcher.fetch(&url).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.attempts, 1);
    assert_eq!(first.local_path, dir.path().join("smith.jpg"));
    assert_eq!(std::fs::read(&first.local_path).unwrap(), JPEG_BYTES);

    let second = fetcher.fetch(&url).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.local_path, first.local_path);
}

#[tokio::test]
async fn test_concurrent_fetches_of_same_reference_download_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/photos/jones.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(JPEG_BYTES)
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(&dir);
    let url = format!("{}/photos/jones.jpg", server.uri());

    let (a, b) = tokio::join!(fetcher.fetch(&url), fetcher.fetch(&url));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.local_path, b.local_path);
    assert!(a.cached != b.cached);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Mounted first so it answers the first four requests
    Mock::given(method("GET"))
        .and(path("/photos/flaky.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(4)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photos/flaky.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BYTES))
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(&dir);
    let artifact = fetcher
        .fetch(&format!("{}/photos/flaky.jpg", server.uri()))
        .await
        .unwrap();

    assert_eq!(artifact.attempts, 5);
    assert_eq!(std::fs::read(&artifact.local_path).unwrap(), JPEG_BYTES);
}

#[tokio::test]
async fn test_exhausted_retries_leave_no_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/photos/down.jpg"))
        .respond_with(ResponseTemplate::new(502))
        .expect(5)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(&dir);
    let result = fetcher
        .fetch(&format!("{}/photos/down.jpg", server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Status { status: 502, .. })));
    assert!(leftover_files(&dir).is_empty());
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/photos/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(&dir);
    let result = fetcher
        .fetch(&format!("{}/photos/missing.jpg", server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    assert!(leftover_files(&dir).is_empty());
}

#[tokio::test]
async fn test_deadline_bounds_total_fetch_time() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/photos/slow.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let policy = RetryPolicy::new(5, Duration::from_millis(200), Duration::from_millis(400));
    let fetcher = ResourceFetcher::new(Client::new(), dir.path(), policy)
        .unwrap()
        .with_deadline(Some(Duration::from_millis(100)));

    let result = fetcher
        .fetch(&format!("{}/photos/slow.jpg", server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::DeadlineExceeded { .. })));
    assert!(leftover_files(&dir).is_empty());
}

#[tokio::test]
async fn test_reference_without_filename_is_rejected() {
    let dir = TempDir::new().unwrap();
    let fetcher = fast_fetcher(&dir);

    let result = fetcher.fetch("https://img.example.edu/photos/").await;
    assert!(matches!(result, Err(FetchError::InvalidReference(_))));
}

/// Serves responses that announce 1000 bytes and hang up after a few
async fn truncating_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = connections.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);

            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: 1000\r\n\r\n\xff\xd8\xff\xe0truncated",
                )
                .await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), connections)
}

#[tokio::test]
async fn test_truncated_body_retried_and_leaves_no_partial_file() {
    let dir = TempDir::new().unwrap();
    let (base, connections) = truncating_server().await;

    let fetcher = fast_fetcher(&dir);
    let result = fetcher.fetch(&format!("{}/photos/short.jpg", base)).await;

    assert!(matches!(result, Err(FetchError::Network { .. })));
    assert_eq!(connections.load(Ordering::SeqCst), 5);
    assert!(leftover_files(&dir).is_empty());
}
