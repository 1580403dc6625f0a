//! End-to-end delivery over a real socket

mod common;

use common::*;
use media_fetch::{Config, FetchCoordinator};
use reqwest::StatusCode;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const VIDEO: &str = "https://www.youtube.com/watch?v=jNQXAC9IVRw";

struct TestServer {
    addr: SocketAddr,
    coordinator: FetchCoordinator,
    config: Config,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<media_fetch::Result<()>>,
    _temp_dir: TempDir,
}

impl TestServer {
    async fn start(extractor: Arc<ScriptedExtractor>) -> Self {
        let (coordinator, config, temp_dir) = create_coordinator(extractor);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(media_fetch::api::serve(
            listener,
            coordinator.clone(),
            Arc::new(config.clone()),
            async {
                rx.await.ok();
            },
        ));

        Self {
            addr,
            coordinator,
            config,
            shutdown: Some(tx),
            handle,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn download_url(&self, video: &str) -> String {
        self.url(&format!("/download?url={}", urlencoding::encode(video)))
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not shut down")
            .unwrap();
        assert!(result.is_ok());
    }
}

#[tokio::test]
async fn test_download_over_http() {
    let extractor = ScriptedExtractor::new(vec![Script::media("Me at the zoo")]);
    let server = TestServer::start(extractor.clone()).await;

    let response = reqwest::get(server.download_url(VIDEO)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "video/mp4");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"Me at the zoo.mp4\"; filename*=UTF-8''Me%20at%20the%20zoo.mp4"
    );
    assert_eq!(response.content_length(), Some(MEDIA_SIZE as u64));

    let body = response.bytes().await.unwrap();
    assert_eq!(body.len(), MEDIA_SIZE);
    assert!(body.iter().all(|b| *b == 0x42));

    wait_until_idle(&server.coordinator, Duration::from_secs(5)).await;
    wait_until_scratch_empty(&server.config, Duration::from_secs(5)).await;
    assert_eq!(extractor.calls(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_duplicate_request_is_409_over_http() {
    let gate = closed_gate();
    let extractor = ScriptedExtractor::new(vec![Script::gated(&gate, Script::media("Slow"))]);
    let server = TestServer::start(extractor.clone()).await;

    let first = tokio::spawn(reqwest::get(server.download_url(VIDEO)));
    wait_for_calls(&extractor, 1).await;

    let status: Value = reqwest::get(server.url("/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["active_downloads"], 1);
    assert_eq!(status["active_urls"][0], VIDEO);

    let duplicate = reqwest::get(server.download_url(VIDEO)).await.unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    let json: Value = duplicate.json().await.unwrap();
    assert_eq!(json["error"], "Download already in progress for this URL");

    gate.add_permits(1);
    let response = first.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().len(), MEDIA_SIZE);

    wait_until_idle(&server.coordinator, Duration::from_secs(5)).await;
    assert_eq!(extractor.calls(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_client_abort_mid_stream_cleans_up() {
    let extractor = ScriptedExtractor::new(vec![Script::Media {
        title: "Large".into(),
        len: 32 * 1024 * 1024,
    }]);
    let server = TestServer::start(extractor.clone()).await;

    let mut response = reqwest::get(server.download_url(VIDEO)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let chunk = response.chunk().await.unwrap();
    assert!(chunk.is_some());
    drop(response);

    wait_until_idle(&server.coordinator, Duration::from_secs(10)).await;
    wait_until_scratch_empty(&server.config, Duration::from_secs(10)).await;

    // the key is free again
    let response = reqwest::get(server.download_url(VIDEO)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    drop(response);
    assert_eq!(extractor.calls(), 2);

    wait_until_idle(&server.coordinator, Duration::from_secs(10)).await;
    server.stop().await;
}

#[tokio::test]
async fn test_rejected_urls_over_http() {
    let extractor = ScriptedExtractor::new(vec![Script::media("unused")]);
    let server = TestServer::start(extractor.clone()).await;

    let response = reqwest::get(server.download_url("https://example.com/watch?v=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], "Only URLs from youtube.com, youtu.be are supported");

    let response = reqwest::get(server.url("/download")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], "URL parameter is required");

    assert_eq!(extractor.calls(), 0);
    assert_eq!(scratch_file_count(&server.config), 0);

    server.stop().await;
}

#[tokio::test]
async fn test_exhausted_retries_over_http() {
    let extractor = ScriptedExtractor::new(vec![Script::Snapshot]);
    let server = TestServer::start(extractor.clone()).await;

    let response = reqwest::get(server.download_url(VIDEO)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = response.json().await.unwrap();
    let message = json["error"].as_str().unwrap();
    assert!(message.starts_with("Download failed after 4 attempts"), "{message}");

    assert_eq!(extractor.calls(), 4);
    assert!(server.coordinator.registry().is_empty());
    wait_until_scratch_empty(&server.config, Duration::from_secs(5)).await;

    server.stop().await;
}

#[tokio::test]
async fn test_health_over_http() {
    let server = TestServer::start(ScriptedExtractor::new(vec![])).await;

    let response = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "media-fetch");
    assert!(json["timestamp"].as_f64().unwrap() > 0.0);

    let status: Value = reqwest::get(server.url("/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["active_downloads"], 0);
    assert_eq!(status["active_urls"], Value::Array(vec![]));

    server.stop().await;
}
