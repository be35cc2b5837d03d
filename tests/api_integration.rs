//! End-to-end tests over a real listener and an on-disk registry.

use std::net::SocketAddr;
use std::sync::Arc;

use iris_serving::config::Config;
use iris_serving::model::{FsRegistry, ModelArtifact};
use iris_serving::{create_router, AppState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const MODEL: &str = "iris-classifier";

async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    addr
}

/// Minimal HTTP/1.1 client; returns status code and body
async fn http(addr: SocketAddr, method: &str, path: &str, body: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let status = raw[9..12].parse().unwrap();
    let body = raw.split_once("\r\n\r\n").map(|(_, b)| b.to_string()).unwrap_or_default();
    (status, body)
}

fn registry_with_versions(dir: &std::path::Path, count: usize) -> FsRegistry {
    let registry = FsRegistry::new(dir);
    let bytes = serde_json::to_vec(&ModelArtifact::iris_reference()).unwrap();
    for _ in 0..count {
        registry.register(MODEL, &bytes).unwrap();
    }
    registry
}

#[tokio::test]
async fn test_startup_loads_latest_when_nothing_promoted() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with_versions(dir.path(), 3);

    let state = AppState::new(Config::default(), Arc::new(registry)).unwrap();
    let info = state.load_initial_model().unwrap();
    assert_eq!(info.version, "3");
    assert!(!info.promoted);

    let addr = spawn_server(state).await;
    let (status, body) = http(addr, "POST", "/predict", r#"{"features":[5.1,3.5,1.4,0.2]}"#).await;
    assert_eq!(status, 200);
    assert!(body.contains(r#""prediction":"setosa""#));
    assert!(body.contains(r#""model_version":"3""#));
}

#[tokio::test]
async fn test_promote_then_reload_is_seen_by_new_requests() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with_versions(dir.path(), 2);
    registry.promote(MODEL, 1).unwrap();

    let state = AppState::new(Config::default(), Arc::new(registry.clone())).unwrap();
    assert_eq!(state.load_initial_model().unwrap().version, "1");
    let addr = spawn_server(state).await;

    registry.promote_latest(MODEL).unwrap();
    let (status, body) = http(addr, "POST", "/admin/model/reload", "").await;
    assert_eq!(status, 200);
    assert!(body.contains(r#""version":"2""#));

    let (_, body) = http(addr, "GET", "/model/info", "").await;
    assert!(body.contains(r#""version":"2""#));
    assert!(body.contains(r#""promoted":true"#));
}

#[tokio::test]
async fn test_empty_registry_serves_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(Config::default(), Arc::new(FsRegistry::new(dir.path()))).unwrap();
    assert!(state.load_initial_model().is_err());

    let addr = spawn_server(state).await;

    let (status, body) = http(addr, "GET", "/health", "").await;
    assert_eq!(status, 503);
    assert!(body.contains("not_ready"));

    let (status, _) = http(addr, "POST", "/predict", r#"{"features":[5.1,3.5,1.4,0.2]}"#).await;
    assert_eq!(status, 503);

    let (status, body) = http(addr, "GET", "/metrics", "").await;
    assert_eq!(status, 200);
    assert!(body.contains("model_loaded 0"));
}

#[tokio::test]
async fn test_testing_mode_serves_reference_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        testing: true,
        ..Config::default()
    };
    let state = AppState::new(config, Arc::new(FsRegistry::new(dir.path()))).unwrap();
    let info = state.load_initial_model().unwrap();
    assert_eq!(info.version, "reference");

    let addr = spawn_server(state).await;
    let (status, body) = http(addr, "POST", "/predict", r#"{"features":[5.1,3.5]}"#).await;
    assert_eq!(status, 400);
    assert!(body.contains("expected 4 features, got 2"));
}

#[test]
fn test_unload_marks_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with_versions(dir.path(), 1);
    let state = AppState::new(Config::default(), Arc::new(registry)).unwrap();
    tokio_test::block_on(async {
        state.reload_from_registry().await.unwrap();
    });
    assert!(state.model.is_loaded());

    state.unload();
    assert!(!state.model.is_loaded());
    assert!(state.monitor.statistics().baseline.is_none());
}
