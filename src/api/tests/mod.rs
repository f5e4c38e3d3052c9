use super::*;
use crate::cache::AssetCache;
use crate::cache::testing::MockSource;
use crate::config::{CacheConfig, VideosConfig};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};


const ARCHIVE: &str = r#"{"code":0,"message":"0","data":{"item":[
    {"title":"Older","cover":"http://i0.hdslb.com/bfs/archive/a.jpg","ctime":1700000000,"author":"Uploader","bvid":"BV1aa"},
    {"title":"Newer","cover":"http://i0.hdslb.com/bfs/archive/b.png","ctime":1700100000,"author":"Uploader","bvid":"BV1bb"}
]}}"#;

/// Mock upstream serving [`ARCHIVE`] for every request
async fn upstream() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARCHIVE))
        .mount(&server)
        .await;
    server
}

fn videos_config(server: &MockServer) -> VideosConfig {
    VideosConfig {
        channels: vec!["42".to_string()],
        bilibili_api_base: server.uri(),
        ..VideosConfig::default()
    }
}

/// Feed with a cache in a temp dir, downloading from an in-memory source
fn feed_with_cache(server: &MockServer) -> (Arc<VideoFeed>, AssetCache, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cache = AssetCache::new(
        &CacheConfig {
            cache_dir: dir.path().join("images"),
            ..CacheConfig::default()
        },
        Arc::new(MockSource::new(b"image bytes")),
    );
    let feed = VideoFeed::new(videos_config(server), Some(cache.clone())).unwrap();
    (Arc::new(feed), cache, dir)
}

async fn send_get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = upstream().await;
    let (feed, _cache, _dir) = feed_with_cache(&server);

    let response = send_get(create_router(feed), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["cache_enabled"], true);
    assert_eq!(body["downloads_in_flight"], 0);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let server = upstream().await;
    let feed = Arc::new(VideoFeed::new(videos_config(&server), None).unwrap());

    let response = send_get(create_router(feed), "/downloads").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_server_serves_and_shuts_down() {
    let server = upstream().await;
    let feed = Arc::new(VideoFeed::new(videos_config(&server), None).unwrap());

    // Port 0 = OS assigns a free port
    let config = crate::config::ServerConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
    };
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { start_api_server(feed, &config, shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not shut down")
        .unwrap();
    assert!(result.is_ok());
}
