//! HTTP surface
//!
//! Serves the latest feed snapshot as JSON and the files of the thumbnail
//! cache under the local references the cache hands out.

use crate::config::ServerConfig;
use crate::{Result, VideoFeed};
use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// - `GET /health` - Health check
/// - `GET /api/videos` - Latest feed snapshot (503 until the first update succeeds)
/// - `GET /cache/images/:file` - Cached thumbnail file
pub fn create_router(feed: Arc<VideoFeed>) -> Router {
    let state = AppState::new(feed);

    Router::new()
        .route("/health", get(routes::health_check))
        .route("/api/videos", get(routes::list_videos))
        .route("/cache/images/:file", get(routes::cached_image))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the API server on the configured bind address.
///
/// Runs until `shutdown` is cancelled, then lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use vidfeed::{Config, VideoFeed};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = Config::default();
/// config.videos.channels = vec!["12345".to_string()];
/// let feed = Arc::new(VideoFeed::from_config(&config)?);
///
/// vidfeed::api::start_api_server(feed, &config.server, CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    feed: Arc<VideoFeed>,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let bind_address = config.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(feed);
    let listener = TcpListener::bind(bind_address).await?;

    tracing::info!(
        address = %listener.local_addr()?,
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
