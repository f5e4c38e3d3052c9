//! System handlers: health.

use crate::api::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

/// GET /health - Health check
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let in_flight = state
        .feed
        .cache()
        .map(|cache| cache.in_flight_count())
        .unwrap_or(0);

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "cache_enabled": state.feed.cache().is_some(),
        "downloads_in_flight": in_flight,
    }))
}
