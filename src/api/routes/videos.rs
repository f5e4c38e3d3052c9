//! Feed snapshot handler.

use crate::api::AppState;
use crate::error::{Error, Result};
use crate::service::FeedEntry;
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body of GET /api/videos
#[derive(Debug, Serialize)]
pub struct VideosResponse {
    /// Items newest first, each with its resolved thumbnail
    pub items: Vec<FeedEntry>,

    /// Sources that failed during the last update; non-zero means partial content
    pub degraded: usize,

    /// Items whose thumbnail is stale or remote
    pub fallback_thumbnails: usize,

    /// When the snapshot was taken
    pub updated_at: DateTime<Utc>,
}

/// GET /api/videos - Latest feed snapshot
///
/// 503 with `no_content` until the first successful update.
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<VideosResponse>> {
    let snapshot = state
        .feed
        .snapshot()
        .await
        .ok_or(Error::NoContent { cause: None })?;

    Ok(Json(VideosResponse {
        fallback_thumbnails: snapshot.fallback_thumbnails(),
        items: snapshot.entries.clone(),
        degraded: snapshot.failed_sources,
        updated_at: snapshot.updated_at,
    }))
}
