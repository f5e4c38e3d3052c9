//! Cached thumbnail handler.

use crate::api::AppState;
use crate::api::error_response::not_found;
use crate::cache::is_cache_file_name;
use crate::error::Error;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

/// Content type for a cache file name, by extension
fn content_type_for(file: &str) -> &'static str {
    match file.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// GET /cache/images/:file - Serve a completed cache file
///
/// Only names the cache itself produces are served; anything else, including
/// in-progress `.tmp` files, is a 404.
pub async fn cached_image(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    let Some(cache) = state.feed.cache() else {
        return not_found(format!("cached image {}", file));
    };

    if !is_cache_file_name(&file) {
        return not_found(format!("cached image {}", file));
    }

    match tokio::fs::read(cache.dir().join(&file)).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, content_type_for(&file)),
                (header::CACHE_CONTROL, "public, max-age=3600"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            not_found(format!("cached image {}", file))
        }
        Err(e) => Error::Io(e).into_response(),
    }
}
