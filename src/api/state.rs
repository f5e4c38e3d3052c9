//! Application state for the API server

use crate::VideoFeed;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The feed whose snapshot and thumbnail cache are served
    pub feed: Arc<VideoFeed>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(feed: Arc<VideoFeed>) -> Self {
        Self { feed }
    }
}
