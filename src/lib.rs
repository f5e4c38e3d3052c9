//! # vidfeed
//!
//! Video feed aggregation with a disk-backed thumbnail cache.
//!
//! ## Design Philosophy
//!
//! vidfeed is designed to be:
//! - **Partial-failure tolerant** - One broken source never empties the feed
//! - **Non-blocking** - A thumbnail miss hands out a fallback and downloads in the background
//! - **Sensible defaults** - Works out of the box once sources are configured
//! - **Library-first** - No logging setup or config loading; embed it in your own binary
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidfeed::{Config, VideoFeed};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.videos.channels = vec!["12345".to_string()];
//!
//!     let feed = VideoFeed::from_config(&config)?;
//!     let snapshot = feed.update().await?;
//!
//!     for entry in &snapshot.entries {
//!         println!("{} ({})", entry.item.title, entry.thumbnail);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP surface
pub mod api;
/// Periodic refresh and sweep loops
pub mod background;
/// Disk-backed thumbnail cache
pub mod cache;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Feed providers and aggregation
pub mod feeds;
/// Bounded-concurrency fetch runner
pub mod fetch;
/// Feed service and snapshots
pub mod service;
/// Utility functions
pub mod utils;

pub use cache::{AssetCache, AssetRef, AssetSource, HttpAssetSource, SweepReport};
pub use config::{CacheConfig, Config, FeedProvider, ServerConfig, VideosConfig};
pub use error::{ApiError, Error, Result, ToHttpStatus};
pub use feeds::{ContentItem, FeedResult, SourceId, fetch_uploads};
pub use fetch::{Job, execute};
pub use service::{FeedEntry, FeedSnapshot, VideoFeed};
