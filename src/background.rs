//! Periodic background work: feed refresh and cache expiry sweeps
//!
//! Both loops tick immediately on start, then every interval, and stop when
//! their [`CancellationToken`] is cancelled. Failures are logged and the loop
//! carries on with the next tick.
//!
//! # Example
//!
//! ```no_run
//! use vidfeed::{Config, VideoFeed, background};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.videos.channels = vec!["12345".to_string()];
//!
//! let feed = Arc::new(VideoFeed::from_config(&config)?);
//! let shutdown = CancellationToken::new();
//!
//! let refresh = background::spawn_refresh_loop(
//!     feed.clone(),
//!     config.videos.refresh_interval,
//!     shutdown.clone(),
//! );
//!
//! // ... later
//! shutdown.cancel();
//! refresh.await?;
//! # Ok(())
//! # }
//! ```

use crate::cache::AssetCache;
use crate::service::VideoFeed;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Run [`VideoFeed::update`] every `interval` until `shutdown` is cancelled
pub fn spawn_refresh_loop(
    feed: Arc<VideoFeed>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = ?interval, "Feed refresh loop started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match feed.update().await {
                Ok(snapshot) if snapshot.failed_sources > 0 => {
                    warn!(
                        items = snapshot.entries.len(),
                        failed_sources = snapshot.failed_sources,
                        "Feed refreshed with partial content"
                    );
                }
                Ok(snapshot) => {
                    debug!(items = snapshot.entries.len(), "Feed refreshed");
                }
                Err(e) => {
                    error!(error = %e, "Feed refresh failed");
                }
            }
        }

        info!("Feed refresh loop shutting down");
    })
}

/// Run [`AssetCache::sweep`] every `interval` until `shutdown` is cancelled
pub fn spawn_sweep_loop(
    cache: AssetCache,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = ?interval, dir = %cache.dir().display(), "Cache sweep loop started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = cache.sweep().await {
                error!(error = %e, "Cache sweep failed");
            }
        }

        info!("Cache sweep loop shutting down");
    })
}
