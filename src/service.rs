//! The video feed service: one aggregation cycle plus the latest snapshot

use crate::cache::{AssetCache, AssetRef};
use crate::config::{Config, VideosConfig};
use crate::error::{Error, Result};
use crate::feeds::{self, ContentItem};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// A content item together with the thumbnail reference clients should load
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeedEntry {
    /// The normalized item
    #[serde(flatten)]
    pub item: ContentItem,

    /// Cached, stale, or remote thumbnail
    pub thumbnail: AssetRef,
}

/// Result of the last successful aggregation cycle
#[derive(Clone, Debug, Serialize)]
pub struct FeedSnapshot {
    /// Items newest first, with resolved thumbnails
    pub entries: Vec<FeedEntry>,

    /// Sources that failed during the cycle that produced this snapshot
    pub failed_sources: usize,

    /// When the cycle finished
    pub updated_at: DateTime<Utc>,
}

impl FeedSnapshot {
    /// Entries whose thumbnail is not a fresh cached copy
    pub fn fallback_thumbnails(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.thumbnail.is_fallback())
            .count()
    }
}

/// Aggregates the configured sources and keeps the latest result
pub struct VideoFeed {
    config: VideosConfig,
    client: Client,
    cache: Option<AssetCache>,
    snapshot: RwLock<Option<Arc<FeedSnapshot>>>,
}

impl VideoFeed {
    /// Create a feed over the given sources, resolving thumbnails through `cache` if given
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(config: VideosConfig, cache: Option<AssetCache>) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.workers.min(32))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        Ok(Self {
            config,
            client,
            cache,
            snapshot: RwLock::new(None),
        })
    }

    /// Validate `config` and build the feed, plus the thumbnail cache when enabled
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let cache = if config.cache.enabled {
            Some(AssetCache::from_config(&config.cache)?)
        } else {
            None
        };

        Self::new(config.videos.clone(), cache)
    }

    /// Feed settings
    pub fn config(&self) -> &VideosConfig {
        &self.config
    }

    /// The thumbnail cache, if enabled
    pub fn cache(&self) -> Option<&AssetCache> {
        self.cache.as_ref()
    }

    /// The latest snapshot, if any cycle has succeeded yet
    pub async fn snapshot(&self) -> Option<Arc<FeedSnapshot>> {
        self.snapshot.read().await.clone()
    }

    /// Run one aggregation cycle and publish its snapshot.
    ///
    /// Partial content still replaces the snapshot; the failed count travels
    /// with it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoContent`] when nothing could be fetched. The previous
    /// snapshot stays in place.
    pub async fn update(&self) -> Result<Arc<FeedSnapshot>> {
        let result = match feeds::fetch_uploads(&self.client, &self.config).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Feed update produced no content, keeping previous snapshot");
                return Err(e);
            }
        };

        let failed_sources = result.failed_sources;
        let entries = self.resolve_thumbnails(result.items).await;

        let snapshot = Arc::new(FeedSnapshot {
            entries,
            failed_sources,
            updated_at: Utc::now(),
        });

        info!(
            items = snapshot.entries.len(),
            failed_sources,
            fallback_thumbnails = snapshot.fallback_thumbnails(),
            "Feed updated"
        );

        *self.snapshot.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    async fn resolve_thumbnails(&self, items: Vec<ContentItem>) -> Vec<FeedEntry> {
        let Some(cache) = &self.cache else {
            return items
                .into_iter()
                .map(|item| {
                    let thumbnail = if item.thumbnail_url.is_empty() {
                        AssetRef::Missing
                    } else {
                        AssetRef::Remote(item.thumbnail_url.clone())
                    };
                    FeedEntry { item, thumbnail }
                })
                .collect();
        };

        let thumbnails =
            futures::future::join_all(items.iter().map(|item| cache.resolve(&item.thumbnail_url)))
                .await;

        items
            .into_iter()
            .zip(thumbnails)
            .map(|(item, thumbnail)| FeedEntry { item, thumbnail })
            .collect()
    }
}
