//! Configuration types for vidfeed
//!
//! Loading these from a file is up to the embedding application; every struct
//! deserializes with serde and falls back to sensible defaults for missing keys.

use crate::error::{Error, Result};
use crate::feeds::SourceId;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Which upstream feed format the configured sources belong to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedProvider {
    /// Bilibili space archive API (JSON)
    #[default]
    Bilibili,
    /// YouTube uploads feed (Atom XML)
    Youtube,
}

/// Feed aggregation settings (sources, limits, fetch concurrency)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideosConfig {
    /// Upstream format of the configured sources (default: bilibili)
    #[serde(default)]
    pub provider: FeedProvider,

    /// Channel / author identifiers
    #[serde(default)]
    pub channels: Vec<String>,

    /// Playlist identifiers, fetched with playlist semantics
    #[serde(default)]
    pub playlists: Vec<String>,

    /// Template for item links; `{VIDEO-ID}` is substituted. Empty keeps the upstream link.
    #[serde(default)]
    pub video_url_template: String,

    /// Include short-form uploads (default: false)
    #[serde(default)]
    pub include_shorts: bool,

    /// Maximum number of items kept after sorting (default: 25, 0 means default)
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Number of feed requests in flight at once (default: 30)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Timeout per feed request (default: 15 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Interval between aggregation cycles in the refresh loop (default: 1 hour)
    #[serde(default = "default_refresh_interval", with = "duration_serde")]
    pub refresh_interval: Duration,

    /// Base URL of the Bilibili API
    #[serde(default = "default_bilibili_api_base")]
    pub bilibili_api_base: String,

    /// Base URL of the YouTube feed endpoint
    #[serde(default = "default_youtube_feed_base")]
    pub youtube_feed_base: String,
}

impl Default for VideosConfig {
    fn default() -> Self {
        Self {
            provider: FeedProvider::default(),
            channels: Vec::new(),
            playlists: Vec::new(),
            video_url_template: String::new(),
            include_shorts: false,
            limit: default_limit(),
            workers: default_workers(),
            request_timeout: default_request_timeout(),
            refresh_interval: default_refresh_interval(),
            bilibili_api_base: default_bilibili_api_base(),
            youtube_feed_base: default_youtube_feed_base(),
        }
    }
}

impl VideosConfig {
    /// All configured sources in fetch order: channels first, then playlists
    /// tagged with the playlist prefix.
    pub fn source_ids(&self) -> Vec<SourceId> {
        self.channels
            .iter()
            .map(|c| SourceId::new(c.clone()))
            .chain(self.playlists.iter().map(|p| SourceId::playlist(p)))
            .collect()
    }

    /// The item limit with the zero value mapped to the default
    pub fn effective_limit(&self) -> usize {
        if self.limit == 0 {
            default_limit()
        } else {
            self.limit
        }
    }
}

/// Thumbnail cache settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Resolve thumbnails through the disk cache (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding cached files (default: "./cache/images")
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// How long a cached file stays fresh (default: 24 hours)
    #[serde(default = "default_cache_ttl", with = "duration_serde")]
    pub ttl: Duration,

    /// Timeout per asset download (default: 15 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub download_timeout: Duration,

    /// Background downloads running at once (default: 8)
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Interval between expiry sweeps in the sweep loop (default: 1 hour)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub sweep_interval: Duration,

    /// Prefix of the local references handed out for cached files
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,

    /// User agent sent with asset downloads
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Referer sent with asset downloads; the origin rejects hot-linked requests without it
    #[serde(default = "default_referer")]
    pub referer: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: default_cache_dir(),
            ttl: default_cache_ttl(),
            download_timeout: default_request_timeout(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            sweep_interval: default_sweep_interval(),
            url_prefix: default_url_prefix(),
            user_agent: default_user_agent(),
            referer: default_referer(),
        }
    }
}

/// HTTP surface settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the router binds to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Main configuration for vidfeed
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed aggregation settings
    #[serde(default)]
    pub videos: VideosConfig,

    /// Thumbnail cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP surface settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Check the settings that would make the core misbehave at runtime
    pub fn validate(&self) -> Result<()> {
        if self.videos.channels.is_empty() && self.videos.playlists.is_empty() {
            return Err(Error::Config {
                message: "at least one channel or playlist is required".to_string(),
                key: Some("channels".to_string()),
            });
        }

        if self.videos.workers == 0 {
            return Err(Error::Config {
                message: "workers must be at least 1".to_string(),
                key: Some("workers".to_string()),
            });
        }

        if self.videos.refresh_interval.is_zero() {
            return Err(Error::Config {
                message: "refresh_interval must be greater than zero".to_string(),
                key: Some("refresh_interval".to_string()),
            });
        }

        if self.cache.enabled {
            if self.cache.sweep_interval.is_zero() {
                return Err(Error::Config {
                    message: "sweep_interval must be greater than zero".to_string(),
                    key: Some("sweep_interval".to_string()),
                });
            }

            if self.cache.ttl.is_zero() {
                return Err(Error::Config {
                    message: "cache ttl must be greater than zero".to_string(),
                    key: Some("ttl".to_string()),
                });
            }

            if self.cache.max_concurrent_downloads == 0 {
                return Err(Error::Config {
                    message: "max_concurrent_downloads must be at least 1".to_string(),
                    key: Some("max_concurrent_downloads".to_string()),
                });
            }
        }

        Ok(())
    }
}

fn default_limit() -> usize {
    25
}

fn default_workers() -> usize {
    crate::fetch::DEFAULT_WORKERS
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_bilibili_api_base() -> String {
    "https://app.bilibili.com".to_string()
}

fn default_youtube_feed_base() -> String {
    "https://www.youtube.com".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache/images")
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(24 * 3600)
}

fn default_max_concurrent_downloads() -> usize {
    8
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_url_prefix() -> String {
    "/cache/images/".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_referer() -> String {
    "https://www.bilibili.com/".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
