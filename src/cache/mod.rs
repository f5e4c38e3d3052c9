//! Disk-backed thumbnail cache.
//!
//! Remote assets are stored as `{md5(url)}{ext}` in a flat directory and served
//! back through local references (`/cache/images/{file}` by default). A miss
//! never blocks the caller: the download runs in the background and the caller
//! gets the stale file or the remote URL in the meantime. Concurrent requests
//! for the same URL share one download.

mod source;

pub use source::{AssetSource, HttpAssetSource};

#[cfg(test)]
pub(crate) use source::testing;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::utils::{enforce_https, format_megabytes};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, info, warn};

/// Extensions recognised in asset URLs, checked in this order
const KNOWN_EXTENSIONS: [&str; 3] = [".png", ".webp", ".gif"];

const DEFAULT_EXTENSION: &str = ".jpg";

const TEMP_SUFFIX: &str = ".tmp";

/// What `resolve` handed back for an asset URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "href", rename_all = "snake_case")]
pub enum AssetRef {
    /// Local reference to a file younger than the TTL
    Fresh(String),
    /// Local reference to an expired file, served while a refresh runs or after it failed
    Stale(String),
    /// The remote URL, because nothing is cached yet
    Remote(String),
    /// No URL was given
    Missing,
}

impl AssetRef {
    /// The reference to hand to a client; empty for [`AssetRef::Missing`]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fresh(href) | Self::Stale(href) | Self::Remote(href) => href,
            Self::Missing => "",
        }
    }

    /// Whether the reference points into the local cache
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Fresh(_) | Self::Stale(_))
    }

    /// Whether the caller got something other than a fresh cached copy
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Stale(_) | Self::Remote(_))
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one expiry sweep
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Files deleted
    pub files_removed: usize,
    /// Bytes released by the deleted files
    pub bytes_freed: u64,
}

/// File name for an asset URL: lowercase hex MD5 of the URL plus an extension
/// guessed from the URL text.
///
/// The URL is hashed as given; callers normalize it first.
pub fn cache_file_name(url: &str) -> String {
    let digest = md5::compute(url.as_bytes());
    format!("{:x}{}", digest, extension_for(url))
}

fn extension_for(url: &str) -> &'static str {
    KNOWN_EXTENSIONS
        .iter()
        .find(|ext| url.contains(*ext))
        .copied()
        .unwrap_or(DEFAULT_EXTENSION)
}

/// Whether `name` is a file name this cache could have produced (never a temp file)
pub fn is_cache_file_name(name: &str) -> bool {
    let Some((hash, ext)) = name.split_at_checked(32) else {
        return false;
    };

    hash.bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        && (ext == DEFAULT_EXTENSION || KNOWN_EXTENSIONS.iter().any(|known| *known == ext))
}

enum FileState {
    Fresh,
    Stale,
    Absent,
}

enum Registration {
    Started,
    InFlight(watch::Receiver<bool>),
}

struct CacheInner {
    dir: PathBuf,
    ttl: Duration,
    url_prefix: String,
    source: Arc<dyn AssetSource>,
    /// URL -> completion flag of the running download
    in_flight: Mutex<HashMap<String, watch::Receiver<bool>>>,
    download_permits: Arc<Semaphore>,
}

impl CacheInner {
    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, watch::Receiver<bool>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes the in-flight marker and fires the completion signal when dropped,
/// so every exit path of a download (including a panic) releases its waiters.
struct InFlightGuard {
    inner: Arc<CacheInner>,
    url: String,
    done: watch::Sender<bool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight().remove(&self.url);
        self.done.send_replace(true);
    }
}

/// TTL-based disk cache for remote thumbnails
///
/// Cloning is cheap; clones share the directory, the in-flight map and the
/// download pool.
#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<CacheInner>,
}

impl AssetCache {
    /// Create a cache fetching through `source`
    ///
    /// The cache directory is created here. Failing to create it is logged and
    /// otherwise ignored; downloads will fail until it exists.
    pub fn new(config: &CacheConfig, source: Arc<dyn AssetSource>) -> Self {
        if let Err(e) = std::fs::create_dir_all(&config.cache_dir) {
            warn!(
                dir = %config.cache_dir.display(),
                error = %e,
                "Failed to create cache directory"
            );
        }

        Self {
            inner: Arc::new(CacheInner {
                dir: config.cache_dir.clone(),
                ttl: config.ttl,
                url_prefix: config.url_prefix.clone(),
                source,
                in_flight: Mutex::new(HashMap::new()),
                download_permits: Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1))),
            }),
        }
    }

    /// Create a cache downloading over HTTP with the configured headers
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let source = HttpAssetSource::new(config)?;
        Ok(Self::new(config, Arc::new(source)))
    }

    /// Directory holding the cached files
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Path of the cache entry for `url` (http and https forms share one entry)
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.inner.dir.join(cache_file_name(&enforce_https(url)))
    }

    /// Number of downloads currently registered
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight().len()
    }

    /// Map a remote asset URL to the reference a client should use.
    ///
    /// Never starts a download and waits for it: on a miss the download runs
    /// in the background and this returns the stale file or the remote URL.
    /// Only an already running download is waited for.
    pub async fn resolve(&self, url: &str) -> AssetRef {
        if url.is_empty() {
            return AssetRef::Missing;
        }

        let url = enforce_https(url);
        let file_name = cache_file_name(&url);
        let path = self.inner.dir.join(&file_name);

        if let FileState::Fresh = self.file_state(&path).await {
            return AssetRef::Fresh(self.local_ref(&file_name));
        }

        if let Registration::InFlight(mut done) = self.register(&url, &path) {
            // A dropped sender also means the download is over
            let _ = done.wait_for(|finished| *finished).await;
        }

        match self.file_state(&path).await {
            FileState::Fresh => AssetRef::Fresh(self.local_ref(&file_name)),
            FileState::Stale => AssetRef::Stale(self.local_ref(&file_name)),
            FileState::Absent => AssetRef::Remote(url),
        }
    }

    /// Start a background download for `url` unless it is fresh or already downloading
    pub async fn preload(&self, url: &str) {
        if url.is_empty() {
            return;
        }

        let url = enforce_https(url);
        let path = self.inner.dir.join(cache_file_name(&url));

        if let FileState::Fresh = self.file_state(&path).await {
            return;
        }

        self.register(&url, &path);
    }

    /// Delete every cached file older than the TTL
    ///
    /// Files that vanish or cannot be removed mid-sweep are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the cache directory cannot be listed.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let mut entries = tokio::fs::read_dir(&self.inner.dir).await?;
        let mut report = SweepReport::default();
        let now = SystemTime::now();

        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };

            let Ok(modified) = metadata.modified() else {
                continue;
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.inner.ttl {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    report.files_removed += 1;
                    report.bytes_freed += metadata.len();
                }
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "Failed to remove expired file");
                }
            }
        }

        if report.files_removed > 0 {
            info!(
                files = report.files_removed,
                freed = %format_megabytes(report.bytes_freed),
                "Cleaned expired cache files"
            );
        }

        Ok(report)
    }

    fn local_ref(&self, file_name: &str) -> String {
        format!("{}{}", self.inner.url_prefix, file_name)
    }

    async fn file_state(&self, path: &Path) -> FileState {
        let Ok(metadata) = tokio::fs::metadata(path).await else {
            return FileState::Absent;
        };

        let fresh = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age < self.inner.ttl);

        if fresh {
            FileState::Fresh
        } else {
            FileState::Stale
        }
    }

    /// Join the running download for `url`, or register and spawn a new one
    fn register(&self, url: &str, path: &Path) -> Registration {
        let done = {
            let mut in_flight = self.inner.in_flight();
            if let Some(existing) = in_flight.get(url) {
                return Registration::InFlight(existing.clone());
            }

            let (done, receiver) = watch::channel(false);
            in_flight.insert(url.to_string(), receiver);
            done
        };

        self.spawn_download(url.to_string(), path.to_path_buf(), done);
        Registration::Started
    }

    fn spawn_download(&self, url: String, path: PathBuf, done: watch::Sender<bool>) {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let guard = InFlightGuard {
                inner: Arc::clone(&inner),
                url,
                done,
            };

            let Ok(_permit) = Arc::clone(&inner.download_permits).acquire_owned().await else {
                warn!(url = %guard.url, "Download pool closed, skipping asset");
                return;
            };

            match download(inner.source.as_ref(), &guard.url, &path).await {
                Ok(bytes) => {
                    debug!(url = %guard.url, bytes, path = %path.display(), "Cached asset")
                }
                Err(e) => {
                    warn!(url = %guard.url, error = %e, "Failed to download asset")
                }
            }
        });
    }
}

/// Download into `{path}.tmp` and rename onto `path`; the temp file never survives a failure
async fn download(source: &dyn AssetSource, url: &str, path: &Path) -> Result<u64> {
    let temp = temp_path(path);

    let mut file = tokio::fs::File::create(&temp).await?;
    let written: Result<u64> = async {
        let written = source.fetch_into(url, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
    .await;
    drop(file);

    let written = match written {
        Ok(written) => written,
        Err(e) => {
            remove_temp(&temp).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&temp, path).await {
        remove_temp(&temp).await;
        return Err(e.into());
    }

    Ok(written)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(TEMP_SUFFIX);
    PathBuf::from(temp)
}

async fn remove_temp(temp: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %temp.display(), error = %e, "Failed to remove temp file");
        }
    }
}
