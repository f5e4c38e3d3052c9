//! Feed aggregation: per-source fetches merged into one newest-first list.
//!
//! Each configured source is fetched through the bounded [`fetch`](crate::fetch)
//! runner, decoded into the provider's response type, and converted to
//! [`ContentItem`]s. Failed sources are logged and counted; as long as at least
//! one item survives, the merged list is returned together with the number of
//! failed sources so callers can surface a "partial content" warning.

pub mod bilibili;
pub mod youtube;

use crate::config::{FeedProvider, VideosConfig};
use crate::error::{Error, Result};
use crate::fetch::{self, Job};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use reqwest::{Client, Request};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, warn};

/// Prefix marking a source identifier as a playlist rather than a channel
pub const PLAYLIST_PREFIX: &str = "playlist:";

/// Placeholder substituted in item URL templates
pub const VIDEO_ID_PLACEHOLDER: &str = "{VIDEO-ID}";

/// Opaque identifier of an upstream feed (channel, author or playlist)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Wrap a raw identifier as configured
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build a playlist identifier from a bare playlist id
    pub fn playlist(id: &str) -> Self {
        Self(format!("{}{}", PLAYLIST_PREFIX, id))
    }

    /// The identifier including any playlist prefix
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier names a playlist
    pub fn is_playlist(&self) -> bool {
        self.0.starts_with(PLAYLIST_PREFIX)
    }

    /// The bare upstream id with the playlist prefix removed
    pub fn id(&self) -> &str {
        self.0.strip_prefix(PLAYLIST_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One normalized feed entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Video title
    pub title: String,

    /// Canonical (https) link to the video
    pub url: String,

    /// Author display name
    pub author: String,

    /// Link to the author's page
    pub author_url: String,

    /// Remote thumbnail URL as provided by the upstream
    pub thumbnail_url: String,

    /// Publication time
    pub published: DateTime<Utc>,
}

/// Merged output of one aggregation cycle
#[derive(Clone, Debug, Default)]
pub struct FeedResult {
    /// Items sorted newest first and truncated to the configured limit
    pub items: Vec<ContentItem>,

    /// Number of sources that failed to fetch or decode
    pub failed_sources: usize,
}

impl FeedResult {
    /// Whether some sources failed while content was still produced
    pub fn is_partial(&self) -> bool {
        self.failed_sources > 0
    }

    /// The soft "partial content" condition, if any sources failed
    pub fn partial(&self) -> Option<Error> {
        self.is_partial().then_some(Error::PartialContent {
            failed: self.failed_sources,
        })
    }
}

/// Sort items by publication time, newest first; equal timestamps keep their order
pub fn sort_by_newest(items: &mut [ContentItem]) {
    items.sort_by(|a, b| b.published.cmp(&a.published));
}

/// Merge per-source outcomes into one sorted list.
///
/// `outcomes[i]` must belong to `sources[i]`. Errored outcomes are logged and
/// counted; every successful one is converted with `convert`. A `limit` of
/// zero keeps every item.
///
/// # Errors
///
/// Returns [`Error::NoContent`] when no item was produced at all.
pub fn merge_outcomes<R, C>(
    sources: &[SourceId],
    outcomes: Vec<Result<R>>,
    limit: usize,
    convert: C,
) -> Result<FeedResult>
where
    C: Fn(&SourceId, R) -> Vec<ContentItem>,
{
    let mut items = Vec::with_capacity(sources.len() * 15);
    let mut failed = 0;

    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            Ok(response) => items.extend(convert(source, response)),
            Err(e) => {
                failed += 1;
                error!(source = %source, error = %e, "Failed to fetch feed");
            }
        }
    }

    if items.is_empty() {
        return Err(Error::NoContent { cause: None });
    }

    sort_by_newest(&mut items);

    if failed > 0 {
        warn!(
            failed,
            total = sources.len(),
            "Some feeds failed, returning partial content"
        );
    }

    if limit > 0 {
        items.truncate(limit);
    }

    Ok(FeedResult {
        items,
        failed_sources: failed,
    })
}

/// Fetch every configured source with the configured provider and merge the results
pub async fn fetch_uploads(client: &Client, config: &VideosConfig) -> Result<FeedResult> {
    let sources = config.source_ids();

    match config.provider {
        FeedProvider::Bilibili => {
            let requests = build_requests(&sources, |id| bilibili::feed_request(client, config, id))?;
            aggregate(
                &sources,
                requests,
                fetch::decode_json_task::<bilibili::SpaceArchiveResponse>(client.clone()),
                config,
                |source, response| bilibili::to_items(source, response, &config.video_url_template),
            )
            .await
        }
        FeedProvider::Youtube => {
            let requests = build_requests(&sources, |id| youtube::feed_request(client, config, id))?;
            aggregate(
                &sources,
                requests,
                fetch::decode_xml_task::<youtube::UploadsFeed>(client.clone()),
                config,
                |_, response| youtube::to_items(response, &config.video_url_template),
            )
            .await
        }
    }
}

fn build_requests<B>(sources: &[SourceId], build: B) -> Result<Vec<Request>>
where
    B: Fn(&SourceId) -> reqwest::Result<Request>,
{
    sources
        .iter()
        .map(|source| build(source).map_err(|e| Error::no_content(Error::Network(e))))
        .collect()
}

async fn aggregate<R, T, C>(
    sources: &[SourceId],
    requests: Vec<Request>,
    task: T,
    config: &VideosConfig,
    convert: C,
) -> Result<FeedResult>
where
    R: Send + 'static,
    T: Fn(Request) -> BoxFuture<'static, Result<R>> + Send + Sync + 'static,
    C: Fn(&SourceId, R) -> Vec<ContentItem>,
{
    debug!(sources = sources.len(), provider = ?config.provider, "Fetching feeds");

    let job = Job::new(task, requests).with_workers(config.workers);
    let outcomes = fetch::execute(job).await.map_err(Error::no_content)?;

    merge_outcomes(sources, outcomes, config.effective_limit(), convert)
}

/// Substitute the video id into a URL template
pub(crate) fn apply_template(template: &str, video_id: &str) -> String {
    template.replace(VIDEO_ID_PLACEHOLDER, video_id)
}
