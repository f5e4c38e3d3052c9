//! Bilibili space archive feed (JSON)

use super::{ContentItem, SourceId, apply_template};
use crate::config::VideosConfig;
use crate::utils::enforce_https;
use chrono::{DateTime, Utc};
use reqwest::{Client, Request};
use serde::Deserialize;

/// User agent sent with archive requests; the API throttles unknown clients
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const REFERER: &str = "https://www.bilibili.com/";

/// Response of `/x/v2/space/archive/cursor`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpaceArchiveResponse {
    /// API status code, 0 on success
    pub code: i64,
    /// API status message
    pub message: String,
    /// Payload; absent or null when the API refuses the request
    pub data: Option<SpaceArchiveData>,
}

/// Payload of a space archive response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpaceArchiveData {
    /// Uploaded videos
    pub item: Vec<SpaceArchiveItem>,
}

/// One uploaded video
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpaceArchiveItem {
    /// Video title
    pub title: String,
    /// Cover image URL
    pub cover: String,
    /// Upload time, unix seconds
    pub ctime: i64,
    /// Uploader name
    pub author: String,
    /// Video id
    pub bvid: String,
}

/// Build the archive request for one author
pub fn feed_request(
    client: &Client,
    config: &VideosConfig,
    source: &SourceId,
) -> reqwest::Result<Request> {
    client
        .get(format!(
            "{}/x/v2/space/archive/cursor",
            config.bilibili_api_base.trim_end_matches('/')
        ))
        .query(&[("vmid", source.id())])
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .header(reqwest::header::REFERER, REFERER)
        .timeout(config.request_timeout)
        .build()
}

/// Convert one author's archive into content items
pub fn to_items(
    source: &SourceId,
    response: SpaceArchiveResponse,
    url_template: &str,
) -> Vec<ContentItem> {
    if response.code != 0 {
        tracing::warn!(
            source = %source,
            code = response.code,
            message = %response.message,
            "Bilibili API returned a non-zero code"
        );
    }

    let author_url = format!("https://space.bilibili.com/{}", source.id());

    response
        .data
        .map(|data| data.item)
        .unwrap_or_default()
        .into_iter()
        .map(|video| {
            let url = if url_template.is_empty() {
                format!("https://www.bilibili.com/video/{}", video.bvid)
            } else {
                apply_template(url_template, &video.bvid)
            };

            ContentItem {
                title: video.title,
                url: enforce_https(&url),
                author: video.author,
                author_url: author_url.clone(),
                thumbnail_url: video.cover,
                published: DateTime::from_timestamp(video.ctime, 0).unwrap_or_else(Utc::now),
            }
        })
        .collect()
}
