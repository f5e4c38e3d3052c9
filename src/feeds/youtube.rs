//! YouTube uploads feed (Atom XML)

use super::{ContentItem, SourceId, apply_template};
use crate::config::VideosConfig;
use crate::utils::enforce_https;
use chrono::{DateTime, Utc};
use reqwest::{Client, Request};
use serde::Deserialize;

/// Channel ids start with this; the matching uploads playlist without shorts uses `UULF`
const CHANNEL_PREFIX: &str = "UC";
const UPLOADS_WITHOUT_SHORTS_PREFIX: &str = "UULF";

/// Atom document returned by `/feeds/videos.xml`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UploadsFeed {
    /// Channel that owns the feed
    pub author: FeedAuthor,
    /// Feed entries, newest first as delivered
    #[serde(rename = "entry")]
    pub entries: Vec<FeedEntry>,
}

/// `<author>` of the feed
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeedAuthor {
    /// Channel name
    pub name: String,
    /// Channel URL
    pub uri: String,
}

/// One `<entry>`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeedEntry {
    /// Video title
    pub title: String,
    /// Publication time as written in the feed
    pub published: String,
    /// Watch link
    pub link: EntryLink,
    /// `<media:group>`, matched by local name
    #[serde(rename = "group")]
    pub group: MediaGroup,
}

/// `<link href="...">`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EntryLink {
    /// Link target
    #[serde(rename = "@href")]
    pub href: String,
}

/// `<media:group>`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MediaGroup {
    /// `<media:thumbnail>`, matched by local name
    #[serde(rename = "thumbnail")]
    pub thumbnail: MediaThumbnail,
}

/// `<media:thumbnail url="...">`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MediaThumbnail {
    /// Thumbnail URL
    #[serde(rename = "@url")]
    pub url: String,
}

/// The `(parameter, value)` query selecting a source's uploads feed
pub(crate) fn feed_query(source: &SourceId, include_shorts: bool) -> (&'static str, String) {
    if source.is_playlist() {
        ("playlist_id", source.id().to_string())
    } else if !include_shorts && source.id().starts_with(CHANNEL_PREFIX) {
        (
            "playlist_id",
            source
                .id()
                .replacen(CHANNEL_PREFIX, UPLOADS_WITHOUT_SHORTS_PREFIX, 1),
        )
    } else {
        ("channel_id", source.id().to_string())
    }
}

/// Build the uploads feed request for one channel or playlist
pub fn feed_request(
    client: &Client,
    config: &VideosConfig,
    source: &SourceId,
) -> reqwest::Result<Request> {
    let (param, value) = feed_query(source, config.include_shorts);

    client
        .get(format!(
            "{}/feeds/videos.xml",
            config.youtube_feed_base.trim_end_matches('/')
        ))
        .query(&[(param, value.as_str())])
        .timeout(config.request_timeout)
        .build()
}

/// Parse an entry timestamp; a malformed value falls back to now so the entry is kept
pub fn parse_feed_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn video_url(link: &str, url_template: &str) -> String {
    if url_template.is_empty() {
        return enforce_https(link);
    }

    match url::Url::parse(link) {
        Ok(parsed) => {
            let video_id = parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
            enforce_https(&apply_template(url_template, &video_id))
        }
        Err(_) => "#".to_string(),
    }
}

/// Convert one uploads feed into content items
pub fn to_items(feed: UploadsFeed, url_template: &str) -> Vec<ContentItem> {
    let author_url = format!("{}/videos", feed.author.uri);
    let author = feed.author.name;

    feed.entries
        .into_iter()
        .map(|entry| ContentItem {
            url: video_url(&entry.link.href, url_template),
            title: entry.title,
            author: author.clone(),
            author_url: author_url.clone(),
            thumbnail_url: entry.group.thumbnail.url,
            published: parse_feed_time(&entry.published),
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedProvider;
    use crate::feeds::fetch_uploads;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id=UCabc"/>
 <id>yt:channel:abc</id>
 <yt:channelId>abc</yt:channelId>
 <title>Some Channel</title>
 <link rel="alternate" href="https://www.youtube.com/channel/UCabc"/>
 <author>
  <name>Some Channel</name>
  <uri>https://www.youtube.com/channel/UCabc</uri>
 </author>
 <published>2015-01-01T00:00:00+00:00</published>
 <entry>
  <id>yt:video:vid1</id>
  <yt:videoId>vid1</yt:videoId>
  <title>First upload</title>
  <link rel="alternate" href="http://www.youtube.com/watch?v=vid1"/>
  <published>2024-03-01T12:00:00+00:00</published>
  <updated>2024-03-02T12:00:00+00:00</updated>
  <media:group>
   <media:title>First upload</media:title>
   <media:content url="https://www.youtube.com/v/vid1?version=3" type="application/x-shockwave-flash" width="640" height="390"/>
   <media:thumbnail url="https://i1.ytimg.com/vi/vid1/hqdefault.jpg" width="480" height="360"/>
   <media:description>desc</media:description>
  </media:group>
 </entry>
 <entry>
  <id>yt:video:vid2</id>
  <yt:videoId>vid2</yt:videoId>
  <title>Second upload</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=vid2"/>
  <published>not a date</published>
  <media:group>
   <media:thumbnail url="https://i1.ytimg.com/vi/vid2/hqdefault.jpg" width="480" height="360"/>
  </media:group>
 </entry>
</feed>"#;

    #[test]
    fn test_feed_query_variants() {
        assert_eq!(
            feed_query(&SourceId::playlist("PLxyz"), false),
            ("playlist_id", "PLxyz".to_string())
        );
        assert_eq!(
            feed_query(&SourceId::new("UCabc"), false),
            ("playlist_id", "UULFabc".to_string())
        );
        assert_eq!(
            feed_query(&SourceId::new("UCabc"), true),
            ("channel_id", "UCabc".to_string())
        );
        assert_eq!(
            feed_query(&SourceId::new("HCabc"), false),
            ("channel_id", "HCabc".to_string())
        );
    }

    #[test]
    fn test_parse_feed_time() {
        let parsed = parse_feed_time("2024-03-01T12:00:00+02:00");
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T10:00:00+00:00");

        let before = Utc::now();
        let fallback = parse_feed_time("yesterday-ish");
        assert!(fallback >= before);
    }

    #[test]
    fn test_decode_and_convert_feed() {
        let feed: UploadsFeed = quick_xml::de::from_str(FEED).unwrap();
        assert_eq!(feed.entries.len(), 2);

        let before = Utc::now();
        let items = to_items(feed, "");

        assert_eq!(items[0].title, "First upload");
        assert_eq!(items[0].url, "https://www.youtube.com/watch?v=vid1");
        assert_eq!(items[0].author, "Some Channel");
        assert_eq!(
            items[0].author_url,
            "https://www.youtube.com/channel/UCabc/videos"
        );
        assert_eq!(
            items[0].thumbnail_url,
            "https://i1.ytimg.com/vi/vid1/hqdefault.jpg"
        );
        assert_eq!(items[0].published.to_rfc3339(), "2024-03-01T12:00:00+00:00");

        // Malformed date keeps the entry with a "now" timestamp
        assert_eq!(items[1].title, "Second upload");
        assert!(items[1].published >= before);
    }

    #[test]
    fn test_video_url_template() {
        assert_eq!(
            video_url(
                "https://www.youtube.com/watch?v=vid1&t=3",
                "https://invidious.example/watch?v={VIDEO-ID}"
            ),
            "https://invidious.example/watch?v=vid1"
        );
        assert_eq!(video_url("not a url", "https://x/{VIDEO-ID}"), "#");
        assert_eq!(
            video_url("http://www.youtube.com/watch?v=a", ""),
            "https://www.youtube.com/watch?v=a"
        );
    }

    #[tokio::test]
    async fn test_fetch_uploads_uses_playlist_without_shorts() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feeds/videos.xml"))
            .and(query_param("playlist_id", "UULFabc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = VideosConfig {
            provider: FeedProvider::Youtube,
            channels: vec!["UCabc".to_string()],
            youtube_feed_base: mock_server.uri(),
            ..VideosConfig::default()
        };

        let result = fetch_uploads(&Client::new(), &config).await.unwrap();

        assert_eq!(result.items.len(), 2);
        // The entry with the unparsable date is treated as newest
        assert_eq!(result.items[0].title, "Second upload");
        assert_eq!(
            result.items[0].thumbnail_url,
            "https://i1.ytimg.com/vi/vid2/hqdefault.jpg"
        );
        assert!(result.items.iter().all(|i| !i.thumbnail_url.is_empty()));
        assert_eq!(result.failed_sources, 0);
    }
}
