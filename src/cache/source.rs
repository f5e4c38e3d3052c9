//! Where cached assets come from

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Downloads a remote asset into a writer
///
/// The cache owns the temporary file and the rename; implementations only move bytes.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Stream the body of `url` into `sink`, returning the number of bytes written
    ///
    /// # Errors
    ///
    /// Any network failure, non-success status or write failure.
    async fn fetch_into(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64>;
}

/// HTTP asset source sending browser-like headers
///
/// The thumbnail CDN rejects requests without a browser user agent and an
/// origin referer, so both are set on every request.
pub struct HttpAssetSource {
    client: reqwest::Client,
}

impl HttpAssetSource {
    /// Build the client from cache settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured headers are not valid header values.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, header_value(&config.referer, "referer")?);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("image/webp,image/apng,image/*,*/*;q=0.8"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("image"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("no-cors"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("cross-site"));

        let client = reqwest::Client::builder()
            .timeout(config.download_timeout)
            .user_agent(header_value(&config.user_agent, "user_agent")?)
            .default_headers(headers)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        Ok(Self { client })
    }
}

fn header_value(value: &str, key: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Config {
        message: format!("invalid header value: {}", e),
        key: Some(key.to_string()),
    })
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn fetch_into(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        Ok(written)
    }
}
