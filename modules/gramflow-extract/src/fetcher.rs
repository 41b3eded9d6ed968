//! Image byte fetching for content hashing and downstream download.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use tracing::{debug, warn};

/// Max attempts per URL. CDN edges intermittently 429/503 under load.
const FETCH_MAX_ATTEMPTS: u32 = 3;
const FETCH_RETRY_BASE: Duration = Duration::from_secs(2);

/// Payloads below this are usually error pages or tracking pixels.
const MIN_IMAGE_BYTES: usize = 5_000;

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// HTTP fetcher with the headers the CDN requires. Requests without a
/// referrer get a 403.
pub struct HttpImageFetcher {
    client: reqwest::Client,
    referrer: String,
}

impl HttpImageFetcher {
    pub fn new(referrer: &str, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            referrer: referrer.to_string(),
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let mut last_err = None;

        for attempt in 0..FETCH_MAX_ATTEMPTS {
            if attempt > 0 {
                let jitter = Duration::from_millis(rand::rng().random_range(0..500));
                tokio::time::sleep(FETCH_RETRY_BASE + jitter).await;
            }

            let result = self
                .client
                .get(url)
                .header(reqwest::header::REFERER, &self.referrer)
                .header(reqwest::header::ACCEPT, "image/avif,image/webp,image/*,*/*;q=0.8")
                .send()
                .await;

            let resp = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!(url, attempt = attempt + 1, error = %e, "Image fetch failed");
                    last_err = Some(anyhow::Error::new(e));
                    continue;
                }
            };

            if !resp.status().is_success() {
                warn!(url, attempt = attempt + 1, status = %resp.status(), "Image fetch rejected");
                last_err = Some(anyhow::anyhow!("HTTP {}", resp.status()));
                continue;
            }

            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if !content_type.starts_with("image/") {
                anyhow::bail!("Not an image: {content_type} for {url}");
            }

            let bytes = resp.bytes().await.context("Reading image body failed")?;
            if bytes.len() < MIN_IMAGE_BYTES {
                warn!(url, bytes = bytes.len(), "Suspiciously small image payload");
            }

            debug!(url, bytes = bytes.len(), "Image fetched");
            return Ok(bytes);
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Image fetch failed: {url}")))
    }
}
