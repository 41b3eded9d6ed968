//! Test fixtures — scripted browser sessions and canned fetchers.
//!
//! Recorded/synthesized DOM snapshots stand in for live pages so extraction
//! behavior is regression-tested without network access.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use gramflow_common::{CandidateImage, DiscoverySource, UniqueImageGroup};

use crate::fetcher::ImageFetcher;
use crate::session::{BrowserSession, PageState};

// ---------------------------------------------------------------------------
// HTML fixture builders
// ---------------------------------------------------------------------------

/// A content-image URL in the CDN's shape. Same `media_id` at different
/// sizes models the same logical image served at several resolutions.
pub fn cdn_url(media_id: u64, size: u32) -> String {
    format!(
        "https://scontent.cdninstagram.com/v/t51.29350-15/s{size}x{size}/{media_id}_{size}_7_n.jpg"
    )
}

pub fn img_tag(url: &str, alt: &str) -> String {
    format!(r#"<img alt="{alt}" src="{url}">"#)
}

/// One rendered post page. `has_next_control` plants the carousel
/// navigation affordance the detector looks for.
pub fn post_page(parts: &[String], has_next_control: bool) -> String {
    let next = if has_next_control {
        r#"<button aria-label="Next"><svg></svg></button>"#
    } else {
        ""
    };
    format!(
        "<html><body><main>{}\n{next}</main></body></html>",
        parts.join("\n")
    )
}

// ---------------------------------------------------------------------------
// Data fixture builders
// ---------------------------------------------------------------------------

pub fn candidate(url: &str, alt: &str, discovery_index: usize) -> CandidateImage {
    CandidateImage {
        url: url.to_string(),
        alt_text: alt.to_string(),
        captured_date: crate::dategroup::parse_date_key(alt),
        quality_score: crate::scoring::quality_score(url),
        discovery_source: DiscoverySource::RenderedDom,
        discovery_index,
    }
}

pub fn group_with_date(
    url: &str,
    date_key: Option<NaiveDate>,
    first_seen: usize,
) -> UniqueImageGroup {
    UniqueImageGroup {
        representative_url: url.to_string(),
        member_urls: std::iter::once(url.to_string()).collect(),
        content_hash: format!("h:{url}"),
        date_key,
        first_seen,
    }
}

// ---------------------------------------------------------------------------
// ScriptedSession — a carousel as a fixed sequence of page snapshots
// ---------------------------------------------------------------------------

/// Browser session over a scripted page sequence. Each enabled interaction
/// technique advances the position; a technique at the end of the script
/// acts but changes nothing, which is exactly how a real carousel ends.
pub struct ScriptedSession {
    pages: Vec<String>,
    position: Mutex<usize>,
    click_enabled: bool,
    keyboard_enabled: bool,
    drag_enabled: bool,
    direct_enabled: bool,
}

impl ScriptedSession {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            position: Mutex::new(0),
            click_enabled: true,
            keyboard_enabled: true,
            drag_enabled: true,
            direct_enabled: true,
        }
    }

    pub fn without_click(mut self) -> Self {
        self.click_enabled = false;
        self
    }

    pub fn without_keyboard(mut self) -> Self {
        self.keyboard_enabled = false;
        self
    }

    pub fn without_drag(mut self) -> Self {
        self.drag_enabled = false;
        self
    }

    pub fn without_direct(mut self) -> Self {
        self.direct_enabled = false;
        self
    }

    fn advance_if_possible(&self) {
        let mut pos = self.position.lock().expect("position lock");
        if *pos + 1 < self.pages.len() {
            *pos += 1;
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        if !self.direct_enabled {
            return Ok(());
        }
        // "?img_index=N" re-addresses position N (1-based); anything else is
        // the initial post load.
        if let Some(idx) = url.split("img_index=").nth(1) {
            let requested: usize = idx.parse().unwrap_or(1);
            let mut pos = self.position.lock().expect("position lock");
            if requested >= 1 && requested <= self.pages.len() {
                *pos = requested - 1;
            }
        } else {
            *self.position.lock().expect("position lock") = 0;
        }
        Ok(())
    }

    async fn page_state(&self) -> Result<PageState> {
        let pos = *self.position.lock().expect("position lock");
        Ok(PageState {
            url: "https://www.instagram.com/p/SCRIPTED/".to_string(),
            html: self.pages[pos].clone(),
        })
    }

    async fn click(&self, _css: &str) -> Result<bool> {
        if !self.click_enabled {
            return Ok(false);
        }
        self.advance_if_possible();
        Ok(true)
    }

    async fn send_key(&self, _key: &str) -> Result<()> {
        if self.keyboard_enabled {
            self.advance_if_possible();
        }
        Ok(())
    }

    async fn pointer_drag(&self, _from: (i64, i64), _to: (i64, i64)) -> Result<()> {
        if self.drag_enabled {
            self.advance_if_possible();
        }
        Ok(())
    }

    async fn wait_settled(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

/// Session whose driver dies after serving the initial page: snapshots
/// still answer, but every interaction command errors.
pub struct MidRunDisconnectSession {
    page: String,
}

impl MidRunDisconnectSession {
    pub fn new(page: String) -> Self {
        Self { page }
    }
}

#[async_trait]
impl BrowserSession for MidRunDisconnectSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        if url.contains("img_index=") {
            return Err(anyhow!("browser session disconnected"));
        }
        Ok(())
    }

    async fn page_state(&self) -> Result<PageState> {
        Ok(PageState {
            url: "https://www.instagram.com/p/SCRIPTED/".to_string(),
            html: self.page.clone(),
        })
    }

    async fn click(&self, _css: &str) -> Result<bool> {
        Err(anyhow!("browser session disconnected"))
    }

    async fn send_key(&self, _key: &str) -> Result<()> {
        Err(anyhow!("browser session disconnected"))
    }

    async fn pointer_drag(&self, _from: (i64, i64), _to: (i64, i64)) -> Result<()> {
        Err(anyhow!("browser session disconnected"))
    }

    async fn wait_settled(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

/// Session whose driver is gone. Every call fails.
pub struct DisconnectedSession;

#[async_trait]
impl BrowserSession for DisconnectedSession {
    async fn navigate(&self, _url: &str) -> Result<()> {
        Err(anyhow!("browser session disconnected"))
    }

    async fn page_state(&self) -> Result<PageState> {
        Err(anyhow!("browser session disconnected"))
    }

    async fn click(&self, _css: &str) -> Result<bool> {
        Err(anyhow!("browser session disconnected"))
    }

    async fn send_key(&self, _key: &str) -> Result<()> {
        Err(anyhow!("browser session disconnected"))
    }

    async fn pointer_drag(&self, _from: (i64, i64), _to: (i64, i64)) -> Result<()> {
        Err(anyhow!("browser session disconnected"))
    }

    async fn wait_settled(&self, _timeout: Duration) -> Result<()> {
        Err(anyhow!("browser session disconnected"))
    }
}

// ---------------------------------------------------------------------------
// FixedFetcher — canned bytes per URL
// ---------------------------------------------------------------------------

/// Fetcher serving canned bytes. Unknown URLs error, like a dead CDN edge.
#[derive(Default)]
pub struct FixedFetcher {
    bodies: HashMap<String, Vec<u8>>,
}

impl FixedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), bytes);
        self
    }
}

#[async_trait]
impl ImageFetcher for FixedFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        self.bodies
            .get(url)
            .map(|b| Bytes::from(b.clone()))
            .ok_or_else(|| anyhow!("no canned response for {url}"))
    }
}
