//! Navigation strategy engine — one underlying requirement ("advance the
//! carousel despite an unreliable interactive surface") behind an ordered
//! list of interchangeable techniques.

use std::time::Duration;

use anyhow::Result;
use gramflow_common::NavStrategy;
use rand::Rng;
use tracing::{debug, info};

use crate::session::{keys, BrowserSession};

/// Accessible-label and legacy-class selectors for the "next" control, in
/// the order they are worth trying. The interactive surface changes often;
/// several of these are dead at any given time.
pub const NEXT_CONTROL_LOCATORS: &[&str] = &[
    "button[aria-label*='Next']",
    "button[aria-label*='next']",
    "[role='button'][aria-label*='Next']",
    "svg[aria-label*='Next']",
    "[data-testid='next']",
    "[data-testid='carousel-next']",
    "._6CZji",
    ".coreSpriteRightPaginationArrow",
];

/// Right-to-left swipe across the image viewport.
const DRAG_FROM: (i64, i64) = (600, 400);
const DRAG_TO: (i64, i64) = (200, 400);

/// All four techniques, in fallback order. Direct positional addressing is
/// the most reliable but forces a full reload, so it goes last.
const STRATEGY_ORDER: [NavStrategy; 4] = [
    NavStrategy::ControlClick,
    NavStrategy::KeyboardArrow,
    NavStrategy::PointerDrag,
    NavStrategy::DirectPositionAddress,
];

pub struct NavigationEngine {
    settle_base: Duration,
}

impl NavigationEngine {
    pub fn new(settle_base: Duration) -> Self {
        Self { settle_base }
    }

    /// Try each strategy until one changes the rendered page.
    ///
    /// Returns the strategy used and whether any succeeded. A strategy with
    /// nothing to act on falls through to the next one; `Err` means the
    /// session itself failed mid-step and the run cannot continue, matching
    /// the `BrowserSession` contract that interaction commands only error on
    /// session-level failure.
    pub async fn advance(
        &self,
        session: &dyn BrowserSession,
        post_url: &str,
        next_position: u32,
    ) -> Result<(NavStrategy, bool)> {
        let before = session.page_state().await?.fingerprint();

        for strategy in STRATEGY_ORDER {
            let acted = self
                .try_strategy(session, strategy, post_url, next_position)
                .await?;
            if !acted {
                debug!(?strategy, "Strategy had nothing to act on");
                continue;
            }

            self.settle(session).await?;

            let after = session.page_state().await?.fingerprint();
            if after != before {
                info!(?strategy, next_position, "Carousel advanced");
                return Ok((strategy, true));
            }
            debug!(?strategy, "No page change after strategy");
        }

        Ok((NavStrategy::DirectPositionAddress, false))
    }

    async fn try_strategy(
        &self,
        session: &dyn BrowserSession,
        strategy: NavStrategy,
        post_url: &str,
        next_position: u32,
    ) -> Result<bool> {
        match strategy {
            NavStrategy::ControlClick => {
                for locator in NEXT_CONTROL_LOCATORS {
                    if session.click(locator).await? {
                        debug!(locator, "Clicked next control");
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            NavStrategy::KeyboardArrow => {
                session.send_key(keys::ARROW_RIGHT).await?;
                Ok(true)
            }
            NavStrategy::PointerDrag => {
                session.pointer_drag(DRAG_FROM, DRAG_TO).await?;
                Ok(true)
            }
            NavStrategy::DirectPositionAddress => {
                let url = format!("{post_url}?img_index={next_position}");
                session.navigate(&url).await?;
                Ok(true)
            }
        }
    }

    /// Fixed-plus-jittered wait for the page to settle after an interaction.
    async fn settle(&self, session: &dyn BrowserSession) -> Result<()> {
        let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
        session.wait_settled(self.settle_base + jitter).await
    }
}
