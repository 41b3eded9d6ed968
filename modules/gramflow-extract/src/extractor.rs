//! Extraction orchestrator — ties detection, navigation, scanning, hashing
//! and classification into one run per post.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gramflow_common::{
    CandidateImage, Config, ExtractionResult, GramflowError, NavigationAttempt, PostType,
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dategroup::{self, BucketPolicy};
use crate::detector;
use crate::fetcher::ImageFetcher;
use crate::hashing;
use crate::navigation::NavigationEngine;
use crate::scanner;
use crate::scoring;
use crate::session::BrowserSession;

/// Tunables for one extraction run.
#[derive(Clone)]
pub struct ExtractorConfig {
    /// A post id is appended to this, `{base}/{post_id}/`.
    pub post_url_base: String,
    /// Base settle wait after page-changing interactions.
    pub settle_base: Duration,
    /// Hard cap on navigation steps. Doubles as the termination guarantee.
    pub max_nav_attempts: u32,
    /// Consecutive steps yielding no new unique image before giving up.
    pub max_no_new_steps: u32,
    /// Known image count for this post, when the caller has one. The loop
    /// stops as soon as that many unique images have been seen, counted by
    /// URL-signature identity; with a fetcher supplied the final byte-hash
    /// grouping can still merge further, so this is a stopping hint, not a
    /// guarantee of the result size.
    pub expected_count: Option<usize>,
    pub bucket_policy: BucketPolicy,
    /// Cooperative cancellation, checked at the top of each loop iteration.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            post_url_base: "https://www.instagram.com/p".to_string(),
            settle_base: Duration::from_secs(3),
            max_nav_attempts: 12,
            max_no_new_steps: 3,
            expected_count: None,
            bucket_policy: BucketPolicy::default(),
            cancel: None,
        }
    }
}

impl ExtractorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            post_url_base: config.post_url_base.clone(),
            settle_base: config.settle_base,
            max_nav_attempts: config.max_nav_attempts,
            max_no_new_steps: config.max_no_new_steps,
            ..Self::default()
        }
    }
}

/// Failure with the partial diagnostic trail. Batch callers log it and
/// continue with the next post.
#[derive(Debug, Error)]
#[error("Extraction of {post_id} failed: {error}")]
pub struct ExtractionFailure {
    pub post_id: String,
    pub error: GramflowError,
    pub navigation_log: Vec<NavigationAttempt>,
}

pub struct CarouselExtractor {
    session: Arc<dyn BrowserSession>,
    /// When present, dedup identity comes from downloaded bytes; otherwise
    /// from normalized URL signatures.
    fetcher: Option<Arc<dyn ImageFetcher>>,
    nav: NavigationEngine,
    config: ExtractorConfig,
}

impl CarouselExtractor {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        fetcher: Option<Arc<dyn ImageFetcher>>,
        config: ExtractorConfig,
    ) -> Self {
        let nav = NavigationEngine::new(config.settle_base);
        Self {
            session,
            fetcher,
            nav,
            config,
        }
    }

    /// The sole public operation: resolve one post into its ordered set of
    /// unique images. Failures come back as a structured value carrying the
    /// partial navigation log, never as a panic past the caller.
    pub async fn extract(&self, post_id: &str) -> Result<ExtractionResult, ExtractionFailure> {
        let run_id = Uuid::new_v4();
        info!(%run_id, post_id, "Extraction started");

        let mut navigation_log = Vec::new();
        match self.run(post_id, &mut navigation_log).await {
            Ok(result) => {
                info!(
                    %run_id,
                    post_id,
                    images = result.images.len(),
                    steps = result.navigation_log.len(),
                    best_effort = result.best_effort,
                    "Extraction complete"
                );
                Ok(result)
            }
            Err(error) => {
                warn!(%run_id, post_id, error = %error, steps = navigation_log.len(), "Extraction failed");
                Err(ExtractionFailure {
                    post_id: post_id.to_string(),
                    error,
                    navigation_log,
                })
            }
        }
    }

    async fn run(
        &self,
        post_id: &str,
        navigation_log: &mut Vec<NavigationAttempt>,
    ) -> Result<ExtractionResult, GramflowError> {
        let post_url = format!(
            "{}/{}/",
            self.config.post_url_base.trim_end_matches('/'),
            post_id
        );

        self.session
            .navigate(&post_url)
            .await
            .map_err(|e| GramflowError::Session(format!("Initial page load failed: {e:#}")))?;
        self.session
            .wait_settled(self.config.settle_base)
            .await
            .map_err(|e| GramflowError::Session(format!("Initial settle failed: {e:#}")))?;

        let page = self
            .session
            .page_state()
            .await
            .map_err(|e| GramflowError::Session(format!("Initial page snapshot failed: {e:#}")))?;
        let post_type = detector::detect(&page);
        info!(post_id, ?post_type, "Post type detected");

        let mut accumulator = CandidateAccumulator::default();
        accumulator.merge(scanner::scan(&page));

        if post_type == PostType::Single {
            return self.finalize_single(post_id, &accumulator).await;
        }

        // Carousel position is server/DOM-side mutable state: every step must
        // settle before the next scan, no parallelism within one post.
        let mut position: u32 = 1;
        let mut no_new_streak: u32 = 0;

        for _ in 0..self.config.max_nav_attempts {
            if let Some(cancel) = &self.config.cancel {
                if cancel.load(Ordering::Relaxed) {
                    info!(post_id, "Cancelled, finalizing with partial set");
                    break;
                }
            }
            if let Some(expected) = self.config.expected_count {
                if accumulator.unique_count() >= expected {
                    info!(post_id, expected, "Expected image count reached");
                    break;
                }
            }

            let (strategy, succeeded) = self
                .nav
                .advance(self.session.as_ref(), &post_url, position + 1)
                .await
                .map_err(|e| GramflowError::Navigation(format!("Step {position} failed: {e:#}")))?;

            if !succeeded {
                navigation_log.push(NavigationAttempt {
                    strategy,
                    succeeded: false,
                    new_unique_images_found: 0,
                });
                info!(post_id, position, "All strategies exhausted, end of carousel");
                break;
            }
            position += 1;

            let page = self
                .session
                .page_state()
                .await
                .map_err(|e| GramflowError::Session(format!("Post-navigation snapshot failed: {e:#}")))?;
            let new_unique = accumulator.merge(scanner::scan(&page));
            navigation_log.push(NavigationAttempt {
                strategy,
                succeeded: true,
                new_unique_images_found: new_unique,
            });

            if new_unique == 0 {
                no_new_streak += 1;
                if no_new_streak >= self.config.max_no_new_steps {
                    info!(post_id, streak = no_new_streak, "No new images for too many steps");
                    break;
                }
            } else {
                no_new_streak = 0;
            }
        }

        if accumulator.is_empty() {
            let scans = navigation_log.iter().filter(|a| a.succeeded).count() as u32 + 1;
            return Err(GramflowError::EmptyPage(scans));
        }

        let groups =
            hashing::group_candidates(accumulator.candidates(), self.fetcher.as_deref()).await;
        let (images, best_effort) = dategroup::classify(groups, self.config.bucket_policy);

        Ok(ExtractionResult {
            post_id: post_id.to_string(),
            post_type: PostType::Carousel,
            images,
            navigation_log: navigation_log.clone(),
            best_effort,
        })
    }

    /// Single-post shortcut: one scan, one grouping pass, top-scored group
    /// as the sole result. Related-content filtering is irrelevant here.
    async fn finalize_single(
        &self,
        post_id: &str,
        accumulator: &CandidateAccumulator,
    ) -> Result<ExtractionResult, GramflowError> {
        let groups =
            hashing::group_candidates(accumulator.candidates(), self.fetcher.as_deref()).await;

        let Some(best) = groups.into_iter().max_by_key(|g| {
            (
                scoring::quality_score(&g.representative_url),
                std::cmp::Reverse(g.first_seen),
            )
        }) else {
            return Err(GramflowError::EmptyPage(1));
        };

        Ok(ExtractionResult {
            post_id: post_id.to_string(),
            post_type: PostType::Single,
            images: vec![best],
            navigation_log: Vec::new(),
            best_effort: false,
        })
    }
}

/// Run-scoped candidate set. Keyed by URL; `new_unique` accounting uses URL
/// signatures so resolution variants of an already-seen image do not reset
/// the no-progress streak.
#[derive(Default)]
struct CandidateAccumulator {
    candidates: Vec<CandidateImage>,
    seen_urls: HashSet<String>,
    seen_signatures: HashSet<String>,
}

impl CandidateAccumulator {
    /// Merge one scan pass, assigning run-wide discovery indexes. Returns
    /// the number of previously-unseen unique images this pass contributed.
    fn merge(&mut self, scanned: Vec<CandidateImage>) -> u32 {
        let mut new_unique = 0;
        for mut candidate in scanned {
            if !self.seen_urls.insert(candidate.url.clone()) {
                continue;
            }
            if self
                .seen_signatures
                .insert(hashing::url_signature(&candidate.url))
            {
                new_unique += 1;
            }
            candidate.discovery_index = self.candidates.len();
            self.candidates.push(candidate);
        }
        new_unique
    }

    fn unique_count(&self) -> usize {
        self.seen_signatures.len()
    }

    fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn candidates(&self) -> &[CandidateImage] {
        &self.candidates
    }
}
