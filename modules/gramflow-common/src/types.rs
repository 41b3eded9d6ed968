use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which scan technique surfaced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    /// A rendered `<img>` element in the page source.
    RenderedDom,
    /// An image URL field inside an embedded structured-data blob.
    EmbeddedStructuredData,
    /// One entry of a responsive `srcset` candidate list.
    ResponsiveAttributeSet,
}

/// Single vs multi-image post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Single,
    Carousel,
}

/// One discovered image reference, before dedup/classification.
///
/// Created fresh on every scan pass and never mutated. The orchestrator
/// accumulates candidates into a run-scoped set keyed by `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateImage {
    /// Resolved image URL, unique within one scan pass.
    pub url: String,
    /// Accessible description text. Source of date and context hints.
    pub alt_text: String,
    /// Capture date parsed from `alt_text`, when a month/day/year pattern matched.
    pub captured_date: Option<NaiveDate>,
    /// Resolution-derived score. Tie-breaking only, never identity.
    pub quality_score: u32,
    pub discovery_source: DiscoverySource,
    /// Position in run-wide discovery order. Assigned on first sighting of
    /// this URL; later re-sightings keep the original index.
    pub discovery_index: usize,
}

/// The deduplicated identity of one logical image, possibly seen at several
/// URLs/resolutions. Groups within a run are disjoint by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueImageGroup {
    /// Highest-scoring member URL.
    pub representative_url: String,
    /// Every URL whose content hash (or URL signature) matched.
    pub member_urls: BTreeSet<String>,
    pub content_hash: String,
    /// Inherited from the representative member.
    pub date_key: Option<NaiveDate>,
    /// Earliest discovery index among members. Carousel position proxy.
    pub first_seen: usize,
}

/// Interaction technique used for one carousel advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavStrategy {
    ControlClick,
    KeyboardArrow,
    PointerDrag,
    DirectPositionAddress,
}

/// Diagnostic record of one navigation step. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationAttempt {
    /// Strategy that succeeded, or the last one tried when all failed.
    pub strategy: NavStrategy,
    pub succeeded: bool,
    pub new_unique_images_found: u32,
}

/// Final answer for one post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub post_id: String,
    pub post_type: PostType,
    /// Unique images in carousel position order where determinable,
    /// else discovery order.
    pub images: Vec<UniqueImageGroup>,
    /// Diagnostic trail, one entry per navigation step.
    pub navigation_log: Vec<NavigationAttempt>,
    /// Set when no dated bucket was found and the image set could not be
    /// separated from related content. Callers should treat `images` as
    /// possibly over-inclusive.
    pub best_effort: bool,
}

impl ExtractionResult {
    /// Records in the shape the storage collaborator expects, one per image.
    pub fn records(&self) -> Vec<ImageRecord> {
        self.images
            .iter()
            .enumerate()
            .map(|(i, g)| ImageRecord {
                post_id: self.post_id.clone(),
                position_index: i,
                source_url: g.representative_url.clone(),
                content_hash: g.content_hash.clone(),
            })
            .collect()
    }
}

/// Per-image metadata record persisted downstream alongside the binary blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub post_id: String,
    pub position_index: usize,
    pub source_url: String,
    pub content_hash: String,
}
