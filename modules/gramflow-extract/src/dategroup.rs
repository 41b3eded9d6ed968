//! Date-group classification — separating this post's images from related
//! content rendered on the same page.
//!
//! Accessible alt text on content images usually carries a capture date
//! ("Photo by X on December 12, 2023"). Images from one post share a date;
//! related/suggested posts rendered further down the page carry different
//! dates. Which bucket is "the post" is a heuristic, so the policy is
//! injectable and disagreements between policies are logged for review.

use chrono::NaiveDate;
use gramflow_common::UniqueImageGroup;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Undated groups at most this many positions past the selected bucket's
/// end still count as the post's own images.
const UNDATED_LOOKAHEAD: usize = 3;

/// Parse a date-key out of alt text. Month-name + day + year only; the CDN
/// never localizes these strings.
pub fn parse_date_key(alt: &str) -> Option<NaiveDate> {
    let date_re = Regex::new(
        r"(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2}),\s+(\d{4})",
    )
    .expect("valid regex");

    let cap = date_re.captures(alt)?;
    NaiveDate::parse_from_str(&format!("{} {}, {}", &cap[1], &cap[2], &cap[3]), "%B %d, %Y").ok()
}

/// Which dated bucket is treated as the main post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketPolicy {
    /// First bucket in discovery order. Related content renders after the
    /// primary post, so first-encountered approximates "main post".
    #[default]
    FirstEncountered,
    /// Bucket with the most groups.
    Largest,
    /// Bucket with the most recent date.
    MostRecent,
}

/// Select the main post's groups and order them.
///
/// Returns `(groups, best_effort)`. `best_effort` is set when no dated
/// bucket exists: the main post cannot be told apart from related content,
/// so everything is returned and the caller decides what to trust.
pub fn classify(
    groups: Vec<UniqueImageGroup>,
    policy: BucketPolicy,
) -> (Vec<UniqueImageGroup>, bool) {
    let mut ordered = groups;
    ordered.sort_by_key(|g| g.first_seen);

    // Dated buckets in encounter order; positions are indexes into `ordered`.
    let mut buckets: Vec<(NaiveDate, Vec<usize>)> = Vec::new();
    let mut undated: Vec<usize> = Vec::new();

    for (pos, group) in ordered.iter().enumerate() {
        match group.date_key {
            Some(date) => match buckets.iter_mut().find(|(d, _)| *d == date) {
                Some((_, positions)) => positions.push(pos),
                None => buckets.push((date, vec![pos])),
            },
            None => undated.push(pos),
        }
    }

    if buckets.is_empty() {
        info!(
            groups = ordered.len(),
            "No dated buckets, returning all groups as best effort"
        );
        return (ordered, true);
    }

    let selected = select_bucket(&buckets, policy);

    // The heuristic is fragile; surface disagreements without changing behavior.
    let by_first = select_bucket(&buckets, BucketPolicy::FirstEncountered);
    let by_largest = select_bucket(&buckets, BucketPolicy::Largest);
    let by_recent = select_bucket(&buckets, BucketPolicy::MostRecent);
    if by_first != by_largest || by_first != by_recent {
        warn!(
            first_encountered = %buckets[by_first].0,
            largest = %buckets[by_largest].0,
            most_recent = %buckets[by_recent].0,
            "Bucket policies disagree on the main post"
        );
    }

    let selected_positions = &buckets[selected].1;
    let selected_end = *selected_positions.last().unwrap_or(&0);

    // First dated position belonging to a later, non-selected bucket.
    let next_dated_start = buckets
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != selected)
        .flat_map(|(_, (_, positions))| positions.iter().copied())
        .filter(|&p| p > selected_end)
        .min()
        .unwrap_or(usize::MAX);

    // Undated groups within or immediately after the selected bucket's span.
    let trailing_undated: Vec<usize> = undated
        .iter()
        .copied()
        .filter(|&p| p < next_dated_start && p <= selected_end + UNDATED_LOOKAHEAD)
        .collect();

    let mut keep: Vec<usize> = selected_positions.clone();
    keep.extend(trailing_undated);

    let discarded = ordered.len() - keep.len();
    if discarded > 0 {
        info!(
            kept = keep.len(),
            discarded, "Filtered related-content groups by date bucket"
        );
    }

    let mut keep_flags = vec![false; ordered.len()];
    for &p in &keep {
        keep_flags[p] = true;
    }

    let result: Vec<UniqueImageGroup> = ordered
        .into_iter()
        .enumerate()
        .filter(|(pos, _)| keep_flags[*pos])
        .map(|(_, g)| g)
        .collect();

    (result, false)
}

fn select_bucket(buckets: &[(NaiveDate, Vec<usize>)], policy: BucketPolicy) -> usize {
    match policy {
        BucketPolicy::FirstEncountered => 0,
        BucketPolicy::Largest => buckets
            .iter()
            .enumerate()
            .max_by_key(|(i, (_, positions))| (positions.len(), std::cmp::Reverse(*i)))
            .map(|(i, _)| i)
            .unwrap_or(0),
        BucketPolicy::MostRecent => buckets
            .iter()
            .enumerate()
            .max_by_key(|(_, (date, _))| *date)
            .map(|(i, _)| i)
            .unwrap_or(0),
    }
}
