//! Content hashing and duplicate grouping.
//!
//! Candidates sharing a content hash (or, without downloads, a normalized
//! URL signature) collapse into one `UniqueImageGroup`. Byte-identical
//! content always merges; differing content never does.

use std::collections::{BTreeSet, HashMap};

use gramflow_common::{content_hash, sanitize_url, CandidateImage, UniqueImageGroup};
use regex::Regex;
use tracing::warn;

use crate::fetcher::ImageFetcher;

/// Normalized identity signature for a URL when bytes are unavailable.
///
/// The CDN embeds a stable media id in content filenames; when present it
/// identifies the image across hosts and resolutions. Otherwise fall back
/// to the URL with volatile query params stripped and size segments
/// normalized out of the path.
pub fn url_signature(url: &str) -> String {
    let media_id_re = Regex::new(r"/(\d+)_\d+_\d+_n\.(?:jpg|webp)").expect("valid regex");
    if let Some(cap) = media_id_re.captures(url) {
        return format!("media:{}", &cap[1]);
    }

    let clean = sanitize_url(url);
    let Ok(parsed) = url::Url::parse(&clean) else {
        return format!("url:{clean}");
    };

    let size_segment_re = Regex::new(r"^(?:[sp]\d{3,4}x\d{3,4}|e\d{2,3})$").expect("valid regex");
    let path: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|seg| !size_segment_re.is_match(seg))
        .collect();

    format!("url:{}{}", parsed.host_str().unwrap_or_default(), path.join("/"))
}

/// Fold accumulated candidates into disjoint unique-image groups.
///
/// With a fetcher, identity is the SHA-256 of downloaded bytes; a failed
/// download falls back to the URL signature rather than dropping the
/// candidate. Groups come back in discovery order.
pub async fn group_candidates(
    candidates: &[CandidateImage],
    fetcher: Option<&dyn ImageFetcher>,
) -> Vec<UniqueImageGroup> {
    let mut ordered: Vec<CandidateImage> = candidates.to_vec();
    ordered.sort_by_key(|c| c.discovery_index);

    let mut index_of: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<CandidateImage>)> = Vec::new();

    for candidate in ordered {
        let key = match fetcher {
            Some(f) => match f.fetch(&candidate.url).await {
                Ok(bytes) => content_hash(&bytes),
                Err(e) => {
                    warn!(url = %candidate.url, error = %e, "Hash download failed, using URL signature");
                    url_signature(&candidate.url)
                }
            },
            None => url_signature(&candidate.url),
        };

        match index_of.get(&key).copied() {
            Some(i) => groups[i].1.push(candidate),
            None => {
                index_of.insert(key.clone(), groups.len());
                groups.push((key, vec![candidate]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(hash, members)| {
            let representative = members
                .iter()
                .max_by_key(|c| (c.quality_score, std::cmp::Reverse(c.discovery_index)))
                .cloned()
                .unwrap_or_else(|| members[0].clone());

            let date_key = representative
                .captured_date
                .or_else(|| members.iter().find_map(|m| m.captured_date));
            let first_seen = members
                .iter()
                .map(|m| m.discovery_index)
                .min()
                .unwrap_or_default();

            UniqueImageGroup {
                representative_url: representative.url,
                member_urls: members.iter().map(|m| m.url.clone()).collect::<BTreeSet<_>>(),
                content_hash: hash,
                date_key,
                first_seen,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate, FixedFetcher};
    use std::collections::HashSet;

    #[test]
    fn signature_prefers_media_id_across_resolutions() {
        let a = url_signature(
            "https://scontent.cdn.net/v/t51.29350-15/s640x640/412398_11_22_n.jpg?oh=x",
        );
        let b = url_signature(
            "https://scontent.cdn.net/v/t51.29350-15/s1440x1440/412398_99_33_n.jpg?oe=y",
        );
        assert_eq!(a, b);
        assert!(a.starts_with("media:"));
    }

    #[test]
    fn signature_normalizes_size_segments_without_media_id() {
        let a = url_signature("https://scontent.cdn.net/v/t51.29350-15/s640x640/photo.jpg?oh=x");
        let b = url_signature("https://scontent.cdn.net/v/t51.29350-15/s1080x1080/photo.jpg");
        assert_eq!(a, b);
    }

    #[test]
    fn signature_distinguishes_different_media() {
        let a = url_signature("https://cdn.net/v/412398_1_1_n.jpg");
        let b = url_signature("https://cdn.net/v/999999_1_1_n.jpg");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn byte_identical_content_merges_across_urls() {
        let fetcher = FixedFetcher::new()
            .with("https://cdn.net/a/412398_1_1_n.jpg", b"SAMEBYTES".to_vec())
            .with("https://cdn.net/b/777777_1_1_n.jpg", b"SAMEBYTES".to_vec());

        let candidates = vec![
            candidate("https://cdn.net/a/412398_1_1_n.jpg", "", 0),
            candidate("https://cdn.net/b/777777_1_1_n.jpg", "", 1),
        ];
        let groups = group_candidates(&candidates, Some(&fetcher)).await;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_urls.len(), 2);
    }

    #[tokio::test]
    async fn differing_content_never_merges() {
        let fetcher = FixedFetcher::new()
            .with("https://cdn.net/a/412398_1_1_n.jpg", b"AAAA".to_vec())
            .with("https://cdn.net/b/777777_1_1_n.jpg", b"BBBB".to_vec());

        let candidates = vec![
            candidate("https://cdn.net/a/412398_1_1_n.jpg", "", 0),
            candidate("https://cdn.net/b/777777_1_1_n.jpg", "", 1),
        ];
        let groups = group_candidates(&candidates, Some(&fetcher)).await;
        assert_eq!(groups.len(), 2);

        let hashes: HashSet<_> = groups.iter().map(|g| g.content_hash.clone()).collect();
        assert_eq!(hashes.len(), groups.len(), "groups must be disjoint");
    }

    #[tokio::test]
    async fn highest_scored_member_becomes_representative() {
        let candidates = vec![
            candidate(
                "https://cdn.net/v/s640x640/412398_1_1_n.jpg",
                "Photo on December 12, 2023.",
                0,
            ),
            candidate("https://cdn.net/v/s1440x1440/412398_2_2_n.jpg", "", 1),
        ];
        let groups = group_candidates(&candidates, None).await;
        assert_eq!(groups.len(), 1);
        assert!(groups[0].representative_url.contains("1440"));
        // date inherited from a dated member when the representative has none
        assert!(groups[0].date_key.is_some());
        assert_eq!(groups[0].first_seen, 0);
    }

    #[tokio::test]
    async fn failed_download_falls_back_to_signature() {
        let fetcher = FixedFetcher::new(); // knows no URLs, every fetch errors
        let candidates = vec![
            candidate("https://cdn.net/v/s640x640/412398_1_1_n.jpg", "", 0),
            candidate("https://cdn.net/v/s1080x1080/412398_2_2_n.jpg", "", 1),
        ];
        let groups = group_candidates(&candidates, Some(&fetcher)).await;
        assert_eq!(groups.len(), 1);
    }
}
