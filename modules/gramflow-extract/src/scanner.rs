//! Candidate scanner — three independent extraction techniques over one
//! page snapshot, unioned and deduplicated by URL.
//!
//! Visibility is never a filter: carousel items are routinely pre-rendered
//! off-screen, so any image reference present in the DOM counts.

use std::collections::HashSet;

use gramflow_common::{CandidateImage, DiscoverySource};
use regex::Regex;

use crate::dategroup;
use crate::scoring;
use crate::session::PageState;

/// Path-segment token that marks post-content media on the CDN, as opposed
/// to avatars, thumbnails and UI sprites.
const CONTENT_MARKERS: &[&str] = &["t51.29350-15", "scontent", "fbcdn.net"];

/// URL tokens that mark non-content images regardless of host.
const EXCLUDE_TOKENS: &[&str] = &[
    "profile_pic",
    "avatar",
    "150x150",
    "44x44",
    "32x32",
    "stories",
    "highlight",
    "emoji",
    "icon",
];

/// Does this URL carry the content-image signature?
pub fn is_content_image(url: &str) -> bool {
    if !url.starts_with("http") {
        return false;
    }
    let lower = url.to_lowercase();
    if !lower.contains(".jpg") && !lower.contains(".webp") {
        return false;
    }
    if !CONTENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    !EXCLUDE_TOKENS.iter().any(|t| lower.contains(t))
}

/// Apply all three techniques against one page snapshot.
///
/// `discovery_index` values are local to this pass; the orchestrator
/// reassigns run-wide indexes when it merges the results.
pub fn scan(page: &PageState) -> Vec<CandidateImage> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<CandidateImage> = Vec::new();

    let mut push = |url: String,
                    alt: &str,
                    source: DiscoverySource,
                    out: &mut Vec<CandidateImage>| {
        if !is_content_image(&url) || !seen.insert(url.clone()) {
            return;
        }
        let idx = out.len();
        out.push(CandidateImage {
            quality_score: scoring::quality_score(&url),
            captured_date: dategroup::parse_date_key(alt),
            alt_text: alt.to_string(),
            discovery_source: source,
            discovery_index: idx,
            url,
        });
    };

    let img_tag_re = Regex::new(r"(?is)<img\b[^>]*>").expect("valid regex");
    let src_re = Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid regex");
    let alt_re = Regex::new(r#"(?i)\balt\s*=\s*["']([^"']*)["']"#).expect("valid regex");
    let srcset_re = Regex::new(r#"(?i)\bsrcset\s*=\s*["']([^"']+)["']"#).expect("valid regex");

    // Technique 1: rendered image elements.
    for tag in img_tag_re.find_iter(&page.html) {
        let tag = tag.as_str();
        let alt = alt_re
            .captures(tag)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        if let Some(cap) = src_re.captures(tag) {
            push(decode_entities(&cap[1]), &alt, DiscoverySource::RenderedDom, &mut out);
        }
    }

    // Technique 2: embedded structured-data blob. Image URL fields arrive
    // JSON-escaped; decode before filtering.
    let display_url_re =
        Regex::new(r#""display_url"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid regex");
    for cap in display_url_re.captures_iter(&page.html) {
        push(
            decode_json_escapes(&cap[1]),
            "",
            DiscoverySource::EmbeddedStructuredData,
            &mut out,
        );
    }

    // Technique 3: responsive candidate lists on any element.
    let any_tag_re = Regex::new(r"(?is)<[a-z][^>]*\bsrcset\b[^>]*>").expect("valid regex");
    for tag in any_tag_re.find_iter(&page.html) {
        let tag = tag.as_str();
        let alt = alt_re
            .captures(tag)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        if let Some(cap) = srcset_re.captures(tag) {
            for entry in cap[1].split(',') {
                // "url 1080w" — descriptor after whitespace is dropped
                if let Some(url) = entry.split_whitespace().next() {
                    push(
                        decode_entities(url),
                        &alt,
                        DiscoverySource::ResponsiveAttributeSet,
                        &mut out,
                    );
                }
            }
        }
    }

    out
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
}

fn decode_json_escapes(s: &str) -> String {
    s.replace("\\u0026", "&").replace("\\/", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_URL: &str =
        "https://scontent.cdninstagram.com/v/t51.29350-15/s1080x1080/412398_1234_5678_n.jpg";

    fn page(html: &str) -> PageState {
        PageState {
            url: "https://www.instagram.com/p/TEST/".to_string(),
            html: html.to_string(),
        }
    }

    #[test]
    fn content_signature_accepts_cdn_media() {
        assert!(is_content_image(CONTENT_URL));
    }

    #[test]
    fn content_signature_rejects_profile_and_thumbnails() {
        assert!(!is_content_image(
            "https://scontent.cdninstagram.com/v/t51.29350-15/profile_pic/me.jpg"
        ));
        assert!(!is_content_image(
            "https://scontent.cdninstagram.com/v/t51.29350-15/150x150/tiny.jpg"
        ));
        assert!(!is_content_image("https://example.com/photo.jpg"));
        assert!(!is_content_image(
            "https://scontent.cdninstagram.com/v/t51.29350-15/page.html"
        ));
    }

    #[test]
    fn scans_rendered_img_tags_with_alt() {
        let html = format!(
            r#"<img alt="Photo by A on December 12, 2023." src="{CONTENT_URL}"> <img src="https://cdn.example.com/icon.png">"#
        );
        let found = scan(&page(&html));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].discovery_source, DiscoverySource::RenderedDom);
        assert!(found[0].captured_date.is_some());
        assert!(found[0].alt_text.starts_with("Photo by A"));
    }

    #[test]
    fn scans_structured_data_with_escapes() {
        let html = r#"<script type="application/json">{"display_url":"https:\/\/scontent.cdninstagram.com\/v\/t51.29350-15\/img_9_9_9_n.jpg?se=7&7"}</script>"#;
        let found = scan(&page(html));
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].discovery_source,
            DiscoverySource::EmbeddedStructuredData
        );
        assert!(found[0].url.contains("?se=7&7"));
    }

    #[test]
    fn scans_srcset_candidate_lists() {
        let html = r#"<img alt="pic" srcset="https://scontent.cdninstagram.com/v/t51.29350-15/s640x640/a_1_1_n.jpg 640w, https://scontent.cdninstagram.com/v/t51.29350-15/s1080x1080/a_1_1_n.jpg 1080w">"#;
        let found = scan(&page(html));
        assert_eq!(found.len(), 2);
        assert!(found
            .iter()
            .all(|c| c.discovery_source == DiscoverySource::ResponsiveAttributeSet));
    }

    #[test]
    fn union_dedups_by_url() {
        let html = format!(
            r#"<img src="{CONTENT_URL}"> <img srcset="{CONTENT_URL} 1080w">"#
        );
        let found = scan(&page(&html));
        assert_eq!(found.len(), 1);
        // first technique to see the URL wins
        assert_eq!(found[0].discovery_source, DiscoverySource::RenderedDom);
    }

    #[test]
    fn offscreen_images_are_not_filtered() {
        let html = format!(r#"<img src="{CONTENT_URL}" style="display:none" aria-hidden="true">"#);
        assert_eq!(scan(&page(&html)).len(), 1);
    }
}
