//! Carousel detection by presence of navigation affordances.

use gramflow_common::PostType;
use regex::Regex;
use tracing::debug;

use crate::session::PageState;

/// Legacy pagination markers that survive in some page variants.
const PAGING_MARKERS: &[&str] = &[
    "coreSpriteRightPaginationArrow",
    "_6CZji",
    "data-testid=\"carousel-next\"",
];

/// Single vs carousel, from the current rendered page. At least one
/// next/previous control or paging indicator means carousel. Deterministic,
/// no side effects.
pub fn detect(page: &PageState) -> PostType {
    let control_re =
        Regex::new(r#"aria-label\s*=\s*["'][^"']*(?:Next|Previous|Go back)"#).expect("valid regex");

    let is_carousel = control_re.is_match(&page.html)
        || PAGING_MARKERS.iter().any(|m| page.html.contains(m));

    let post_type = if is_carousel {
        PostType::Carousel
    } else {
        PostType::Single
    };
    debug!(?post_type, "Post type detected");
    post_type
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> PageState {
        PageState {
            url: "https://www.instagram.com/p/TEST/".to_string(),
            html: html.to_string(),
        }
    }

    #[test]
    fn next_control_means_carousel() {
        let html = r#"<div><button aria-label="Next"><svg/></button></div>"#;
        assert_eq!(detect(&page(html)), PostType::Carousel);
    }

    #[test]
    fn legacy_pagination_class_means_carousel() {
        let html = r#"<div class="coreSpriteRightPaginationArrow"></div>"#;
        assert_eq!(detect(&page(html)), PostType::Carousel);
    }

    #[test]
    fn no_affordance_means_single() {
        let html = r#"<img src="https://scontent.cdn.net/v/t51.29350-15/a_1_1_n.jpg">"#;
        assert_eq!(detect(&page(html)), PostType::Single);
    }

    #[test]
    fn detection_is_deterministic() {
        let p = page(r#"<button aria-label="Next"></button>"#);
        assert_eq!(detect(&p), detect(&p));
    }
}
