//! Resolution scoring from URL size tokens.

use regex::Regex;

/// Score a URL by the largest pixel-dimension token embedded in it.
/// Monotonic in width; unrecognized patterns score 0. Tie-breaking only —
/// never used for identity.
pub fn quality_score(url: &str) -> u32 {
    let dim_re = Regex::new(r"(\d{3,4})x\d{3,4}").expect("valid regex");

    let best_width = dim_re
        .captures_iter(url)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    match best_width {
        0 => 0,
        w if w >= 1440 => 100,
        w if w >= 1080 => 80,
        w if w >= 720 => 60,
        w if w >= 480 => 40,
        _ => 20,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn larger_dimension_scores_higher() {
        let s1440 = quality_score("https://cdn/v/t51.29350-15/s1440x1440/a.jpg");
        let s1080 = quality_score("https://cdn/v/t51.29350-15/s1080x1080/a.jpg");
        let s640 = quality_score("https://cdn/v/t51.29350-15/s640x640/a.jpg");
        assert!(s1440 > s1080);
        assert!(s1080 > s640);
    }

    #[test]
    fn picks_largest_token_when_several_present() {
        let url = "https://cdn/v/s640x640/e35/p1080x1080/a.jpg";
        assert_eq!(quality_score(url), 80);
    }

    #[test]
    fn unrecognized_pattern_scores_zero() {
        assert_eq!(quality_score("https://cdn/v/t51.29350-15/a.jpg"), 0);
    }
}
