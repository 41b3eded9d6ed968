//! Shared helpers: content hashing and URL cleanup.

use sha2::{Digest, Sha256};

/// SHA-256 over raw bytes, hex-encoded.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Strip volatile CDN query parameters that rotate between page loads and
/// would otherwise make the same image look like different URLs.
pub fn sanitize_url(url: &str) -> String {
    const VOLATILE_PARAMS: &[&str] = &[
        "ig_cache_key",
        "_nc_ht",
        "_nc_cat",
        "_nc_ohc",
        "_nc_oc",
        "_nc_gid",
        "_nc_sid",
        "oh",
        "oe",
        "ccb",
        "efg",
        "se",
    ];

    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };

    if parsed.query().is_none() {
        return url.to_string();
    }

    let clean_pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !VOLATILE_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if clean_pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(clean_pairs);
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_deterministic() {
        assert_eq!(content_hash(b"hello world"), content_hash(b"hello world"));
    }

    #[test]
    fn content_hash_different_inputs() {
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }

    #[test]
    fn sanitize_url_strips_volatile_params() {
        let url = "https://scontent.cdninstagram.com/v/t51.29350-15/img.jpg?stp=dst-jpg&_nc_ht=scontent&oh=abc&oe=123";
        let clean = sanitize_url(url);
        assert!(clean.contains("stp=dst-jpg"));
        assert!(!clean.contains("_nc_ht"));
        assert!(!clean.contains("oh="));
        assert!(!clean.contains("oe="));
    }

    #[test]
    fn sanitize_url_drops_query_when_all_volatile() {
        let url = "https://scontent.cdninstagram.com/img.jpg?oh=abc&oe=123";
        assert_eq!(
            sanitize_url(url),
            "https://scontent.cdninstagram.com/img.jpg"
        );
    }

    #[test]
    fn sanitize_url_passes_through_unparseable() {
        assert_eq!(sanitize_url("not a url"), "not a url");
    }
}
