//! URL canonicalization and content hashing.
//!
//! Canonical URLs are the identity of an article: two fetches of the same
//! story through different tracking links must hash identically.

use sha2::{Digest, Sha256};
use url::Url;

/// Query parameters stripped during canonicalization, matched
/// case-insensitively.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "fbclid",
    "gclid",
    "gclsrc",
    "dclid",
    "msclkid",
    "twclid",
    "mc_cid",
    "mc_eid",
    "ref",
    "_ga",
    "_gl",
];

/// Canonicalize a URL for deduplication.
///
/// Lowercases scheme and host, strips the fragment and known tracking
/// parameters, sorts the remaining query parameters by key, and removes a
/// trailing slash on non-root paths. A URL that does not parse is returned
/// unchanged.
pub fn canonicalize_url(raw: &str) -> String {
    let mut url = match Url::parse(raw.trim()) {
        Ok(u) => u,
        Err(_) => return raw.to_string(),
    };
    if url.cannot_be_a_base() {
        return raw.to_string();
    }

    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .filter(|(k, _)| !is_tracking_param(k))
        .collect();

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        let query = serializer.finish();
        url.set_query(Some(&query));
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

fn is_tracking_param(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    TRACKING_PARAMS.contains(&lower.as_str())
}

/// SHA-256 of the canonical form of a URL, lowercase hex.
pub fn hash_url(raw: &str) -> String {
    sha256_hex(canonicalize_url(raw).as_bytes())
}

/// SHA-256 of arbitrary text content, lowercase hex.
pub fn hash_content(text: &str) -> String {
    sha256_hex(text.as_bytes())
}

/// SHA-256 of raw bytes, lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Extract the host from a URL, if it parses.
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}

/// Resolve a possibly-relative href against a base URL.
pub fn resolve_href(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_strips_tracking_and_fragment() {
        let url = "https://EXAMPLE.com/Story/?utm_source=x&id=7&utm_medium=y#frag";
        assert_eq!(canonicalize_url(url), "https://example.com/Story?id=7");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let inputs = [
            "https://EXAMPLE.com/Story/?utm_source=x&id=7&utm_medium=y#frag",
            "https://news.site/a?fbclid=1",
            "http://host.tld/path/sub/?b=2&a=1",
            "https://example.com/",
            "not a url at all",
        ];
        for input in inputs {
            let once = canonicalize_url(input);
            assert_eq!(canonicalize_url(&once), once, "input: {}", input);
        }
    }

    #[test]
    fn canonicalize_removes_all_tracking_params() {
        let url = "https://a.com/x?gclid=1&FBCLID=2&mc_cid=3&_ga=4&ref=home&q=keep";
        let canonical = canonicalize_url(url);
        for param in super::TRACKING_PARAMS {
            assert!(!canonical.contains(param), "{} survived: {}", param, canonical);
        }
        assert!(canonical.contains("q=keep"));
    }

    #[test]
    fn canonicalize_sorts_query_params() {
        assert_eq!(
            canonicalize_url("https://a.com/x?z=1&a=2&m=3"),
            "https://a.com/x?a=2&m=3&z=1"
        );
    }

    #[test]
    fn canonicalize_keeps_root_slash() {
        assert_eq!(canonicalize_url("https://a.com/"), "https://a.com/");
    }

    #[test]
    fn canonicalize_returns_invalid_input_unchanged() {
        assert_eq!(canonicalize_url("::nope::"), "::nope::");
    }

    #[test]
    fn hash_is_stable_across_equivalent_urls() {
        let base = hash_url("https://news.site/a");
        assert_eq!(hash_url("https://news.site/a?fbclid=1"), base);
        assert_eq!(hash_url("https://news.site/a/"), base);
        assert_eq!(hash_url("https://news.site/a#section"), base);
        assert_eq!(hash_url("https://NEWS.site/a"), base);
        assert_ne!(hash_url("https://news.site/b"), base);
    }

    #[test]
    fn hash_content_is_hex_sha256() {
        let h = hash_content("hello");
        assert_eq!(h.len(), 64);
        assert_eq!(
            h,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn resolve_relative_href() {
        assert_eq!(
            resolve_href("https://a.com/news/index.html", "/story/1").as_deref(),
            Some("https://a.com/story/1")
        );
        assert_eq!(
            resolve_href("https://a.com/news/", "story/2").as_deref(),
            Some("https://a.com/news/story/2")
        );
    }
}
