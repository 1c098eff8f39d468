//! Watchlist organizations and their discovered mentions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_active() -> bool {
    true
}

/// An organization whose media presence is monitored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistOrg {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    /// Org name plus AI-suggested topical terms.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Video-platform channel ids to poll.
    #[serde(default)]
    pub video_channels: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl WatchlistOrg {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            website: None,
            keywords: Vec::new(),
            video_channels: Vec::new(),
            active: true,
        }
    }
}

/// Which scanner agent produced a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HitSource {
    GoogleNewsRss,
    BingNewsRss,
    DdgLite,
    LocalCorpus,
    VideoPlatformRss,
    SubredditRss,
}

impl HitSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            HitSource::GoogleNewsRss => "google-news-rss",
            HitSource::BingNewsRss => "bing-news-rss",
            HitSource::DdgLite => "ddg-lite",
            HitSource::LocalCorpus => "local-corpus",
            HitSource::VideoPlatformRss => "video-platform-rss",
            HitSource::SubredditRss => "subreddit-rss",
        }
    }
}

/// Sentiment classification of a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Unknown,
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Unknown => "unknown",
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Parse a strict single-word classifier answer. Anything else is None.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_matches(|c: char| !c.is_alphanumeric()) {
            s if s.eq_ignore_ascii_case("positive") => Some(Sentiment::Positive),
            s if s.eq_ignore_ascii_case("neutral") => Some(Sentiment::Neutral),
            s if s.eq_ignore_ascii_case("negative") => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

/// Maximum stored snippet length, in characters.
pub const SNIPPET_MAX_CHARS: usize = 500;

/// A single discovered item referencing a watched organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistHit {
    pub id: Uuid,
    pub org_id: Uuid,
    pub source_type: HitSource,
    pub title: String,
    pub url: String,
    /// SHA-256 of the canonical URL; mentions are unique by this.
    pub url_hash: String,
    pub snippet: String,
    pub sentiment: Sentiment,
    pub ai_draft: Option<String>,
    #[serde(default)]
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl WatchlistHit {
    pub fn new(
        org_id: Uuid,
        source_type: HitSource,
        title: String,
        url: &str,
        snippet: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            source_type,
            title,
            url: url.to_string(),
            url_hash: crate::utils::urls::hash_url(url),
            snippet: truncate_chars(snippet, SNIPPET_MAX_CHARS),
            sentiment: Sentiment::Unknown,
            ai_draft: None,
            seen: false,
            created_at: Utc::now(),
        }
    }
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_parse_is_strict() {
        assert_eq!(Sentiment::parse("negative"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::parse(" Positive."), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse("NEUTRAL"), Some(Sentiment::Neutral));
        assert_eq!(Sentiment::parse("mostly positive"), None);
        assert_eq!(Sentiment::parse("unknown"), None);
        assert_eq!(Sentiment::parse(""), None);
    }

    #[test]
    fn snippet_truncates_to_500_chars() {
        let org = WatchlistOrg::new("Fundación Ejemplo");
        let long = "ñ".repeat(600);
        let hit = WatchlistHit::new(org.id, HitSource::DdgLite, "t".into(), "https://a.com/x", &long);
        assert_eq!(hit.snippet.chars().count(), 500);
        assert_eq!(hit.sentiment, Sentiment::Unknown);
    }

    #[test]
    fn hits_share_hash_across_tracking_variants() {
        let org = Uuid::new_v4();
        let a = WatchlistHit::new(org, HitSource::DdgLite, "t".into(), "https://a.com/x", "s");
        let b = WatchlistHit::new(
            org,
            HitSource::BingNewsRss,
            "t".into(),
            "https://a.com/x?utm_source=feed",
            "s",
        );
        assert_eq!(a.url_hash, b.url_hash);
    }
}
