//! Configured upstream sources. Read-only from the pipeline's viewpoint.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a source's candidate articles are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Rss,
    Sitemap,
    Scrape,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Rss => "rss",
            FeedType::Sitemap => "sitemap",
            FeedType::Scrape => "scrape",
        }
    }
}

/// CSS selectors for scrape-type sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selectors {
    /// Anchor selector applied to listing pages.
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub date: String,
}

fn default_active() -> bool {
    true
}

/// A configured upstream news source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub feed_type: FeedType,
    /// RSS/Atom feed URL (rss sources).
    #[serde(default)]
    pub feed_url: String,
    /// Sitemap URL (sitemap sources).
    #[serde(default)]
    pub sitemap_url: String,
    /// Listing page URLs (scrape sources).
    #[serde(default)]
    pub list_urls: Vec<String>,
    #[serde(default)]
    pub selectors: Selectors,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub region: String,
}

impl Source {
    /// Minimal RSS source; used by tests and seed data.
    pub fn rss(name: &str, feed_url: &str, region: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            feed_type: FeedType::Rss,
            feed_url: feed_url.to_string(),
            sitemap_url: String::new(),
            list_urls: Vec::new(),
            selectors: Selectors::default(),
            active: true,
            region: region.to_string(),
        }
    }
}
