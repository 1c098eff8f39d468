//! Feed discovery: candidate articles from RSS/Atom feeds, XML sitemaps,
//! and HTML listing pages.

pub mod rss;
pub mod sitemap;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::models::{FeedType, Source};
use crate::scrapers::http_client::read_body_capped;
use crate::scrapers::PageFetcher;

/// Fetch timeout for feed and sitemap documents.
const FEED_TIMEOUT: Duration = Duration::from_secs(30);
/// Body cap for feed and sitemap documents.
const FEED_BODY_CAP: usize = 10 * 1024 * 1024;

const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml, text/xml";

/// A candidate article yielded by discovery, with whatever structured
/// metadata the source format carried.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredArticle {
    pub url: String,
    pub title: Option<String>,
    /// Cleaned description text; non-empty means the feed carried the body
    /// and the scraper can be skipped.
    pub description: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

impl DiscoveredArticle {
    pub fn url_only(url: String) -> Self {
        Self {
            url,
            ..Default::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    /// Network-level failure reaching the source.
    #[error("feed unreachable: {0}")]
    Unreachable(String),
    /// The document parsed as neither RSS nor Atom, or carried no items.
    #[error("feed malformed: {0}")]
    Malformed(String),
    /// A required source field is empty.
    #[error("source misconfigured: {0}")]
    ConfigMissing(String),
}

/// Discovery surface, object-safe so the orchestrator can run against a
/// stub in tests.
#[async_trait]
pub trait ArticleDiscoverer: Send + Sync {
    async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredArticle>, FeedError>;
}

/// HTTP-backed discoverer covering all three source kinds.
pub struct FeedDiscoverer {
    client: reqwest::Client,
    scraper: Arc<dyn PageFetcher>,
}

impl FeedDiscoverer {
    pub fn new(user_agent: &str, scraper: Arc<dyn PageFetcher>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(FEED_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self { client, scraper }
    }

    async fn fetch(&self, url: &str, accept: &str) -> Result<Vec<u8>, FeedError> {
        let response = self
            .client
            .get(url)
            .header("Accept", accept)
            .send()
            .await
            .map_err(|e| FeedError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Unreachable(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        read_body_capped(response, FEED_BODY_CAP)
            .await
            .map_err(|e| FeedError::Unreachable(e.to_string()))
    }

    async fn discover_rss(&self, source: &Source) -> Result<Vec<DiscoveredArticle>, FeedError> {
        if source.feed_url.is_empty() {
            return Err(FeedError::ConfigMissing(format!(
                "source {} has no feed_url",
                source.name
            )));
        }
        let body = self.fetch(&source.feed_url, FEED_ACCEPT).await?;
        let items = rss::parse_feed(&body)?;
        debug!(source = %source.name, items = items.len(), "rss discovery");
        Ok(items)
    }

    async fn discover_sitemap(&self, source: &Source) -> Result<Vec<DiscoveredArticle>, FeedError> {
        if source.sitemap_url.is_empty() {
            return Err(FeedError::ConfigMissing(format!(
                "source {} has no sitemap_url",
                source.name
            )));
        }
        let body = self.fetch(&source.sitemap_url, "application/xml, text/xml").await?;
        let urls = sitemap::parse_sitemap(&String::from_utf8_lossy(&body))?;
        debug!(source = %source.name, urls = urls.len(), "sitemap discovery");
        Ok(urls.into_iter().map(DiscoveredArticle::url_only).collect())
    }

    async fn discover_listing(&self, source: &Source) -> Result<Vec<DiscoveredArticle>, FeedError> {
        if source.list_urls.is_empty() || source.selectors.link.is_empty() {
            return Err(FeedError::ConfigMissing(format!(
                "source {} has no list_urls or link selector",
                source.name
            )));
        }
        let mut out = Vec::new();
        for list_url in &source.list_urls {
            let links = self
                .scraper
                .scrape_links(list_url, &source.selectors.link)
                .await
                .map_err(|e| FeedError::Unreachable(e.to_string()))?;
            out.extend(links.into_iter().map(DiscoveredArticle::url_only));
        }
        debug!(source = %source.name, urls = out.len(), "listing discovery");
        Ok(out)
    }
}

#[async_trait]
impl ArticleDiscoverer for FeedDiscoverer {
    async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredArticle>, FeedError> {
        match source.feed_type {
            FeedType::Rss => self.discover_rss(source).await,
            FeedType::Sitemap => self.discover_sitemap(source).await,
            FeedType::Scrape => self.discover_listing(source).await,
        }
    }
}
