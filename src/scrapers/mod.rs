//! Rate-limited page scraping with CSS-selector extraction.

pub mod http_client;
pub mod page;
pub mod rate_limiter;

pub use http_client::PageClient;
pub use page::{PageFetcher, PageScraper, ScrapedArticle};
pub use rate_limiter::DomainLimiter;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network-level failure or timeout.
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// Non-success status from the origin.
    #[error("HTTP {0}")]
    Status(u16),
}
