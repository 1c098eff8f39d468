//! Ingestion orchestrator: one run drains the active sources into the
//! article store under the daily budget.
//!
//! Per-article state machine:
//!
//! ```text
//! discovered → deduped → scraped-or-skipped → fingerprinted → committed → enqueued
//!                    ↘ blocked/duplicate  (terminal)
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::enrich::EnrichmentPool;
use crate::config::AppConfig;
use crate::feeds::{ArticleDiscoverer, DiscoveredArticle, FeedError};
use crate::models::{Article, EvidencePolicy, Fingerprint, Source};
use crate::repository::{ArticleStore, FingerprintStore, SourceStore};
use crate::scrapers::PageFetcher;
use crate::utils::html::extract_meta_image;
use crate::utils::urls::{hash_content, hash_url};
use crate::utils::Deadline;

/// Wall-clock bound for one ingestion run.
const INGEST_DEADLINE: Duration = Duration::from_secs(60 * 60);

/// Regulatory boilerplate and procedural notices that are never worth an
/// article. Matched as lowercase substrings of the title. Deployment
/// defaults; a new region supplies its own list.
pub const NOISE_TITLE_PATTERNS: &[&str] = &[
    "paperwork reduction act",
    "sunshine act meeting",
    "60-day notice",
    "30-day notice",
    "notice of proposed rulemaking",
    "administrative declaration of a disaster",
    "agency information collection",
    "self-regulatory organizations",
    "notice of lodging",
    "privacy act of 1974",
    "aviso de subasta",
];

/// True when a title matches the noise filter.
pub fn is_noise_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    NOISE_TITLE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Totals from one ingestion run.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub sources: usize,
    pub discovered: usize,
    pub ingested: usize,
    pub skipped: usize,
}

pub struct IngestService {
    config: AppConfig,
    sources: Arc<dyn SourceStore>,
    articles: Arc<dyn ArticleStore>,
    fingerprints: Arc<dyn FingerprintStore>,
    discoverer: Arc<dyn ArticleDiscoverer>,
    scraper: Arc<dyn PageFetcher>,
    pool: EnrichmentPool,
}

impl IngestService {
    pub fn new(
        config: AppConfig,
        sources: Arc<dyn SourceStore>,
        articles: Arc<dyn ArticleStore>,
        fingerprints: Arc<dyn FingerprintStore>,
        discoverer: Arc<dyn ArticleDiscoverer>,
        scraper: Arc<dyn PageFetcher>,
        pool: EnrichmentPool,
    ) -> Self {
        Self {
            config,
            sources,
            articles,
            fingerprints,
            discoverer,
            scraper,
            pool,
        }
    }

    pub async fn run(&self) -> anyhow::Result<IngestStats> {
        self.run_with_deadline(Deadline::after(INGEST_DEADLINE)).await
    }

    pub async fn run_with_deadline(&self, deadline: Deadline) -> anyhow::Result<IngestStats> {
        let started = std::time::Instant::now();
        let mut stats = IngestStats::default();

        // A failed count falls back to zero rather than killing the run;
        // the store-level uniqueness still holds the line on duplicates.
        let today = match self.articles.count_today(Utc::now()).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "count_today failed, assuming zero");
                0
            }
        };
        let remaining = self.config.daily_article_budget.saturating_sub(today);
        if remaining == 0 {
            info!(today, "daily article budget exhausted, skipping run");
            return Ok(stats);
        }

        let sources = self.sources.list_active().await?;
        stats.sources = sources.len();

        let mut enrichment_handles = Vec::new();

        'sources: for source in &sources {
            if deadline.expired() {
                info!("ingestion deadline reached");
                break;
            }

            let candidates = match self.discoverer.discover(source).await {
                Ok(candidates) => candidates,
                Err(FeedError::ConfigMissing(msg)) => {
                    error!(source = %source.name, %msg, "source misconfigured, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(source = %source.name, error = %e, "discovery failed, skipping source");
                    continue;
                }
            };
            stats.discovered += candidates.len();

            for candidate in candidates {
                if deadline.expired() {
                    info!("ingestion deadline reached");
                    break 'sources;
                }

                match self.process_candidate(source, candidate).await {
                    Some((article, raw_html)) => {
                        stats.ingested += 1;
                        if stats.ingested == remaining {
                            info!(remaining, "daily budget reached, stopping run");
                            break 'sources;
                        }
                        enrichment_handles.push(self.pool.spawn(article, raw_html));
                    }
                    None => stats.skipped += 1,
                }
            }
        }

        for handle in enrichment_handles {
            let _ = handle.await;
        }

        info!(
            sources = stats.sources,
            discovered = stats.discovered,
            ingested = stats.ingested,
            skipped = stats.skipped,
            duration_secs = started.elapsed().as_secs(),
            "ingestion run complete"
        );
        Ok(stats)
    }

    /// Drive one candidate through dedup, extraction, the noise filter,
    /// fingerprinting, and commit. Returns the committed article and its
    /// captured HTML, ready for enrichment.
    async fn process_candidate(
        &self,
        source: &Source,
        candidate: DiscoveredArticle,
    ) -> Option<(Article, String)> {
        let url = candidate.url.clone();
        let url_hash = hash_url(&url);

        match self.fingerprints.exists_or_blocked(&url_hash).await {
            Ok((false, false)) => {}
            Ok(_) => {
                debug!(%url, "already fingerprinted or blocked");
                return None;
            }
            Err(e) => {
                warn!(%url, error = %e, "fingerprint lookup failed");
                return None;
            }
        }

        // Feed items that carry a body are used directly; everything else
        // goes through the scraper.
        let (title, clean_text, published_at, image_url, raw_html) =
            if let Some(description) = candidate.description.clone().filter(|d| !d.is_empty()) {
                let image = match candidate.image_url.clone() {
                    Some(image) if !image.is_empty() => Some(image),
                    _ => {
                        let probed = self.scraper.extract_image_url(&url).await;
                        (!probed.is_empty()).then_some(probed)
                    }
                };
                (
                    candidate.title.clone().unwrap_or_default(),
                    description,
                    candidate.published,
                    image,
                    String::new(),
                )
            } else {
                let scraped = match self.scraper.scrape_article(&url, &source.selectors).await {
                    Ok(scraped) => scraped,
                    Err(e) => {
                        warn!(%url, error = %e, "scrape failed");
                        return None;
                    }
                };
                if scraped.title.is_empty() && scraped.clean_text.is_empty() {
                    debug!(%url, "scrape produced no content");
                    return None;
                }
                let image = extract_meta_image(&scraped.raw_html)
                    .or_else(|| candidate.image_url.clone())
                    .filter(|i| !i.is_empty());
                let published = scraped.published_at.or(candidate.published);
                (
                    scraped.title,
                    scraped.clean_text,
                    published,
                    image,
                    scraped.raw_html,
                )
            };

        // Procedural noise is dropped before fingerprinting so a retitled
        // repost can still be admitted later.
        if is_noise_title(&title) {
            debug!(%url, %title, "noise title filtered");
            return None;
        }

        let fingerprint = Fingerprint::new(&url_hash, Some(hash_content(&clean_text)));
        if let Err(e) = self.fingerprints.create(&fingerprint).await {
            warn!(%url, error = %e, "fingerprint create failed");
            return None;
        }

        let article = Article::new(
            &url,
            title,
            clean_text,
            source.name.clone(),
            source.region.clone(),
            EvidencePolicy::Ret3m,
        )
        .with_published_at(published_at)
        .with_image_url(image_url);

        if let Err(e) = self.articles.create(&article).await {
            warn!(%url, error = %e, "article commit failed");
            return None;
        }

        Some((article, raw_html))
    }
}
