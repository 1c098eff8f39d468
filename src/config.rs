//! Configuration for MediaWatch.
//!
//! Operational knobs (daily budget, enrichment concurrency, per-domain rate)
//! are configuration values with spec'd defaults so deployments can tune
//! them without recompiling. Everything deserializes from TOML with
//! per-field defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::llm::LlmConfig;

fn default_region() -> String {
    "Puerto Rico".to_string()
}
fn default_daily_article_budget() -> usize {
    500
}
fn default_enrich_concurrency() -> usize {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; MediaWatch/1.0)".to_string()
}
fn default_per_domain_delay_ms() -> u64 {
    1000
}
fn default_per_domain_parallelism() -> usize {
    2
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_ingest_interval_hours() -> u64 {
    6
}
fn default_watchlist_interval_hours() -> u64 {
    24
}
fn default_brief_interval_hours() -> u64 {
    24
}

/// Page scraper fetch policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub user_agent: String,
    /// Minimum spacing between requests to one domain.
    pub per_domain_delay_ms: u64,
    /// Max in-flight requests to one domain.
    pub per_domain_parallelism: usize,
    /// Random jitter applied around the per-domain delay.
    pub jitter_ms: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            per_domain_delay_ms: default_per_domain_delay_ms(),
            per_domain_parallelism: default_per_domain_parallelism(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

/// Object-storage connection for the evidence store. Absent endpoint or
/// bucket means evidence preservation is disabled (no-op mode).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    /// S3-compatible endpoint, e.g. `http://minio.local:9000`.
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

impl EvidenceConfig {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.bucket.is_empty()
    }
}

/// Scheduler intervals for the periodic jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub ingest_interval_hours: u64,
    pub watchlist_interval_hours: u64,
    pub brief_interval_hours: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            ingest_interval_hours: default_ingest_interval_hours(),
            watchlist_interval_hours: default_watchlist_interval_hours(),
            brief_interval_hours: default_brief_interval_hours(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Region tag appended to watchlist queries and stamped on articles.
    pub region: String,
    /// Max new articles per UTC day.
    pub daily_article_budget: usize,
    /// Bounded width of the enrichment worker pool.
    pub enrich_concurrency: usize,
    pub scrape: ScrapeConfig,
    pub llm: LlmConfig,
    pub evidence: EvidenceConfig,
    pub schedule: ScheduleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            daily_article_budget: default_daily_article_budget(),
            enrich_concurrency: default_enrich_concurrency(),
            scrape: ScrapeConfig::default(),
            llm: LlmConfig::default(),
            evidence: EvidenceConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file is absent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_operational_contract() {
        let config = AppConfig::default();
        assert_eq!(config.daily_article_budget, 500);
        assert_eq!(config.enrich_concurrency, 3);
        assert_eq!(config.scrape.per_domain_delay_ms, 1000);
        assert_eq!(config.scrape.per_domain_parallelism, 2);
        assert_eq!(config.scrape.jitter_ms, 500);
        assert!(!config.evidence.is_configured());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: AppConfig = toml::from_str(
            r#"
            daily_article_budget = 50

            [scrape]
            per_domain_delay_ms = 2000
            "#,
        )
        .unwrap();
        assert_eq!(config.daily_article_budget, 50);
        assert_eq!(config.scrape.per_domain_delay_ms, 2000);
        assert_eq!(config.enrich_concurrency, 3);
        assert_eq!(config.region, "Puerto Rico");
    }

    #[test]
    fn evidence_configured_requires_endpoint_and_bucket() {
        let mut evidence = EvidenceConfig::default();
        assert!(!evidence.is_configured());
        evidence.endpoint = "http://minio:9000".into();
        assert!(!evidence.is_configured());
        evidence.bucket = "evidence".into();
        assert!(evidence.is_configured());
    }
}
