//! AI keyword bootstrap for watchlist orgs.
//!
//! Builds a context block from the org's website (or a web search when no
//! website is configured) and asks the instruct model for monitoring
//! keywords.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::debug;

use super::agents::parse_ddg_lite;
use crate::llm::{prompts, LlmService};
use crate::scrapers::http_client::read_body_capped;
use crate::models::WatchlistOrg;
use crate::utils::html::clean_text;

/// Fetch timeout for the website and search lookups.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Body cap for page fetches.
const PAGE_BODY_CAP: usize = 256 * 1024;
/// Page text beyond this is dropped from the context block.
const CONTEXT_PAGE_CHARS: usize = 3000;
/// Minimum usable context.
const CONTEXT_MIN_CHARS: usize = 50;
/// Extracted text below this does not count as a usable search result.
const RESULT_MIN_BYTES: usize = 200;
/// Hard cap on stored keywords.
const MAX_KEYWORDS: usize = 10;
const KEYWORD_MIN_CHARS: usize = 2;
const KEYWORD_MAX_CHARS: usize = 50;

/// Generic tokens that make useless monitoring keywords.
const KEYWORD_STOPWORDS: &[&str] = &[
    "inc",
    "corp",
    "llc",
    "organizacion",
    "organización",
    "organization",
    "fundacion",
    "fundación",
    "foundation",
    "ong",
    "nonprofit",
    "sin fines de lucro",
    "comunidad",
    "community",
    "servicios",
    "services",
    "programa",
    "noticias",
    "news",
];

pub struct KeywordEnricher {
    llm: Arc<dyn LlmService>,
    client: reqwest::Client,
}

impl KeywordEnricher {
    pub fn new(llm: Arc<dyn LlmService>, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self { llm, client }
    }

    /// Produce the merged keyword list for an org: AI-suggested first, then
    /// the org's existing user-supplied keywords, deduplicated
    /// case-insensitively.
    pub async fn enrich_keywords(&self, org: &WatchlistOrg) -> anyhow::Result<Vec<String>> {
        let (page_text, search_block) = self.gather_context(org).await;

        let page_excerpt: String = page_text.chars().take(CONTEXT_PAGE_CHARS).collect();
        let context = format!(
            "Organizacion: {}\n\n{}\n\nResultados de busqueda:\n{}",
            org.name, page_excerpt, search_block
        );
        if context.chars().count() < CONTEXT_MIN_CHARS {
            anyhow::bail!("insufficient context to derive keywords for {}", org.name);
        }

        let raw = self
            .llm
            .generate(None, prompts::KEYWORDS_SYSTEM, &context)
            .await
            .context("keyword generation failed")?;

        let suggested = parse_keywords(&raw, &org.name);
        Ok(merge_keywords(suggested, &org.keywords))
    }

    /// Website text when configured, otherwise the first search result with
    /// enough extracted text. The search-result listing rides along as
    /// extra context either way.
    async fn gather_context(&self, org: &WatchlistOrg) -> (String, String) {
        let mut page_text = String::new();

        if let Some(website) = org.website.as_deref().filter(|w| !w.is_empty()) {
            page_text = self.fetch_text(website).await;
        }

        let results = self.search_results(&org.name).await;
        let search_block = results
            .iter()
            .map(|hit| format!("- {}: {}", hit.title, hit.snippet))
            .collect::<Vec<_>>()
            .join("\n");

        if page_text.is_empty() {
            for hit in &results {
                let text = self.fetch_text(&hit.url).await;
                if text.len() > RESULT_MIN_BYTES {
                    page_text = text;
                    break;
                }
            }
        }

        (page_text, search_block)
    }

    async fn search_results(&self, query: &str) -> Vec<super::agents::RawHit> {
        let url = format!(
            "https://lite.duckduckgo.com/lite/?q={}",
            urlencoding::encode(query)
        );
        match self.fetch_body(&url).await {
            Ok(body) => parse_ddg_lite(&String::from_utf8_lossy(&body)),
            Err(e) => {
                debug!(%query, error = %e, "keyword search failed");
                Vec::new()
            }
        }
    }

    async fn fetch_text(&self, url: &str) -> String {
        match self.fetch_body(url).await {
            Ok(body) => clean_text(&String::from_utf8_lossy(&body)),
            Err(e) => {
                debug!(%url, error = %e, "page fetch failed");
                String::new()
            }
        }
    }

    async fn fetch_body(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {} from {url}", response.status());
        }
        Ok(read_body_capped(response, PAGE_BODY_CAP).await?)
    }
}

/// Parse the model's keyword lines into the final suggestion list: the
/// exact org name always leads, generic stopwords are dropped, lengths are
/// bounded, at most ten total.
pub fn parse_keywords(raw: &str, org_name: &str) -> Vec<String> {
    let mut keywords = vec![org_name.to_string()];

    for line in raw.lines().flat_map(|l| l.split(',')) {
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
        let token = line
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '-' || c == '*')
            .trim();
        let chars = token.chars().count();
        if !(KEYWORD_MIN_CHARS..=KEYWORD_MAX_CHARS).contains(&chars) {
            continue;
        }
        let lower = token.to_lowercase();
        if KEYWORD_STOPWORDS.contains(&lower.as_str()) {
            continue;
        }
        if keywords.iter().any(|k| k.to_lowercase() == lower) {
            continue;
        }
        keywords.push(token.to_string());
    }

    keywords
}

/// AI-suggested keywords first, then user-supplied ones, case-insensitive
/// dedup.
pub fn merge_keywords(suggested: Vec<String>, existing: &[String]) -> Vec<String> {
    let mut merged = suggested;
    for keyword in existing {
        let lower = keyword.to_lowercase();
        if !merged.iter().any(|k| k.to_lowercase() == lower) {
            merged.push(keyword.clone());
        }
    }
    merged
}
