//! Daily brief: thematic summary over the last 24 hours of articles.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::llm::{prompts, LlmService};
use crate::models::{Article, Brief};
use crate::repository::{ArticleStore, BriefStore};

/// Articles considered per brief.
const ARTICLE_CAP: usize = 60;
/// Character budget for the enumerated article block.
const BLOCK_CHAR_CAP: usize = 12_000;
/// Snippet length when an article has no summary.
const SNIPPET_CHARS: usize = 400;
/// Tags kept in the tally.
const TOP_TAGS: usize = 10;

pub struct BriefService {
    articles: Arc<dyn ArticleStore>,
    briefs: Arc<dyn BriefStore>,
    llm: Arc<dyn LlmService>,
    /// Higher-capability model for the thematic summary.
    draft_model: String,
}

impl BriefService {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        briefs: Arc<dyn BriefStore>,
        llm: Arc<dyn LlmService>,
        draft_model: &str,
    ) -> Self {
        Self {
            articles,
            briefs,
            llm,
            draft_model: draft_model.to_string(),
        }
    }

    /// Generate and upsert today's brief.
    pub async fn run(&self) -> anyhow::Result<Brief> {
        let articles = self.articles.list_recent(24, ARTICLE_CAP).await?;

        let summary = if articles.is_empty() {
            fallback_summary(&articles)
        } else {
            let block = build_article_block(&articles);
            match self
                .llm
                .generate(Some(&self.draft_model), prompts::BRIEF_SYSTEM, &block)
                .await
            {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(error = %e, "brief generation failed, using fallback");
                    fallback_summary(&articles)
                }
            }
        };

        let now = Utc::now();
        let date = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);

        let brief = Brief {
            date,
            summary,
            top_tags: tally_tags(&articles, TOP_TAGS),
            article_count: articles.len(),
            generated_at: now,
        };
        self.briefs.upsert(&brief).await?;

        info!(
            articles = brief.article_count,
            tags = brief.top_tags.len(),
            "daily brief stored"
        );
        Ok(brief)
    }
}

/// Enumerated block `"<i>. [<source>] <title>: <summary-or-snippet>"`, cut
/// off at the character budget.
fn build_article_block(articles: &[Article]) -> String {
    let mut block = String::new();
    for (i, article) in articles.iter().enumerate() {
        let body = if article.summary.is_empty() {
            article.clean_text.chars().take(SNIPPET_CHARS).collect()
        } else {
            article.summary.clone()
        };
        let line = format!("{}. [{}] {}: {}\n", i + 1, article.source_name, article.title, body);
        if block.len() + line.len() > BLOCK_CHAR_CAP {
            break;
        }
        block.push_str(&line);
    }
    block
}

fn fallback_summary(articles: &[Article]) -> String {
    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    format!(
        "Daily brief: {} articles collected. Top stories: {}",
        articles.len(),
        titles.join("; ")
    )
}

/// Tag frequencies across the input set, most common first, ties broken
/// alphabetically.
fn tally_tags(articles: &[Article], keep: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for article in articles {
        for tag in &article.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    let mut tally: Vec<(&str, usize)> = counts.into_iter().collect();
    tally.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    tally.into_iter().take(keep).map(|(tag, _)| tag.to_string()).collect()
}
