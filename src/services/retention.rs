//! Evidence retention sweep.
//!
//! Deletes evidence bundles whose retention window has passed and clears
//! the expiry timestamp so the article stops appearing in the expired
//! listing. Articles themselves are never deleted here.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::evidence::EvidenceStore;
use crate::repository::ArticleStore;

pub struct RetentionService {
    articles: Arc<dyn ArticleStore>,
    evidence: Arc<EvidenceStore>,
}

impl RetentionService {
    pub fn new(articles: Arc<dyn ArticleStore>, evidence: Arc<EvidenceStore>) -> Self {
        Self { articles, evidence }
    }

    /// Sweep all expired bundles. Per-item failures are logged and skipped;
    /// the expiry is only cleared after a successful delete.
    pub async fn run(&self) -> anyhow::Result<usize> {
        let expired = self.articles.list_expired_evidence(Utc::now()).await?;
        let mut swept = 0;

        for article in expired {
            if let Err(e) = self.evidence.delete_evidence(article.id).await {
                error!(article = %article.id, error = %e, "evidence delete failed");
                continue;
            }
            if let Err(e) = self.articles.clear_evidence_expiry(article.id).await {
                error!(article = %article.id, error = %e, "failed to clear evidence expiry");
                continue;
            }
            swept += 1;
        }

        info!(swept, "retention sweep complete");
        Ok(swept)
    }
}
