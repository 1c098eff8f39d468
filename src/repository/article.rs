//! Article store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult};
use crate::llm::sanitize::is_garbage;
use crate::models::{Article, ArticleStatus, EvidencePolicy};

/// Named operations over the article table. Idempotent at the call site
/// unless noted.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a new article. Fails with `Conflict` on a duplicate url_hash.
    async fn create(&self, article: &Article) -> StoreResult<()>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Article>>;

    async fn list_by_status(
        &self,
        status: ArticleStatus,
        limit: usize,
    ) -> StoreResult<Vec<Article>>;

    /// Articles created within the last `hours`, newest first.
    async fn list_recent(&self, hours: i64, limit: usize) -> StoreResult<Vec<Article>>;

    /// Articles with body text but no summary yet.
    async fn list_needing_enrichment(&self, limit: usize) -> StoreResult<Vec<Article>>;

    /// Articles whose evidence has expired: `evidence_expires_at < now` and
    /// policy is not `keep`.
    async fn list_expired_evidence(&self, now: DateTime<Utc>) -> StoreResult<Vec<Article>>;

    async fn update_status(&self, id: Uuid, status: ArticleStatus) -> StoreResult<()>;

    async fn set_pinned(&self, id: Uuid, pinned: bool) -> StoreResult<()>;

    /// Store the enrichment fields in one operation.
    async fn update_enrichment(
        &self,
        id: Uuid,
        summary: &str,
        tags: &[String],
        embedding: Option<&[f32]>,
    ) -> StoreResult<()>;

    /// Change the retention policy, recomputing the evidence expiry from the
    /// original creation time.
    async fn update_retention(&self, id: Uuid, policy: EvidencePolicy) -> StoreResult<()>;

    async fn set_image_url(&self, id: Uuid, image_url: &str) -> StoreResult<()>;

    /// Null out the evidence expiry after its bundle has been deleted.
    async fn clear_evidence_expiry(&self, id: Uuid) -> StoreResult<()>;

    /// Clear summaries that match a garbage phrase. Returns the affected
    /// ids so they can be re-enqueued for enrichment.
    async fn clear_garbage_enrichment(&self) -> StoreResult<Vec<Uuid>>;

    /// Articles created since UTC start-of-day.
    async fn count_today(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    async fn exists_by_url(&self, url_hash: &str) -> StoreResult<bool>;

    /// Case-insensitive substring search over title and body.
    async fn search(&self, query: &str, limit: usize) -> StoreResult<Vec<Article>>;

    /// Nearest articles by embedding cosine similarity.
    async fn similar_articles(&self, id: Uuid, limit: usize) -> StoreResult<Vec<Article>>;
}

/// In-memory article store.
#[derive(Default)]
pub struct MemoryArticleStore {
    rows: RwLock<HashMap<Uuid, Article>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: Uuid, mutate: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Article),
    {
        let mut rows = self.rows.write().await;
        let article = rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        mutate(article);
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn create(&self, article: &Article) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        if rows.values().any(|a| a.url_hash == article.url_hash) {
            return Err(StoreError::Conflict(format!(
                "url_hash {} already exists",
                article.url_hash
            )));
        }
        rows.insert(article.id, article.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Article>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list_by_status(
        &self,
        status: ArticleStatus,
        limit: usize,
    ) -> StoreResult<Vec<Article>> {
        let rows = self.rows.read().await;
        let mut out: Vec<Article> = rows.values().filter(|a| a.status == status).cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn list_recent(&self, hours: i64, limit: usize) -> StoreResult<Vec<Article>> {
        let cutoff = Utc::now() - Duration::hours(hours);
        let rows = self.rows.read().await;
        let mut out: Vec<Article> = rows
            .values()
            .filter(|a| a.created_at >= cutoff)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn list_needing_enrichment(&self, limit: usize) -> StoreResult<Vec<Article>> {
        let rows = self.rows.read().await;
        let mut out: Vec<Article> = rows
            .values()
            .filter(|a| !a.clean_text.is_empty() && a.summary.is_empty())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn list_expired_evidence(&self, now: DateTime<Utc>) -> StoreResult<Vec<Article>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|a| {
                a.evidence_policy != EvidencePolicy::Keep
                    && a.evidence_expires_at.is_some_and(|at| at < now)
            })
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: Uuid, status: ArticleStatus) -> StoreResult<()> {
        self.update(id, |a| a.status = status).await
    }

    async fn set_pinned(&self, id: Uuid, pinned: bool) -> StoreResult<()> {
        self.update(id, |a| a.pinned = pinned).await
    }

    async fn update_enrichment(
        &self,
        id: Uuid,
        summary: &str,
        tags: &[String],
        embedding: Option<&[f32]>,
    ) -> StoreResult<()> {
        self.update(id, |a| {
            a.summary = summary.to_string();
            a.tags = tags.to_vec();
            if let Some(vector) = embedding {
                a.embedding = Some(vector.to_vec());
            }
        })
        .await
    }

    async fn update_retention(&self, id: Uuid, policy: EvidencePolicy) -> StoreResult<()> {
        self.update(id, |a| {
            a.evidence_policy = policy;
            a.evidence_expires_at = policy.expires_at(a.created_at);
        })
        .await
    }

    async fn set_image_url(&self, id: Uuid, image_url: &str) -> StoreResult<()> {
        self.update(id, |a| {
            a.image_url = (!image_url.is_empty()).then(|| image_url.to_string());
        })
        .await
    }

    async fn clear_evidence_expiry(&self, id: Uuid) -> StoreResult<()> {
        self.update(id, |a| a.evidence_expires_at = None).await
    }

    async fn clear_garbage_enrichment(&self) -> StoreResult<Vec<Uuid>> {
        let mut rows = self.rows.write().await;
        let mut cleared = Vec::new();
        for article in rows.values_mut() {
            if !article.summary.is_empty() && is_garbage(&article.summary) {
                article.summary.clear();
                cleared.push(article.id);
            }
        }
        Ok(cleared)
    }

    async fn count_today(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let start_of_day = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|a| a.created_at >= start_of_day).count())
    }

    async fn exists_by_url(&self, url_hash: &str) -> StoreResult<bool> {
        let rows = self.rows.read().await;
        Ok(rows.values().any(|a| a.url_hash == url_hash))
    }

    async fn search(&self, query: &str, limit: usize) -> StoreResult<Vec<Article>> {
        let needle = query.to_lowercase();
        let rows = self.rows.read().await;
        let mut out: Vec<Article> = rows
            .values()
            .filter(|a| {
                a.title.to_lowercase().contains(&needle)
                    || a.clean_text.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn similar_articles(&self, id: Uuid, limit: usize) -> StoreResult<Vec<Article>> {
        let rows = self.rows.read().await;
        let anchor = rows.get(&id).ok_or(StoreError::NotFound)?;
        let Some(anchor_vec) = anchor.embedding.as_deref() else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(f32, Article)> = rows
            .values()
            .filter(|a| a.id != id)
            .filter_map(|a| {
                let vector = a.embedding.as_deref()?;
                Some((cosine_similarity(anchor_vec, vector), a.clone()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(limit).map(|(_, a)| a).collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
