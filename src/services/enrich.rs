//! Enrichment worker pool.
//!
//! Bounded-concurrency AI calls per article: summary, tags, entities,
//! embedding. Each call fails independently; whatever succeeded is
//! persisted in one store operation, and the evidence bundle is uploaded
//! when object storage is configured.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::evidence::EvidenceStore;
use crate::llm::client::truncate_for_model;
use crate::llm::LlmService;
use crate::models::Article;
use crate::repository::ArticleStore;

/// Input truncation for every AI call.
pub const AI_INPUT_MAX_CHARS: usize = 8000;

/// Re-enrichment batch bound.
const REENRICH_BATCH: usize = 500;

/// Bounded pool of enrichment tasks. Cloning shares the semaphore, so every
/// clone counts against the same width.
#[derive(Clone)]
pub struct EnrichmentPool {
    articles: Arc<dyn ArticleStore>,
    llm: Arc<dyn LlmService>,
    evidence: Arc<EvidenceStore>,
    slots: Arc<Semaphore>,
}

impl EnrichmentPool {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        llm: Arc<dyn LlmService>,
        evidence: Arc<EvidenceStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            articles,
            llm,
            evidence,
            slots: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Queue one article for enrichment. The task waits for a pool slot
    /// before any AI call is made.
    pub fn spawn(&self, article: Article, raw_html: String) -> JoinHandle<()> {
        let pool = self.clone();
        tokio::spawn(async move {
            let _slot = pool
                .slots
                .clone()
                .acquire_owned()
                .await
                .expect("enrichment pool closed");
            pool.enrich(article, raw_html).await;
        })
    }

    async fn enrich(&self, article: Article, raw_html: String) {
        let text = truncate_for_model(&article.clean_text, AI_INPUT_MAX_CHARS);

        // The four calls are independent: one failing model output must not
        // cost the article the others.
        let summary = match self.llm.summarize(text).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(article = %article.id, error = %e, "summarize failed");
                String::new()
            }
        };
        let tags = match self.llm.classify(text).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(article = %article.id, error = %e, "classify failed");
                Vec::new()
            }
        };
        let entities = match self.llm.extract_entities(text).await {
            Ok(entities) => entities,
            Err(e) => {
                warn!(article = %article.id, error = %e, "entity extraction failed");
                Vec::new()
            }
        };
        let embedding = match self.llm.embed(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(article = %article.id, error = %e, "embedding failed");
                None
            }
        };

        if let Err(e) = self
            .articles
            .update_enrichment(article.id, &summary, &tags, embedding.as_deref())
            .await
        {
            error!(article = %article.id, error = %e, "failed to persist enrichment");
        }

        if self.evidence.is_configured() && !raw_html.is_empty() {
            let extracted = serde_json::json!({
                "title": article.title,
                "text": article.clean_text,
                "tags": tags,
                "entities": entities,
                "summary": summary,
            });
            match serde_json::to_vec_pretty(&extracted) {
                Ok(extracted_bytes) => {
                    if let Err(e) = self
                        .evidence
                        .store_evidence(
                            article.id,
                            article.evidence_policy,
                            raw_html.as_bytes(),
                            &extracted_bytes,
                            None,
                        )
                        .await
                    {
                        error!(article = %article.id, error = %e, "evidence upload failed");
                    }
                }
                Err(e) => error!(article = %article.id, error = %e, "extracted JSON encoding failed"),
            }
        }

        debug!(article = %article.id, "enrichment task finished");
    }

    /// Admin re-enrichment: clear garbage summaries, then re-run enrichment
    /// over articles with body text and no summary. Raw HTML is recovered
    /// from the evidence store when a bundle exists.
    pub async fn reenrich_garbage(&self) -> anyhow::Result<usize> {
        let cleared = self.articles.clear_garbage_enrichment().await?;
        info!(cleared = cleared.len(), "cleared garbage summaries");

        let candidates = self.articles.list_needing_enrichment(REENRICH_BATCH).await?;
        let count = candidates.len();

        let mut handles = Vec::with_capacity(count);
        for article in candidates {
            let raw_html = match self.evidence.get_evidence(article.id).await {
                Ok(bundle) => String::from_utf8_lossy(&bundle.raw).into_owned(),
                Err(_) => String::new(),
            };
            handles.push(self.spawn(article, raw_html));
        }
        for handle in handles {
            let _ = handle.await;
        }

        info!(reenriched = count, "re-enrichment pass complete");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::MemoryObjectStore;
    use crate::llm::LlmError;
    use crate::models::EvidencePolicy;
    use crate::repository::MemoryArticleStore;
    use async_trait::async_trait;

    /// Stub LLM whose summarize output is a refusal and whose classify
    /// output needs validation.
    struct StubLlm {
        summary: &'static str,
        tags: &'static str,
    }

    #[async_trait]
    impl LlmService for StubLlm {
        async fn summarize(&self, _text: &str) -> Result<String, LlmError> {
            Ok(crate::llm::sanitize_summary(self.summary))
        }
        async fn classify(&self, _text: &str) -> Result<Vec<String>, LlmError> {
            Ok(crate::llm::validate_tags(self.tags))
        }
        async fn extract_entities(&self, _text: &str) -> Result<Vec<String>, LlmError> {
            Ok(vec!["San Juan".into()])
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            Ok(vec![0.1, 0.2, 0.3])
        }
        async fn generate(
            &self,
            _model: Option<&str>,
            _system: &str,
            _user: &str,
        ) -> Result<String, LlmError> {
            Err(LlmError::Empty)
        }
    }

    fn article() -> Article {
        Article::new(
            "https://news.site/a",
            "T".into(),
            "Hello & welcome".into(),
            "Src".into(),
            "Puerto Rico".into(),
            EvidencePolicy::Ret3m,
        )
    }

    #[tokio::test]
    async fn refusal_summary_stays_empty_but_tags_persist() {
        let articles = Arc::new(MemoryArticleStore::new());
        let llm = Arc::new(StubLlm {
            summary: "No tengo información suficiente para resumir",
            tags: "politics, astrology",
        });
        let evidence = Arc::new(EvidenceStore::disabled());
        let pool = EnrichmentPool::new(articles.clone(), llm, evidence, 3);

        let a = article();
        articles.create(&a).await.unwrap();
        pool.spawn(a.clone(), String::new()).await.unwrap();

        let row = articles.get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(row.summary, "");
        assert_eq!(row.tags, vec!["politics"]);
        assert_eq!(row.embedding, Some(vec![0.1, 0.2, 0.3]));
    }

    #[tokio::test]
    async fn evidence_bundle_uploaded_when_configured() {
        let articles = Arc::new(MemoryArticleStore::new());
        let llm = Arc::new(StubLlm {
            summary: "Resumen claro del articulo.",
            tags: "health",
        });
        let backend = Arc::new(MemoryObjectStore::new());
        let evidence = Arc::new(EvidenceStore::new(backend.clone()));
        let pool = EnrichmentPool::new(articles.clone(), llm, evidence.clone(), 3);

        let a = article();
        articles.create(&a).await.unwrap();
        pool.spawn(a.clone(), "<html>raw</html>".into()).await.unwrap();

        let bundle = evidence.get_evidence(a.id).await.unwrap();
        assert_eq!(bundle.raw, b"<html>raw</html>");

        let extracted: serde_json::Value = serde_json::from_slice(&bundle.extracted).unwrap();
        assert_eq!(extracted["title"], "T");
        assert_eq!(extracted["summary"], "Resumen claro del articulo.");
        assert_eq!(extracted["tags"][0], "health");
        assert_eq!(extracted["entities"][0], "San Juan");
    }

    #[tokio::test]
    async fn reenrich_clears_garbage_and_refills() {
        let articles = Arc::new(MemoryArticleStore::new());
        let llm = Arc::new(StubLlm {
            summary: "Un resumen nuevo y valido.",
            tags: "economy",
        });
        let evidence = Arc::new(EvidenceStore::disabled());
        let pool = EnrichmentPool::new(articles.clone(), llm, evidence, 3);

        let mut a = article();
        a.summary = "Lo siento, no puedo resumir este texto".into();
        articles.create(&a).await.unwrap();

        let count = pool.reenrich_garbage().await.unwrap();
        assert_eq!(count, 1);

        let row = articles.get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(row.summary, "Un resumen nuevo y valido.");
        assert_eq!(row.tags, vec!["economy"]);
    }
}
