//! Sentiment classification and PR-draft generation for fresh mentions.
//!
//! Runs at the end of each watchlist scan. Cancellation happens between
//! mentions, never mid-call.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::llm::{prompts, LlmService};
use crate::models::{Sentiment, WatchlistHit};
use crate::repository::WatchlistStore;
use crate::utils::Deadline;

/// Mentions classified per pass.
const MENTION_BATCH: usize = 20;
/// Wall-clock bound for one pass.
const PASS_DEADLINE: Duration = Duration::from_secs(30 * 60);

pub struct SentimentService {
    store: Arc<dyn WatchlistStore>,
    llm: Arc<dyn LlmService>,
    /// Higher-capability model for PR drafts.
    draft_model: String,
}

impl SentimentService {
    pub fn new(store: Arc<dyn WatchlistStore>, llm: Arc<dyn LlmService>, draft_model: &str) -> Self {
        Self {
            store,
            llm,
            draft_model: draft_model.to_string(),
        }
    }

    pub async fn run(&self) -> anyhow::Result<usize> {
        self.run_with_deadline(Deadline::after(PASS_DEADLINE)).await
    }

    pub async fn run_with_deadline(&self, deadline: Deadline) -> anyhow::Result<usize> {
        let pending = self
            .store
            .list_mentions_by_sentiment(Sentiment::Unknown, MENTION_BATCH)
            .await?;

        let mut classified = 0;
        for mention in &pending {
            if deadline.expired() {
                info!("sentiment pass deadline reached");
                break;
            }
            self.classify_mention(mention).await;
            classified += 1;
        }

        info!(classified, "sentiment pass complete");
        Ok(classified)
    }

    async fn classify_mention(&self, mention: &WatchlistHit) {
        let context = format!("Titulo: {}\nTexto: {}", mention.title, mention.snippet);

        // Anything other than a clean single-word answer defaults neutral.
        let sentiment = match self
            .llm
            .generate(None, prompts::SENTIMENT_SYSTEM, &context)
            .await
        {
            Ok(answer) => Sentiment::parse(&answer).unwrap_or(Sentiment::Neutral),
            Err(e) => {
                warn!(mention = %mention.id, error = %e, "sentiment call failed, defaulting neutral");
                Sentiment::Neutral
            }
        };

        if let Err(e) = self.store.update_sentiment(mention.id, sentiment).await {
            warn!(mention = %mention.id, error = %e, "failed to persist sentiment");
            return;
        }
        debug!(mention = %mention.id, sentiment = sentiment.as_str(), "mention classified");

        if sentiment == Sentiment::Negative {
            match self
                .llm
                .generate(Some(&self.draft_model), prompts::PR_DRAFT_SYSTEM, &context)
                .await
            {
                Ok(draft) => {
                    if let Err(e) = self.store.update_ai_draft(mention.id, &draft).await {
                        warn!(mention = %mention.id, error = %e, "failed to persist draft");
                    }
                }
                Err(e) => warn!(mention = %mention.id, error = %e, "draft generation failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::models::{HitSource, WatchlistOrg};
    use crate::repository::MemoryWatchlistStore;
    use async_trait::async_trait;

    /// Classifies anything mentioning "scandal" as negative; drafts echo
    /// the model they ran on.
    struct StubLlm;

    #[async_trait]
    impl LlmService for StubLlm {
        async fn summarize(&self, _text: &str) -> Result<String, LlmError> {
            Err(LlmError::Empty)
        }
        async fn classify(&self, _text: &str) -> Result<Vec<String>, LlmError> {
            Ok(vec![])
        }
        async fn extract_entities(&self, _text: &str) -> Result<Vec<String>, LlmError> {
            Ok(vec![])
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            Err(LlmError::Empty)
        }
        async fn generate(
            &self,
            model: Option<&str>,
            system: &str,
            user: &str,
        ) -> Result<String, LlmError> {
            if system == prompts::SENTIMENT_SYSTEM {
                if user.contains("scandal") {
                    Ok("negative".into())
                } else if user.contains("premio") {
                    Ok("positive".into())
                } else {
                    Ok("I think this is somewhat mixed".into())
                }
            } else {
                Ok(format!(
                    "Borrador generado por {}.\n\nSegundo parrafo.",
                    model.unwrap_or("default")
                ))
            }
        }
    }

    #[tokio::test]
    async fn negative_mentions_get_a_draft_from_the_override_model() {
        let store = Arc::new(MemoryWatchlistStore::new());
        let org = WatchlistOrg::new("OrgName");

        let negative = WatchlistHit::new(
            org.id,
            HitSource::SubredditRss,
            "OrgName scandal".into(),
            "https://www.reddit.com/r/pr/comments/x/y/",
            "allegations of misconduct",
        );
        store.create_mention(&negative).await.unwrap();

        let positive = WatchlistHit::new(
            org.id,
            HitSource::GoogleNewsRss,
            "OrgName gana premio".into(),
            "https://news.site/premio",
            "reconocimiento nacional",
        );
        store.create_mention(&positive).await.unwrap();

        let vague = WatchlistHit::new(
            org.id,
            HitSource::DdgLite,
            "OrgName event".into(),
            "https://news.site/evento",
            "community notes",
        );
        store.create_mention(&vague).await.unwrap();

        let service = SentimentService::new(store.clone(), Arc::new(StubLlm), "modelo-grande");
        let classified = service.run().await.unwrap();
        assert_eq!(classified, 3);

        let negatives = store
            .list_mentions_by_sentiment(Sentiment::Negative, 10)
            .await
            .unwrap();
        assert_eq!(negatives.len(), 1);
        let draft = negatives[0].ai_draft.as_deref().unwrap();
        assert!(draft.contains("modelo-grande"));
        assert!(draft.len() <= 2000);

        // Positive and unparseable answers never get drafts.
        let positives = store
            .list_mentions_by_sentiment(Sentiment::Positive, 10)
            .await
            .unwrap();
        assert_eq!(positives.len(), 1);
        assert!(positives[0].ai_draft.is_none());

        let neutrals = store
            .list_mentions_by_sentiment(Sentiment::Neutral, 10)
            .await
            .unwrap();
        assert_eq!(neutrals.len(), 1);

        assert!(store
            .list_mentions_by_sentiment(Sentiment::Unknown, 10)
            .await
            .unwrap()
            .is_empty());
    }
}
