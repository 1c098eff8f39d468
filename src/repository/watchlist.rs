//! Watchlist org and mention stores.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult};
use crate::models::{Sentiment, WatchlistHit, WatchlistOrg};

#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn list_active_orgs(&self) -> StoreResult<Vec<WatchlistOrg>>;
    async fn create_org(&self, org: &WatchlistOrg) -> StoreResult<()>;
    async fn update_org(&self, org: &WatchlistOrg) -> StoreResult<()>;
    async fn delete_org(&self, id: Uuid) -> StoreResult<()>;
    async fn toggle_org(&self, id: Uuid, active: bool) -> StoreResult<()>;

    /// Insert a mention, ignoring url_hash conflicts. Returns whether a row
    /// was created.
    async fn create_mention(&self, hit: &WatchlistHit) -> StoreResult<bool>;

    async fn list_mentions_by_sentiment(
        &self,
        sentiment: Sentiment,
        limit: usize,
    ) -> StoreResult<Vec<WatchlistHit>>;

    async fn update_sentiment(&self, id: Uuid, sentiment: Sentiment) -> StoreResult<()>;

    async fn update_ai_draft(&self, id: Uuid, draft: &str) -> StoreResult<()>;
}

#[derive(Default)]
pub struct MemoryWatchlistStore {
    orgs: RwLock<HashMap<Uuid, WatchlistOrg>>,
    mentions: RwLock<Vec<WatchlistHit>>,
}

impl MemoryWatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mention_count(&self) -> usize {
        self.mentions.read().await.len()
    }
}

#[async_trait]
impl WatchlistStore for MemoryWatchlistStore {
    async fn list_active_orgs(&self) -> StoreResult<Vec<WatchlistOrg>> {
        let orgs = self.orgs.read().await;
        let mut active: Vec<WatchlistOrg> = orgs.values().filter(|o| o.active).cloned().collect();
        active.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn create_org(&self, org: &WatchlistOrg) -> StoreResult<()> {
        self.orgs.write().await.insert(org.id, org.clone());
        Ok(())
    }

    async fn update_org(&self, org: &WatchlistOrg) -> StoreResult<()> {
        let mut orgs = self.orgs.write().await;
        if !orgs.contains_key(&org.id) {
            return Err(StoreError::NotFound);
        }
        orgs.insert(org.id, org.clone());
        Ok(())
    }

    async fn delete_org(&self, id: Uuid) -> StoreResult<()> {
        self.orgs.write().await.remove(&id).ok_or(StoreError::NotFound)?;
        Ok(())
    }

    async fn toggle_org(&self, id: Uuid, active: bool) -> StoreResult<()> {
        let mut orgs = self.orgs.write().await;
        let org = orgs.get_mut(&id).ok_or(StoreError::NotFound)?;
        org.active = active;
        Ok(())
    }

    async fn create_mention(&self, hit: &WatchlistHit) -> StoreResult<bool> {
        let mut mentions = self.mentions.write().await;
        if mentions.iter().any(|m| m.url_hash == hit.url_hash) {
            return Ok(false);
        }
        mentions.push(hit.clone());
        Ok(true)
    }

    async fn list_mentions_by_sentiment(
        &self,
        sentiment: Sentiment,
        limit: usize,
    ) -> StoreResult<Vec<WatchlistHit>> {
        let mentions = self.mentions.read().await;
        Ok(mentions
            .iter()
            .filter(|m| m.sentiment == sentiment)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_sentiment(&self, id: Uuid, sentiment: Sentiment) -> StoreResult<()> {
        let mut mentions = self.mentions.write().await;
        let hit = mentions
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound)?;
        hit.sentiment = sentiment;
        Ok(())
    }

    async fn update_ai_draft(&self, id: Uuid, draft: &str) -> StoreResult<()> {
        let mut mentions = self.mentions.write().await;
        let hit = mentions
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound)?;
        hit.ai_draft = (!draft.is_empty()).then(|| draft.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HitSource;

    #[tokio::test]
    async fn mention_insert_ignores_url_hash_conflicts() {
        let store = MemoryWatchlistStore::new();
        let org = WatchlistOrg::new("Org");

        let a = WatchlistHit::new(org.id, HitSource::DdgLite, "t".into(), "https://a.com/x", "s");
        let b = WatchlistHit::new(
            org.id,
            HitSource::BingNewsRss,
            "t2".into(),
            "https://a.com/x?utm_source=news",
            "s2",
        );

        assert!(store.create_mention(&a).await.unwrap());
        assert!(!store.create_mention(&b).await.unwrap());
        assert_eq!(store.mention_count().await, 1);
    }

    #[tokio::test]
    async fn sentiment_workflow() {
        let store = MemoryWatchlistStore::new();
        let org = WatchlistOrg::new("Org");
        let hit = WatchlistHit::new(org.id, HitSource::SubredditRss, "t".into(), "https://r.com/p", "s");
        store.create_mention(&hit).await.unwrap();

        let unknown = store
            .list_mentions_by_sentiment(Sentiment::Unknown, 20)
            .await
            .unwrap();
        assert_eq!(unknown.len(), 1);

        store.update_sentiment(hit.id, Sentiment::Negative).await.unwrap();
        store.update_ai_draft(hit.id, "Borrador de respuesta.").await.unwrap();

        let negative = store
            .list_mentions_by_sentiment(Sentiment::Negative, 20)
            .await
            .unwrap();
        assert_eq!(negative.len(), 1);
        assert_eq!(negative[0].ai_draft.as_deref(), Some("Borrador de respuesta."));
        assert!(store
            .list_mentions_by_sentiment(Sentiment::Unknown, 20)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn org_toggle_and_listing() {
        let store = MemoryWatchlistStore::new();
        let org = WatchlistOrg::new("Fundación");
        store.create_org(&org).await.unwrap();
        assert_eq!(store.list_active_orgs().await.unwrap().len(), 1);

        store.toggle_org(org.id, false).await.unwrap();
        assert!(store.list_active_orgs().await.unwrap().is_empty());

        assert!(matches!(
            store.toggle_org(Uuid::new_v4(), true).await,
            Err(StoreError::NotFound)
        ));
    }
}
