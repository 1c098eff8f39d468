//! Brief store: one row per day, regeneration upserts.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StoreResult;
use crate::models::Brief;

#[async_trait]
pub trait BriefStore: Send + Sync {
    /// Insert or replace the brief for its date.
    async fn upsert(&self, brief: &Brief) -> StoreResult<()>;

    async fn get_latest(&self) -> StoreResult<Option<Brief>>;

    async fn list(&self, limit: usize) -> StoreResult<Vec<Brief>>;
}

#[derive(Default)]
pub struct MemoryBriefStore {
    rows: RwLock<Vec<Brief>>,
}

impl MemoryBriefStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BriefStore for MemoryBriefStore {
    async fn upsert(&self, brief: &Brief) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        if let Some(existing) = rows.iter_mut().find(|b| b.date == brief.date) {
            *existing = brief.clone();
        } else {
            rows.push(brief.clone());
        }
        Ok(())
    }

    async fn get_latest(&self) -> StoreResult<Option<Brief>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().max_by_key(|b| b.date).cloned())
    }

    async fn list(&self, limit: usize) -> StoreResult<Vec<Brief>> {
        let rows = self.rows.read().await;
        let mut out: Vec<Brief> = rows.clone();
        out.sort_by(|a, b| b.date.cmp(&a.date));
        out.truncate(limit);
        Ok(out)
    }
}
