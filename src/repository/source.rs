//! Source catalog. Read-only from the pipeline's viewpoint.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StoreResult;
use crate::models::Source;

#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Active sources in deterministic order (name, then id).
    async fn list_active(&self) -> StoreResult<Vec<Source>>;
}

#[derive(Default)]
pub struct MemorySourceStore {
    rows: RwLock<Vec<Source>>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, source: Source) {
        self.rows.write().await.push(source);
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    async fn list_active(&self) -> StoreResult<Vec<Source>> {
        let rows = self.rows.read().await;
        let mut active: Vec<Source> = rows.iter().filter(|s| s.active).cloned().collect();
        active.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_active_sources_deterministically() {
        let store = MemorySourceStore::new();
        store.add(Source::rss("Zeta", "https://z.com/feed", "PR")).await;
        store.add(Source::rss("Alfa", "https://a.com/feed", "PR")).await;
        let mut inactive = Source::rss("Beta", "https://b.com/feed", "PR");
        inactive.active = false;
        store.add(inactive).await;

        let active = store.list_active().await.unwrap();
        let names: Vec<&str> = active.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alfa", "Zeta"]);
    }
}
