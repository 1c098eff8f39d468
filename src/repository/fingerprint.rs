//! Fingerprint store: the only cross-job mutual-exclusion surface for URL
//! admission.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, StoreResult};
use crate::models::Fingerprint;

#[async_trait]
pub trait FingerprintStore: Send + Sync {
    /// `(exists, blocked)` for a url_hash.
    async fn exists_or_blocked(&self, url_hash: &str) -> StoreResult<(bool, bool)>;

    /// Insert a fingerprint. The caller must have verified non-existence;
    /// a duplicate is a `Conflict`.
    async fn create(&self, fingerprint: &Fingerprint) -> StoreResult<()>;

    /// Mark a url_hash as blocked. Idempotent; creates the row if absent.
    async fn block(&self, url_hash: &str) -> StoreResult<()>;
}

#[derive(Default)]
pub struct MemoryFingerprintStore {
    rows: RwLock<HashMap<String, Fingerprint>>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl FingerprintStore for MemoryFingerprintStore {
    async fn exists_or_blocked(&self, url_hash: &str) -> StoreResult<(bool, bool)> {
        let rows = self.rows.read().await;
        match rows.get(url_hash) {
            Some(fp) => Ok((true, fp.blocked)),
            None => Ok((false, false)),
        }
    }

    async fn create(&self, fingerprint: &Fingerprint) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&fingerprint.url_hash) {
            return Err(StoreError::Conflict(format!(
                "fingerprint {} already exists",
                fingerprint.url_hash
            )));
        }
        rows.insert(fingerprint.url_hash.clone(), fingerprint.clone());
        Ok(())
    }

    async fn block(&self, url_hash: &str) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        rows.entry(url_hash.to_string())
            .or_insert_with(|| Fingerprint::new(url_hash, None))
            .blocked = true;
        Ok(())
    }
}
