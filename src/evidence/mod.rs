//! Evidence preservation: compressed raw HTML, extracted text, and capture
//! metadata per article, partitioned by retention policy.
//!
//! Keyspace under the bucket:
//! ```text
//! evidence/<policy>/<article_id>/raw.html.gz
//! evidence/<policy>/<article_id>/extracted.txt.gz
//! evidence/<policy>/<article_id>/capture_meta.json
//! ```

pub mod object;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub use object::{MemoryObjectStore, ObjectStore, ObjectStoreError, S3ObjectStore};

use crate::config::EvidenceConfig;
use crate::models::EvidencePolicy;
use crate::utils::{gzip, urls};

const RAW_SUFFIX: &str = "raw.html.gz";
const EXTRACTED_SUFFIX: &str = "extracted.txt.gz";
const META_SUFFIX: &str = "capture_meta.json";

#[derive(Debug, Error)]
pub enum EvidenceError {
    /// Object storage is not configured; only `get` surfaces this.
    #[error("evidence storage not configured")]
    NotConfigured,
    #[error("no evidence found for article")]
    NotFound,
    #[error("evidence storage failed: {0}")]
    Storage(String),
}

impl From<ObjectStoreError> for EvidenceError {
    fn from(err: ObjectStoreError) -> Self {
        EvidenceError::Storage(err.to_string())
    }
}

/// Capture metadata stored beside each bundle. Hashes are over the
/// uncompressed payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureMeta {
    pub article_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub raw_hash_sha256: String,
    pub extract_hash_sha256: String,
    pub evidence_policy: EvidencePolicy,
}

/// A retrieved evidence bundle, decompressed.
#[derive(Debug)]
pub struct EvidenceBundle {
    pub raw: Vec<u8>,
    pub extracted: Vec<u8>,
    pub meta: CaptureMeta,
}

/// Evidence store over object storage. Unconfigured deployments get a
/// no-op store: uploads and deletes silently succeed, reads report
/// `NotConfigured`.
pub struct EvidenceStore {
    backend: Option<Arc<dyn ObjectStore>>,
}

impl EvidenceStore {
    pub fn from_config(config: &EvidenceConfig) -> Self {
        if config.is_configured() {
            Self::new(Arc::new(S3ObjectStore::new(config)))
        } else {
            Self::disabled()
        }
    }

    pub fn new(backend: Arc<dyn ObjectStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    fn key(policy: EvidencePolicy, id: Uuid, suffix: &str) -> String {
        format!("evidence/{}/{}/{}", policy.as_str(), id, suffix)
    }

    /// Hash, compress, and upload a bundle. The metadata object is uploaded
    /// uncompressed. Pass `meta` to preserve an existing capture record;
    /// otherwise one is built from the payloads.
    pub async fn store_evidence(
        &self,
        id: Uuid,
        policy: EvidencePolicy,
        raw: &[u8],
        extracted: &[u8],
        meta: Option<CaptureMeta>,
    ) -> Result<(), EvidenceError> {
        let Some(backend) = &self.backend else {
            debug!(article = %id, "evidence storage disabled, skipping upload");
            return Ok(());
        };

        let meta = meta.unwrap_or_else(|| CaptureMeta {
            article_id: id,
            captured_at: Utc::now(),
            raw_hash_sha256: urls::sha256_hex(raw),
            extract_hash_sha256: urls::sha256_hex(extracted),
            evidence_policy: policy,
        });
        let meta_json =
            serde_json::to_vec_pretty(&meta).map_err(|e| EvidenceError::Storage(e.to_string()))?;

        let raw_gz = gzip::compress(raw).map_err(|e| EvidenceError::Storage(e.to_string()))?;
        let extracted_gz =
            gzip::compress(extracted).map_err(|e| EvidenceError::Storage(e.to_string()))?;

        backend
            .put(&Self::key(policy, id, RAW_SUFFIX), raw_gz, "application/gzip")
            .await?;
        backend
            .put(
                &Self::key(policy, id, EXTRACTED_SUFFIX),
                extracted_gz,
                "application/gzip",
            )
            .await?;
        backend
            .put(
                &Self::key(policy, id, META_SUFFIX),
                meta_json,
                "application/json",
            )
            .await?;

        debug!(article = %id, policy = policy.as_str(), "evidence bundle stored");
        Ok(())
    }

    /// Delete a bundle wherever it lives: all policy prefixes are swept and
    /// missing keys are tolerated individually.
    pub async fn delete_evidence(&self, id: Uuid) -> Result<(), EvidenceError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };

        let mut first_error = None;
        for policy in EvidencePolicy::ALL {
            for suffix in [RAW_SUFFIX, EXTRACTED_SUFFIX, META_SUFFIX] {
                if let Err(err) = backend.delete(&Self::key(policy, id, suffix)).await {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Fetch a bundle, trying each policy prefix in order and returning the
    /// first complete triple.
    pub async fn get_evidence(&self, id: Uuid) -> Result<EvidenceBundle, EvidenceError> {
        let Some(backend) = &self.backend else {
            return Err(EvidenceError::NotConfigured);
        };

        for policy in EvidencePolicy::ALL {
            let raw = backend.get(&Self::key(policy, id, RAW_SUFFIX)).await?;
            let extracted = backend.get(&Self::key(policy, id, EXTRACTED_SUFFIX)).await?;
            let meta = backend.get(&Self::key(policy, id, META_SUFFIX)).await?;

            if let (Some(raw), Some(extracted), Some(meta)) = (raw, extracted, meta) {
                let raw = gzip::decompress(&raw).map_err(|e| EvidenceError::Storage(e.to_string()))?;
                let extracted = gzip::decompress(&extracted)
                    .map_err(|e| EvidenceError::Storage(e.to_string()))?;
                let meta: CaptureMeta = serde_json::from_slice(&meta)
                    .map_err(|e| EvidenceError::Storage(e.to_string()))?;
                return Ok(EvidenceBundle {
                    raw,
                    extracted,
                    meta,
                });
            }
        }

        Err(EvidenceError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured_store() -> (EvidenceStore, Arc<MemoryObjectStore>) {
        let backend = Arc::new(MemoryObjectStore::new());
        (EvidenceStore::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn store_and_get_roundtrip() {
        let (store, backend) = configured_store();
        let id = Uuid::new_v4();
        let raw = b"<html><body>captura</body></html>".to_vec();
        let extracted = br#"{"title":"T","text":"captura"}"#.to_vec();

        store
            .store_evidence(id, EvidencePolicy::Ret3m, &raw, &extracted, None)
            .await
            .unwrap();

        let keys = backend.keys().await;
        assert_eq!(keys.len(), 3);
        assert!(keys[0].starts_with(&format!("evidence/ret_3m/{}/", id)));

        let bundle = store.get_evidence(id).await.unwrap();
        assert_eq!(bundle.raw, raw);
        assert_eq!(bundle.extracted, extracted);
        assert_eq!(bundle.meta.article_id, id);
        assert_eq!(bundle.meta.raw_hash_sha256, urls::sha256_hex(&raw));
        assert_eq!(bundle.meta.extract_hash_sha256, urls::sha256_hex(&extracted));
        assert_eq!(bundle.meta.evidence_policy, EvidencePolicy::Ret3m);
    }

    #[tokio::test]
    async fn get_tries_policy_prefixes_in_order() {
        let (store, _) = configured_store();
        let id = Uuid::new_v4();
        store
            .store_evidence(id, EvidencePolicy::Keep, b"raw", b"ext", None)
            .await
            .unwrap();

        let bundle = store.get_evidence(id).await.unwrap();
        assert_eq!(bundle.meta.evidence_policy, EvidencePolicy::Keep);
    }

    #[tokio::test]
    async fn delete_sweeps_all_policies_and_tolerates_missing() {
        let (store, backend) = configured_store();
        let id = Uuid::new_v4();
        store
            .store_evidence(id, EvidencePolicy::Ret6m, b"raw", b"ext", None)
            .await
            .unwrap();

        store.delete_evidence(id).await.unwrap();
        assert!(backend.keys().await.is_empty());

        // Deleting again is a no-op.
        store.delete_evidence(id).await.unwrap();
        assert!(matches!(
            store.get_evidence(id).await,
            Err(EvidenceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn disabled_store_noops_and_reports_on_get() {
        let store = EvidenceStore::disabled();
        let id = Uuid::new_v4();

        store
            .store_evidence(id, EvidencePolicy::Ret3m, b"raw", b"ext", None)
            .await
            .unwrap();
        store.delete_evidence(id).await.unwrap();
        assert!(matches!(
            store.get_evidence(id).await,
            Err(EvidenceError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn meta_json_uses_wire_field_names() {
        let meta = CaptureMeta {
            article_id: Uuid::nil(),
            captured_at: "2024-01-15T10:00:00Z".parse().unwrap(),
            raw_hash_sha256: "aa".into(),
            extract_hash_sha256: "bb".into(),
            evidence_policy: EvidencePolicy::Ret12m,
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["evidence_policy"], "ret_12m");
        assert_eq!(json["raw_hash_sha256"], "aa");
        assert_eq!(json["extract_hash_sha256"], "bb");
        assert!(json["captured_at"].as_str().unwrap().starts_with("2024-01-15T10:00:00"));
    }
}
