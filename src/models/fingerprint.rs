//! URL fingerprints: the cross-run deduplication surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A seen or blocked URL. Created before article insertion; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    /// SHA-256 of the canonical URL, lowercase hex.
    pub url_hash: String,
    /// SHA-256 of the extracted text at ingestion time, if any.
    pub content_hash: Option<String>,
    /// Blocked URLs are ignored on all future runs.
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl Fingerprint {
    pub fn new(url_hash: &str, content_hash: Option<String>) -> Self {
        Self {
            url_hash: url_hash.to_string(),
            content_hash,
            blocked: false,
            created_at: Utc::now(),
        }
    }
}
