//! Article: the primary entity produced by ingestion.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::urls;

/// Lifecycle status of an article in the review queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Inbox,
    Saved,
    Trashed,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Inbox => "inbox",
            ArticleStatus::Saved => "saved",
            ArticleStatus::Trashed => "trashed",
        }
    }
}

/// Evidence retention policy. Determines the object-storage key prefix and
/// the expiry offset from article creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidencePolicy {
    #[serde(rename = "ret_3m")]
    Ret3m,
    #[serde(rename = "ret_6m")]
    Ret6m,
    #[serde(rename = "ret_12m")]
    Ret12m,
    #[serde(rename = "keep")]
    Keep,
}

impl EvidencePolicy {
    /// All policies in evidence-lookup order.
    pub const ALL: [EvidencePolicy; 4] = [
        EvidencePolicy::Ret3m,
        EvidencePolicy::Ret6m,
        EvidencePolicy::Ret12m,
        EvidencePolicy::Keep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidencePolicy::Ret3m => "ret_3m",
            EvidencePolicy::Ret6m => "ret_6m",
            EvidencePolicy::Ret12m => "ret_12m",
            EvidencePolicy::Keep => "keep",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ret_3m" => Some(EvidencePolicy::Ret3m),
            "ret_6m" => Some(EvidencePolicy::Ret6m),
            "ret_12m" => Some(EvidencePolicy::Ret12m),
            "keep" => Some(EvidencePolicy::Keep),
            _ => None,
        }
    }

    /// Evidence expiry for an article created at `created_at`. `Keep` never
    /// expires.
    pub fn expires_at(&self, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = match self {
            EvidencePolicy::Ret3m => 3,
            EvidencePolicy::Ret6m => 6,
            EvidencePolicy::Ret12m => 12,
            EvidencePolicy::Keep => return None,
        };
        created_at.checked_add_months(Months::new(months))
    }
}

/// A harvested, canonicalized news article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    /// Normalized URL; the article's identity.
    pub canonical_url: String,
    /// SHA-256 of `canonical_url`, lowercase hex. Unique across live rows.
    pub url_hash: String,
    pub title: String,
    /// HTML-stripped, whitespace-normalized body text.
    pub clean_text: String,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub source_name: String,
    pub region: String,

    /// AI summary; empty until enrichment succeeds.
    #[serde(default)]
    pub summary: String,
    /// Ordered subset of the closed taxonomy.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Fixed-dimension embedding vector.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,

    pub status: ArticleStatus,
    #[serde(default)]
    pub pinned: bool,
    pub evidence_policy: EvidencePolicy,
    /// Null iff `evidence_policy == Keep`, otherwise creation + policy offset.
    pub evidence_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Build a new inbox article from a raw URL, applying canonicalization
    /// and the given retention policy.
    pub fn new(
        url: &str,
        title: String,
        clean_text: String,
        source_name: String,
        region: String,
        policy: EvidencePolicy,
    ) -> Self {
        let canonical_url = urls::canonicalize_url(url);
        let url_hash = urls::hash_content(&canonical_url);
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            canonical_url,
            url_hash,
            title,
            clean_text,
            published_at: None,
            image_url: None,
            source_name,
            region,
            summary: String::new(),
            tags: Vec::new(),
            embedding: None,
            status: ArticleStatus::Inbox,
            pinned: false,
            evidence_policy: policy,
            evidence_expires_at: policy.expires_at(created_at),
            created_at,
        }
    }

    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        // "" and absent are equivalent for nullable text fields.
        self.image_url = image_url.filter(|u| !u.is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_expiry_offsets() {
        let created = "2024-01-15T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(
            EvidencePolicy::Ret3m.expires_at(created),
            Some("2024-04-15T10:00:00Z".parse().unwrap())
        );
        assert_eq!(
            EvidencePolicy::Ret12m.expires_at(created),
            Some("2025-01-15T10:00:00Z".parse().unwrap())
        );
        assert_eq!(EvidencePolicy::Keep.expires_at(created), None);
    }

    #[test]
    fn new_article_canonicalizes_and_hashes() {
        let article = Article::new(
            "https://News.site/a?fbclid=1",
            "T".into(),
            "text".into(),
            "Site".into(),
            "Puerto Rico".into(),
            EvidencePolicy::Ret3m,
        );
        assert_eq!(article.canonical_url, "https://news.site/a");
        assert_eq!(article.url_hash, urls::hash_url("https://news.site/a"));
        assert_eq!(article.status, ArticleStatus::Inbox);
        // expiry set iff policy != keep
        let expires = article.evidence_expires_at.unwrap();
        let delta = expires - article.created_at;
        assert!(delta.num_days() >= 89 && delta.num_days() <= 92);
    }

    #[test]
    fn policy_string_roundtrip() {
        for policy in EvidencePolicy::ALL {
            assert_eq!(EvidencePolicy::parse(policy.as_str()), Some(policy));
        }
        assert_eq!(EvidencePolicy::parse("ret_9m"), None);
    }

    #[test]
    fn empty_image_url_is_absent() {
        let article = Article::new(
            "https://a.com/x",
            "T".into(),
            "b".into(),
            "S".into(),
            "R".into(),
            EvidencePolicy::Keep,
        )
        .with_image_url(Some(String::new()));
        assert_eq!(article.image_url, None);
        assert_eq!(article.evidence_expires_at, None);
    }
}
