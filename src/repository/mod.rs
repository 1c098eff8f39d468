//! Typed stores with named operations.
//!
//! The pipeline treats the data tier as traits; the in-memory
//! implementations back tests and single-node demo runs. Each persisted
//! record is an independent commit; there are no cross-store transactions.

pub mod article;
pub mod brief;
pub mod fingerprint;
pub mod source;
pub mod watchlist;

pub use article::{ArticleStore, MemoryArticleStore};
pub use brief::{BriefStore, MemoryBriefStore};
pub use fingerprint::{FingerprintStore, MemoryFingerprintStore};
pub use source::{MemorySourceStore, SourceStore};
pub use watchlist::{MemoryWatchlistStore, WatchlistStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    /// Uniqueness violation, e.g. a duplicate url_hash.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
