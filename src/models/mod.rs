//! Domain model types.

pub mod article;
pub mod brief;
pub mod fingerprint;
pub mod source;
pub mod watchlist;

pub use article::{Article, ArticleStatus, EvidencePolicy};
pub use brief::Brief;
pub use fingerprint::Fingerprint;
pub use source::{FeedType, Selectors, Source};
pub use watchlist::{HitSource, Sentiment, WatchlistHit, WatchlistOrg};
