//! Scheduled jobs: ingestion, enrichment, watchlist scanning, sentiment,
//! daily brief, and the evidence retention sweep.

pub mod brief;
pub mod enrich;
pub mod ingest;
pub mod retention;
pub mod scheduler;
pub mod sentiment;
pub mod watchlist;

pub use brief::BriefService;
pub use enrich::EnrichmentPool;
pub use ingest::IngestService;
pub use retention::RetentionService;
pub use scheduler::Scheduler;
pub use sentiment::SentimentService;
pub use watchlist::WatchlistScanner;
