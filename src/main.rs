//! MediaWatch - regional media monitoring back end.
//!
//! Scheduled ingestion, AI enrichment, evidence retention, and watchlist
//! scanning for nonprofit organizations in a single region.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediawatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    mediawatch::cli::run().await
}
