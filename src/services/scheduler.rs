//! Single-node job scheduler.
//!
//! Drives the periodic jobs from one loop so they never overlap: each tick
//! runs its job to completion before the next tick is examined. The
//! retention sweep rides the brief interval.

use std::time::Duration;

use tracing::{error, info};

use super::{BriefService, IngestService, RetentionService, SentimentService, WatchlistScanner};
use crate::config::ScheduleConfig;

pub struct Scheduler {
    config: ScheduleConfig,
    ingest: IngestService,
    watchlist: WatchlistScanner,
    sentiment: SentimentService,
    brief: BriefService,
    retention: RetentionService,
}

impl Scheduler {
    pub fn new(
        config: ScheduleConfig,
        ingest: IngestService,
        watchlist: WatchlistScanner,
        sentiment: SentimentService,
        brief: BriefService,
        retention: RetentionService,
    ) -> Self {
        Self {
            config,
            ingest,
            watchlist,
            sentiment,
            brief,
            retention,
        }
    }

    /// Run until the process is stopped. The first round of every job fires
    /// at startup.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut ingest_tick = tokio::time::interval(Duration::from_secs(
            self.config.ingest_interval_hours.max(1) * 3600,
        ));
        let mut watchlist_tick = tokio::time::interval(Duration::from_secs(
            self.config.watchlist_interval_hours.max(1) * 3600,
        ));
        let mut brief_tick = tokio::time::interval(Duration::from_secs(
            self.config.brief_interval_hours.max(1) * 3600,
        ));

        info!(
            ingest_hours = self.config.ingest_interval_hours,
            watchlist_hours = self.config.watchlist_interval_hours,
            brief_hours = self.config.brief_interval_hours,
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = ingest_tick.tick() => {
                    if let Err(e) = self.ingest.run().await {
                        error!(error = %e, "ingestion run failed");
                    }
                }
                _ = watchlist_tick.tick() => {
                    if let Err(e) = self.watchlist.run().await {
                        error!(error = %e, "watchlist scan failed");
                    }
                    // Fresh mentions get classified right after each scan.
                    if let Err(e) = self.sentiment.run().await {
                        error!(error = %e, "sentiment pass failed");
                    }
                }
                _ = brief_tick.tick() => {
                    if let Err(e) = self.brief.run().await {
                        error!(error = %e, "brief generation failed");
                    }
                    if let Err(e) = self.retention.run().await {
                        error!(error = %e, "retention sweep failed");
                    }
                }
            }
        }
    }
}
