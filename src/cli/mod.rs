//! Command-line interface: one-shot jobs and the scheduler daemon.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

use crate::config::AppConfig;
use crate::evidence::EvidenceStore;
use crate::feeds::FeedDiscoverer;
use crate::llm::{LlmClient, LlmService};
use crate::models::{Source, WatchlistOrg};
use crate::repository::{
    MemoryArticleStore, MemoryBriefStore, MemoryFingerprintStore, MemorySourceStore,
    MemoryWatchlistStore, WatchlistStore,
};
use crate::scrapers::{PageFetcher, PageScraper};
use crate::services::watchlist::{default_agents, KeywordEnricher};
use crate::services::{
    BriefService, EnrichmentPool, IngestService, RetentionService, Scheduler, SentimentService,
    WatchlistScanner,
};

#[derive(Parser)]
#[command(name = "mediawatch", version, about = "Regional media monitoring back end")]
struct Cli {
    /// Configuration file (TOML). Defaults apply when absent.
    #[arg(long, default_value = "mediawatch.toml", env = "MEDIAWATCH_CONFIG")]
    config: PathBuf,

    /// Source catalog seed file.
    #[arg(long, default_value = "sources.toml")]
    sources: PathBuf,

    /// Watchlist org seed file.
    #[arg(long, default_value = "watchlist.toml")]
    watchlist: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler daemon (ingestion, watchlist scan, brief,
    /// retention).
    Run,
    /// One ingestion run.
    Ingest,
    /// One watchlist scan followed by the sentiment pass.
    Scan,
    /// Generate today's brief.
    Brief,
    /// Clear garbage summaries and re-enrich affected articles.
    Reenrich,
    /// Sweep expired evidence bundles.
    Retention,
    /// Suggest monitoring keywords for a watchlist org.
    Keywords {
        /// Org name as configured in the watchlist seed file.
        name: String,
    },
}

#[derive(Deserialize, Default)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<Source>,
}

#[derive(Deserialize, Default)]
struct WatchlistFile {
    #[serde(default)]
    orgs: Vec<WatchlistOrg>,
}

struct App {
    config: AppConfig,
    watchlist_store: Arc<MemoryWatchlistStore>,
    llm: Arc<dyn LlmService>,
    pool: EnrichmentPool,
    ingest: IngestService,
    scanner: WatchlistScanner,
    sentiment: SentimentService,
    brief: BriefService,
    retention: RetentionService,
}

impl App {
    async fn build(cli: &Cli) -> anyhow::Result<Self> {
        let config = AppConfig::load(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?;

        let articles = Arc::new(MemoryArticleStore::new());
        let fingerprints = Arc::new(MemoryFingerprintStore::new());
        let source_store = Arc::new(MemorySourceStore::new());
        let watchlist_store = Arc::new(MemoryWatchlistStore::new());
        let briefs = Arc::new(MemoryBriefStore::new());

        for source in load_seed::<SourcesFile>(&cli.sources)?.sources {
            source_store.add(source).await;
        }
        for org in load_seed::<WatchlistFile>(&cli.watchlist)?.orgs {
            watchlist_store.create_org(&org).await?;
        }

        let scraper: Arc<dyn PageFetcher> = Arc::new(PageScraper::new(&config.scrape));
        let discoverer = Arc::new(FeedDiscoverer::new(&config.scrape.user_agent, scraper.clone()));
        let llm: Arc<dyn LlmService> = Arc::new(LlmClient::new(config.llm.clone()));
        let evidence = Arc::new(EvidenceStore::from_config(&config.evidence));

        let pool = EnrichmentPool::new(
            articles.clone(),
            llm.clone(),
            evidence.clone(),
            config.enrich_concurrency,
        );
        let ingest = IngestService::new(
            config.clone(),
            source_store,
            articles.clone(),
            fingerprints,
            discoverer,
            scraper,
            pool.clone(),
        );
        let scanner = WatchlistScanner::new(
            watchlist_store.clone(),
            default_agents(&config.scrape.user_agent, articles.clone()),
            &config.region,
        );
        let sentiment = SentimentService::new(
            watchlist_store.clone(),
            llm.clone(),
            &config.llm.draft_model,
        );
        let brief = BriefService::new(
            articles.clone(),
            briefs,
            llm.clone(),
            &config.llm.draft_model,
        );
        let retention = RetentionService::new(articles, evidence);

        Ok(Self {
            config,
            watchlist_store,
            llm,
            pool,
            ingest,
            scanner,
            sentiment,
            brief,
            retention,
        })
    }
}

fn load_seed<T: serde::de::DeserializeOwned + Default>(path: &PathBuf) -> anyhow::Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app = App::build(&cli).await?;

    match &cli.command {
        Command::Run => {
            let scheduler = Scheduler::new(
                app.config.schedule.clone(),
                app.ingest,
                app.scanner,
                app.sentiment,
                app.brief,
                app.retention,
            );
            scheduler.run().await
        }
        Command::Ingest => {
            let stats = app.ingest.run().await?;
            info!(
                ingested = stats.ingested,
                skipped = stats.skipped,
                "ingestion finished"
            );
            Ok(())
        }
        Command::Scan => {
            let stats = app.scanner.run().await?;
            info!(mentions = stats.mentions_created, "scan finished");
            app.sentiment.run().await?;
            Ok(())
        }
        Command::Brief => {
            let brief = app.brief.run().await?;
            println!("{}", brief.summary);
            Ok(())
        }
        Command::Reenrich => {
            let count = app.pool.reenrich_garbage().await?;
            info!(count, "re-enrichment finished");
            Ok(())
        }
        Command::Retention => {
            let swept = app.retention.run().await?;
            info!(swept, "retention sweep finished");
            Ok(())
        }
        Command::Keywords { name } => {
            let orgs = app.watchlist_store.list_active_orgs().await?;
            let org = orgs
                .iter()
                .find(|o| o.name.eq_ignore_ascii_case(name))
                .with_context(|| format!("no active org named {name}"))?;
            let enricher = KeywordEnricher::new(app.llm.clone(), &app.config.scrape.user_agent);
            let keywords = enricher.enrich_keywords(org).await?;
            for keyword in keywords {
                println!("{}", keyword);
            }
            Ok(())
        }
    }
}
