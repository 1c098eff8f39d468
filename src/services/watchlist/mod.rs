//! Watchlist scanner: per-org fan-out across the search agents, spam
//! filtering, and mention creation.

pub mod agents;
pub mod keywords;
pub mod spam;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

pub use agents::{default_agents, RawHit, SearchAgent};
pub use keywords::KeywordEnricher;

use crate::models::{WatchlistHit, WatchlistOrg};
use crate::repository::WatchlistStore;
use crate::utils::Deadline;

/// Wall-clock bound for one full scan across all orgs.
const SCAN_DEADLINE: Duration = Duration::from_secs(2 * 60 * 60);
/// Bound for one agent's work on one org.
const AGENT_DEADLINE: Duration = Duration::from_secs(30);
/// Accepted results per agent per org.
const AGENT_ACCEPT_CAP: usize = 10;
/// Queries derived per org: the name plus up to four keywords.
const MAX_QUERIES: usize = 5;

/// Totals from one scan.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanStats {
    pub orgs: usize,
    pub raw_hits: usize,
    pub mentions_created: usize,
    pub spam_filtered: usize,
}

pub struct WatchlistScanner {
    store: Arc<dyn WatchlistStore>,
    agents: Vec<Arc<dyn SearchAgent>>,
    region: String,
}

impl WatchlistScanner {
    pub fn new(
        store: Arc<dyn WatchlistStore>,
        agents: Vec<Arc<dyn SearchAgent>>,
        region: &str,
    ) -> Self {
        Self {
            store,
            agents,
            region: region.to_string(),
        }
    }

    pub async fn run(&self) -> anyhow::Result<ScanStats> {
        self.run_with_deadline(Deadline::after(SCAN_DEADLINE)).await
    }

    /// Scan every active org sequentially under the job deadline.
    pub async fn run_with_deadline(&self, deadline: Deadline) -> anyhow::Result<ScanStats> {
        let started = std::time::Instant::now();
        let orgs = self.store.list_active_orgs().await?;

        let mut stats = ScanStats {
            orgs: orgs.len(),
            ..Default::default()
        };

        for org in &orgs {
            if deadline.expired() {
                info!("watchlist scan deadline reached");
                break;
            }
            self.scan_org(org, deadline, &mut stats).await;
        }

        info!(
            orgs = stats.orgs,
            raw_hits = stats.raw_hits,
            mentions = stats.mentions_created,
            spam = stats.spam_filtered,
            duration_secs = started.elapsed().as_secs(),
            "watchlist scan complete"
        );
        Ok(stats)
    }

    async fn scan_org(&self, org: &WatchlistOrg, deadline: Deadline, stats: &mut ScanStats) {
        let queries = derive_queries(org, &self.region);
        debug!(org = %org.name, ?queries, "scanning org");

        for agent in &self.agents {
            if deadline.expired() {
                break;
            }
            if !agent.wants(org) {
                continue;
            }

            let agent_deadline = Deadline::after(deadline.cap(AGENT_DEADLINE));
            let raw_hits = match agent.scan(org, &queries, agent_deadline).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(agent = agent.name(), org = %org.name, error = %e, "agent failed");
                    continue;
                }
            };
            stats.raw_hits += raw_hits.len();

            let mut accepted = 0;
            for hit in raw_hits {
                if accepted >= AGENT_ACCEPT_CAP {
                    break;
                }
                if spam::is_spam(&hit.title, &hit.snippet, &hit.url, &org.keywords) {
                    stats.spam_filtered += 1;
                    continue;
                }

                let mention =
                    WatchlistHit::new(org.id, agent.source(), hit.title, &hit.url, &hit.snippet);
                match self.store.create_mention(&mention).await {
                    Ok(true) => {
                        accepted += 1;
                        stats.mentions_created += 1;
                    }
                    Ok(false) => debug!(url = %hit.url, "mention already known"),
                    Err(e) => warn!(url = %hit.url, error = %e, "mention insert failed"),
                }
            }
        }
    }
}

/// Up to five queries per org: `"<name> <region>"` first, then unique
/// keywords (excluding the org name itself), each suffixed with the region.
pub fn derive_queries(org: &WatchlistOrg, region: &str) -> Vec<String> {
    let mut queries = vec![format!("{} {}", org.name, region)];
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(org.name.to_lowercase());

    for keyword in &org.keywords {
        if queries.len() >= MAX_QUERIES {
            break;
        }
        let lower = keyword.to_lowercase();
        if lower == org.name.to_lowercase() {
            continue;
        }
        if seen.insert(lower) {
            queries.push(format!("{} {}", keyword, region));
        }
    }
    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HitSource, Sentiment};
    use crate::repository::MemoryWatchlistStore;
    use async_trait::async_trait;

    #[test]
    fn queries_lead_with_name_and_skip_duplicates() {
        let mut org = WatchlistOrg::new("Fundación Ejemplo");
        org.keywords = vec![
            "fundación ejemplo".into(), // equals the name, skipped
            "becas".into(),
            "Becas".into(), // duplicate
            "centro juvenil".into(),
            "voluntarios".into(),
            "donaciones".into(), // beyond the cap
        ];

        let queries = derive_queries(&org, "Puerto Rico");
        assert_eq!(
            queries,
            vec![
                "Fundación Ejemplo Puerto Rico",
                "becas Puerto Rico",
                "centro juvenil Puerto Rico",
                "voluntarios Puerto Rico",
                "donaciones Puerto Rico",
            ]
        );
        assert!(queries.len() <= 5);
    }

    /// Agent returning a fixed result set.
    struct FixedAgent {
        hits: Vec<RawHit>,
    }

    #[async_trait]
    impl SearchAgent for FixedAgent {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn source(&self) -> HitSource {
            HitSource::DdgLite
        }
        async fn scan(
            &self,
            _org: &WatchlistOrg,
            _queries: &[String],
            _deadline: Deadline,
        ) -> anyhow::Result<Vec<RawHit>> {
            Ok(self.hits.clone())
        }
    }

    #[tokio::test]
    async fn scanner_filters_spam_dedups_and_caps() {
        let store = Arc::new(MemoryWatchlistStore::new());
        let org = WatchlistOrg::new("Fundación Ejemplo");
        store.create_org(&org).await.unwrap();

        // A spam homepage first, then a result whose tracking-link duplicate
        // follows immediately, then enough clean results to overflow the cap.
        let mut hits = vec![
            RawHit {
                title: "spam".into(),
                url: "https://example.com/".into(),
                snippet: "s".into(),
            },
            RawHit {
                title: "Noticia 0 en San Juan".into(),
                url: "https://news.site/a0".into(),
                snippet: "texto relevante".into(),
            },
            RawHit {
                title: "dup".into(),
                url: "https://news.site/a0?utm_source=x".into(),
                snippet: "texto relevante en san juan".into(),
            },
        ];
        hits.extend((1..14).map(|i| RawHit {
            title: format!("Noticia {} en San Juan", i),
            url: format!("https://news.site/a{}", i),
            snippet: "texto relevante".into(),
        }));

        let scanner = WatchlistScanner::new(
            store.clone(),
            vec![Arc::new(FixedAgent { hits })],
            "Puerto Rico",
        );
        let stats = scanner.run().await.unwrap();

        // Cap is 10 accepted mentions for the single agent.
        assert_eq!(stats.mentions_created, 10);
        assert_eq!(store.mention_count().await, 10);
        assert!(stats.spam_filtered >= 1);

        // All mentions start unclassified.
        let unknown = store
            .list_mentions_by_sentiment(Sentiment::Unknown, 50)
            .await
            .unwrap();
        assert_eq!(unknown.len(), 10);
    }
}
