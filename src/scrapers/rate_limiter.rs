//! Per-domain request pacing.
//!
//! Fixed policy per domain: one request per second with bounded parallelism
//! and random jitter, so a burst of discovered articles from one site never
//! hammers it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::time::Instant;
use tracing::debug;

use crate::config::ScrapeConfig;
use crate::utils::urls::extract_domain;

struct DomainState {
    slots: Arc<Semaphore>,
    next_ready: Mutex<Instant>,
}

/// Limiter shared by every fetcher that touches article pages.
pub struct DomainLimiter {
    delay: Duration,
    jitter: Duration,
    parallelism: usize,
    domains: RwLock<HashMap<String, Arc<DomainState>>>,
}

/// Held for the duration of one request; releases the domain slot on drop.
pub struct DomainPermit {
    _permit: OwnedSemaphorePermit,
    pub domain: String,
}

impl DomainLimiter {
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.per_domain_delay_ms),
            jitter: Duration::from_millis(config.jitter_ms),
            parallelism: config.per_domain_parallelism.max(1),
            domains: RwLock::new(HashMap::new()),
        }
    }

    /// Wait until the domain is ready, then claim a parallelism slot.
    /// URLs without a host are not limited.
    pub async fn acquire(&self, url: &str) -> Option<DomainPermit> {
        let domain = extract_domain(url)?;
        let state = self.state_for(&domain).await;

        let permit = state
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("domain semaphore closed");

        // Reserve the next send slot, spaced by delay ± jitter.
        let wake = {
            let mut next_ready = state.next_ready.lock().await;
            let now = Instant::now();
            let start = (*next_ready).max(now);
            *next_ready = start + self.spacing();
            start
        };

        if wake > Instant::now() {
            debug!(%domain, wait_ms = (wake - Instant::now()).as_millis() as u64, "rate limiting");
            tokio::time::sleep_until(wake).await;
        }

        Some(DomainPermit {
            _permit: permit,
            domain,
        })
    }

    fn spacing(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as i64;
        if jitter_ms == 0 {
            return self.delay;
        }
        let offset = rand::thread_rng().gen_range(-jitter_ms..=jitter_ms);
        let base = self.delay.as_millis() as i64;
        Duration::from_millis((base + offset).max(0) as u64)
    }

    async fn state_for(&self, domain: &str) -> Arc<DomainState> {
        if let Some(state) = self.domains.read().await.get(domain) {
            return state.clone();
        }
        let mut domains = self.domains.write().await;
        domains
            .entry(domain.to_string())
            .or_insert_with(|| {
                Arc::new(DomainState {
                    slots: Arc::new(Semaphore::new(self.parallelism)),
                    next_ready: Mutex::new(Instant::now()),
                })
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(delay_ms: u64, jitter_ms: u64, parallelism: usize) -> ScrapeConfig {
        ScrapeConfig {
            per_domain_delay_ms: delay_ms,
            jitter_ms,
            per_domain_parallelism: parallelism,
            ..ScrapeConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_requests_to_one_domain() {
        let limiter = DomainLimiter::new(&config(1000, 0, 4));
        let start = Instant::now();

        limiter.acquire("https://a.com/1").await.unwrap();
        limiter.acquire("https://a.com/2").await.unwrap();
        limiter.acquire("https://a.com/3").await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_domains_do_not_interfere() {
        let limiter = DomainLimiter::new(&config(1000, 0, 4));
        let start = Instant::now();

        limiter.acquire("https://a.com/1").await.unwrap();
        limiter.acquire("https://b.com/1").await.unwrap();

        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn parallelism_is_bounded() {
        let limiter = Arc::new(DomainLimiter::new(&config(0, 0, 2)));

        let first = limiter.acquire("https://a.com/1").await.unwrap();
        let _second = limiter.acquire("https://a.com/2").await.unwrap();

        // Third slot only opens once a permit drops.
        let limiter2 = limiter.clone();
        let third = tokio::spawn(async move { limiter2.acquire("https://a.com/3").await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!third.is_finished());

        drop(first);
        let permit = tokio::time::timeout(Duration::from_secs(1), third)
            .await
            .unwrap()
            .unwrap();
        assert!(permit.is_some());
    }

    #[tokio::test]
    async fn urls_without_host_are_unlimited() {
        let limiter = DomainLimiter::new(&config(1000, 0, 1));
        assert!(limiter.acquire("not a url").await.is_none());
    }
}
