//! Job deadline tokens.
//!
//! Each scheduled job runs under a single request-scoped deadline. Loops
//! check it at iteration boundaries; I/O calls cap their own timeout by the
//! time remaining, so in-flight requests cannot outlive the job.

use std::time::Duration;

use tokio::time::Instant;

/// A fixed point in time after which a job must stop starting new work.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `duration` from now.
    pub fn after(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Cap a per-operation timeout by the time remaining on the job.
    pub fn cap(&self, op_timeout: Duration) -> Duration {
        op_timeout.min(self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expires_after_duration() {
        let deadline = Deadline::after(Duration::from_secs(10));
        assert!(!deadline.expired());
        assert!(deadline.remaining() > Duration::from_secs(9));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn cap_shrinks_toward_deadline() {
        let deadline = Deadline::after(Duration::from_secs(5));
        assert_eq!(deadline.cap(Duration::from_secs(2)), Duration::from_secs(2));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(deadline.cap(Duration::from_secs(2)) <= Duration::from_secs(1));
    }
}
