//! Pausing and bounded polling.
//!
//! Every wait in the workflow (UI settle time, completion polling) goes through a
//! [`Pacer`], so tests can swap real timers for an instant fake.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

/// Something that can suspend the caller for a while.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Pauses for the given duration.
    async fn pause(&self, duration: Duration);
}

/// Pacer backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How often and how many times a condition is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two checks.
    pub interval: Duration,
    /// Maximum number of checks before giving up.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 300,
        }
    }
}

impl PollPolicy {
    /// Creates a policy with the given interval and bound.
    #[must_use]
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Outcome of [`poll_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition held on the given (1-based) check.
    Satisfied(u32),
    /// The condition never held within the bound.
    Exhausted(u32),
}

/// Checks `condition` until it returns `true` or the policy's bound is reached.
///
/// Returns as soon as a check succeeds. Every failed check is followed by one
/// pause of `policy.interval`.
pub async fn poll_until<F, Fut>(policy: &PollPolicy, pacer: &dyn Pacer, mut condition: F) -> PollOutcome
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = bool> + Send,
{
    for attempt in 1..=policy.max_attempts {
        if condition().await {
            return PollOutcome::Satisfied(attempt);
        }
        pacer.pause(policy.interval).await;
    }
    PollOutcome::Exhausted(policy.max_attempts)
}

/// Test pacer that returns immediately and records every pause.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct InstantPacer {
    pauses: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl InstantPacer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn pause_count(&self) -> usize {
        self.pauses.lock().unwrap().len()
    }

    pub(crate) fn total(&self) -> Duration {
        self.pauses.lock().unwrap().iter().sum()
    }
}

#[cfg(test)]
#[async_trait]
impl Pacer for InstantPacer {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_policy_is_five_minutes() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 300);
        assert_eq!(policy.interval * policy.max_attempts, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn satisfied_on_first_check_never_pauses() {
        let pacer = InstantPacer::new();
        let outcome = poll_until(&PollPolicy::default(), &pacer, || async { true }).await;
        assert_eq!(outcome, PollOutcome::Satisfied(1));
        assert_eq!(pacer.pause_count(), 0);
    }

    #[tokio::test]
    async fn exhausted_after_exact_bound() {
        let pacer = InstantPacer::new();
        let checks = AtomicU32::new(0);
        let policy = PollPolicy::new(Duration::from_millis(250), 12);
        let outcome = poll_until(&policy, &pacer, || {
            checks.fetch_add(1, Ordering::SeqCst);
            async { false }
        })
        .await;
        assert_eq!(outcome, PollOutcome::Exhausted(12));
        assert_eq!(checks.load(Ordering::SeqCst), 12);
        assert_eq!(pacer.pause_count(), 12);
        assert_eq!(pacer.total(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn satisfied_midway() {
        let pacer = InstantPacer::new();
        let checks = AtomicU32::new(0);
        let outcome = poll_until(&PollPolicy::default(), &pacer, || {
            let n = checks.fetch_add(1, Ordering::SeqCst) + 1;
            async move { n == 4 }
        })
        .await;
        assert_eq!(outcome, PollOutcome::Satisfied(4));
        assert_eq!(pacer.pause_count(), 3);
    }
}
