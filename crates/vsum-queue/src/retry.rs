//! Retry policy for stages.
//!
//! Backoff is exponential with equal jitter: half of the exponential delay
//! is fixed and the other half random. Successive delays for one job never
//! shrink and never exceed `max_delay`.

use std::time::Duration;

use rand::Rng;

use vsum_models::JobKind;

use crate::stage::StageError;

/// Outcome of a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-enqueue after the delay.
    RetryAfter(Duration),
    /// Terminal failure with this error.
    Fail(StageError),
}

/// Per-stage retry budget and backoff bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// Default budget per job kind: fetch 3, generate 2, process 3, save 1.
    pub fn for_kind(kind: JobKind) -> Self {
        match kind {
            JobKind::FetchTranscript => Self::new(3),
            JobKind::GenerateSummary => Self::new(2),
            JobKind::ProcessVideo => Self::new(3),
            JobKind::SaveSummary => Self::new(1),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed.
    pub fn decide(&self, attempt: u32, error: StageError, previous_delay: Option<Duration>) -> RetryDecision {
        if !error.is_retryable() || attempt >= self.max_attempts {
            return RetryDecision::Fail(error);
        }
        RetryDecision::RetryAfter(self.backoff(attempt, previous_delay))
    }

    /// Delay before attempt `attempt + 1`.
    pub fn backoff(&self, attempt: u32, previous_delay: Option<Duration>) -> Duration {
        let exp = self.exponential(attempt);
        let half = exp / 2;
        let jitter_ms = half.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };

        let delay = half + jitter;
        delay.max(previous_delay.unwrap_or_default()).min(self.max_delay)
    }

    /// `base * 2^(attempt - 1)`, capped at `max_delay`.
    fn exponential(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(10)
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(2))
    }

    #[test]
    fn test_budgets_per_kind() {
        assert_eq!(RetryPolicy::for_kind(JobKind::FetchTranscript).max_attempts, 3);
        assert_eq!(RetryPolicy::for_kind(JobKind::GenerateSummary).max_attempts, 2);
        assert_eq!(RetryPolicy::for_kind(JobKind::ProcessVideo).max_attempts, 3);
        assert_eq!(RetryPolicy::for_kind(JobKind::SaveSummary).max_attempts, 1);
    }

    #[test]
    fn test_fatal_fails_immediately() {
        let error = StageError::fatal("malformed id");
        assert_eq!(policy().decide(1, error.clone(), None), RetryDecision::Fail(error));

        let config = StageError::config("no key");
        assert_eq!(policy().decide(1, config.clone(), None), RetryDecision::Fail(config));
    }

    #[test]
    fn test_transient_exhausts_budget_with_last_error() {
        let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(1));

        assert!(matches!(
            policy.decide(1, StageError::transient("t1"), None),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            policy.decide(2, StageError::transient("t2"), None),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(
            policy.decide(3, StageError::transient("t3"), None),
            RetryDecision::Fail(StageError::transient("t3"))
        );
    }

    #[test]
    fn test_backoff_within_equal_jitter_bounds() {
        let policy = policy();
        for _ in 0..50 {
            let d = policy.backoff(3, None);
            // exponential = 400ms, equal jitter = [200ms, 400ms]
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(400), "{:?}", d);
        }
    }

    #[test]
    fn test_backoff_monotone_and_bounded() {
        let policy = policy();
        for _ in 0..20 {
            let mut previous = None;
            for attempt in 1..10 {
                let d = policy.backoff(attempt, previous);
                if let Some(p) = previous {
                    assert!(d >= p, "attempt {} shrank: {:?} < {:?}", attempt, d, p);
                }
                assert!(d <= Duration::from_secs(2));
                previous = Some(d);
            }
        }
    }

    #[test]
    fn test_zero_base_delay() {
        let policy = RetryPolicy::new(3).with_base_delay(Duration::ZERO);
        assert_eq!(policy.backoff(1, None), Duration::ZERO);
    }
}
