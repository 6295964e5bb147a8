use std::time::Duration;

use crate::config::RetryConfig;

/// Retry budget and the two backoff regimes applied by the fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub rate_limit_cooldown: Duration,
    pub transport_retry_delay: Duration,
    pub backoff_unit: Duration,
    /// Session renewals allowed within one logical fetch.
    pub max_renewals: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            rate_limit_cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
            transport_retry_delay: Duration::from_secs(config.transport_retry_delay_secs),
            backoff_unit: Duration::from_millis(config.backoff_unit_millis),
            max_renewals: config.max_renewals,
        }
    }

    /// `(2^attempt + jitter)` backoff units, with `attempt` counted from zero.
    pub fn backoff_delay(&self, attempt: u32, jitter: f64) -> Duration {
        let factor = 2f64.powi(attempt as i32) + jitter.clamp(0.0, 1.0);
        self.backoff_unit.mul_f64(factor)
    }

    /// Cooldown followed by a jittered exponential delay, applied after an access restriction.
    pub fn rate_limit_delays(&self, attempt: u32) -> (Duration, Duration) {
        let jitter: f64 = rand::random();
        (self.rate_limit_cooldown, self.backoff_delay(attempt, jitter))
    }

    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff_delay(0, 0.0), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(1, 0.0), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2, 0.5), Duration::from_millis(4_500));
    }

    #[test]
    fn jitter_stays_within_one_unit() {
        let policy = RetryPolicy::default();
        for attempt in 0..3 {
            let (cooldown, backoff) = policy.rate_limit_delays(attempt);
            let base = Duration::from_secs(1 << attempt);

            assert_eq!(cooldown, Duration::from_secs(60));
            assert!(backoff >= base, "{backoff:?} shorter than {base:?}");
            assert!(backoff <= base + Duration::from_secs(1));
        }
    }

    #[test]
    fn budget_counts_remaining_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.has_attempts_after(0));
        assert!(policy.has_attempts_after(1));
        assert!(!policy.has_attempts_after(2));
    }
}
