use std::time::Duration;

use rand::Rng;

/// Tunables for the engine. The server fills these from the environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub trending_window_days: u32,
    pub trending_limit: u32,
    pub reconcile_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 50,
            trending_window_days: 7,
            trending_limit: 5,
            reconcile_interval: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }
}

/// Backoff for deferred counter adjustments.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Exponential delay before `attempt` (1-based), capped, plus up to half
    /// the base delay of jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exp.min(self.max_delay);

        let jitter_ms = (self.base_delay.as_millis() / 2) as u64;
        if jitter_ms == 0 {
            return capped;
        }
        capped + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}
