use std::time::Duration;

use packetflow_core::api::{RetryConfig, RetryStrategyPlugin};

pub struct ExponentialBackoffPlugin {
    config: RetryConfig,
    max_attempts: u32,
}

pub struct LinearRetryPlugin {
    config: RetryConfig,
    max_attempts: u32,
}

impl ExponentialBackoffPlugin {
    pub fn new(config: RetryConfig, max_attempts: u32) -> Self {
        Self {
            config,
            max_attempts,
        }
    }
}

impl LinearRetryPlugin {
    pub fn new(config: RetryConfig, max_attempts: u32) -> Self {
        Self {
            config,
            max_attempts,
        }
    }
}

/// Reasons no amount of retrying fixes.
fn is_config_failure(reason: &str) -> bool {
    reason.contains("is not configured") || reason.contains("failed to spawn")
}

impl RetryStrategyPlugin for ExponentialBackoffPlugin {
    fn name(&self) -> &str {
        "exponential-backoff"
    }

    fn next_delay(&self, attempt: u32, _reason: &str) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let exp = 1u64 << attempt.saturating_sub(1).min(30);
        let delay = self.config.base_delay_ms.saturating_mul(exp);
        Some(Duration::from_millis(delay.min(self.config.max_delay_ms)))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn is_fatal(&self, reason: &str) -> bool {
        is_config_failure(reason)
    }
}

impl RetryStrategyPlugin for LinearRetryPlugin {
    fn name(&self) -> &str {
        "linear"
    }

    fn next_delay(&self, attempt: u32, _reason: &str) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let delay = self.config.base_delay_ms.saturating_mul(attempt as u64);
        Some(Duration::from_millis(delay.min(self.config.max_delay_ms)))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn is_fatal(&self, reason: &str) -> bool {
        is_config_failure(reason)
    }
}
