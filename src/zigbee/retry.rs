//! Retry policy for failed network formation and steering.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay schedule for commissioning retries.
///
/// The default retries every 1000 ms forever with no backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub delay_ms: u64,
    /// `None` retries until success or restart.
    pub max_attempts: Option<u32>,
    /// Multiplier applied per failed attempt; 1.0 keeps the delay fixed.
    pub backoff_factor: f64,
    pub max_delay_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay_ms: delay.as_millis() as u64,
            max_attempts: None,
            backoff_factor: 1.0,
            max_delay_ms: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, factor: f64, max_delay: Duration) -> Self {
        self.backoff_factor = factor;
        self.max_delay_ms = Some(max_delay.as_millis() as u64);
        self
    }

    /// Delay before retry number `attempt` (1-based), or `None` once the
    /// attempt budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return None;
        }
        if let Some(max) = self.max_attempts
            && attempt > max
        {
            return None;
        }

        let factor = self.backoff_factor.max(1.0).powi(attempt as i32 - 1);
        let mut delay_ms = (self.delay_ms as f64 * factor).round() as u64;
        if let Some(cap) = self.max_delay_ms {
            delay_ms = delay_ms.min(cap);
        }
        Some(Duration::from_millis(delay_ms))
    }
}
