use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Retry policy: `initialDelay * backoffFactor^retryCount`, capped at `maxDelay`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(with = "duration_millis")]
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.backoff_factor <= 1.0 {
            return Err(EngineError::InvalidConfiguration(
                "backoff_factor must be greater than 1.0".into(),
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(EngineError::InvalidConfiguration(
                "initial_delay must not exceed max_delay".into(),
            ));
        }
        Ok(())
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Snapshot of the scheduler's pending work, returned by `statistics()`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetryStatistics {
    pub scheduled: usize,
    pub pending: usize,
    pub overdue: usize,
    pub max_retry_count: u32,
    pub total_retry_count: u32,
    pub average_retry_count: f64,
}
