use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::retry::RetryPolicy;

/// Validated configuration for every tunable surface of the engine.
///
/// There is deliberately no loader here (no file, env, or flag parsing) —
/// callers deserialize a `Config` from whatever source they like via `serde`
/// and call [`Config::validate`] before handing it to [`crate::engine::Engine::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chunk_size: usize,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,

    pub max_concurrent_transfers: usize,
    pub max_concurrent_chunks: usize,

    pub buffer_size: usize,
    #[serde(with = "duration_secs")]
    pub rate_calculation_window: Duration,

    pub default_retry_policy: RetryPolicy,

    pub history_retention_days: u32,
    pub max_history_records: usize,

    pub event_buffer_size: usize,
    #[serde(with = "duration_secs")]
    pub event_delivery_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            min_chunk_size: 4 * 1024,
            max_chunk_size: 256 * 1024,
            max_concurrent_transfers: 1,
            max_concurrent_chunks: num_cpus::get(),
            buffer_size: 64 * 1024,
            rate_calculation_window: Duration::from_secs(5),
            default_retry_policy: RetryPolicy::default(),
            history_retention_days: 1,
            max_history_records: 10,
            event_buffer_size: 256,
            event_delivery_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.min_chunk_size == 0 {
            return Err(EngineError::InvalidConfiguration(
                "min_chunk_size must be greater than zero".into(),
            ));
        }
        if self.min_chunk_size > self.max_chunk_size {
            return Err(EngineError::InvalidConfiguration(
                "min_chunk_size must not exceed max_chunk_size".into(),
            ));
        }
        if self.chunk_size < self.min_chunk_size || self.chunk_size > self.max_chunk_size {
            return Err(EngineError::InvalidConfiguration(format!(
                "chunk_size {} must fall within [{}, {}]",
                self.chunk_size, self.min_chunk_size, self.max_chunk_size
            )));
        }
        if self.max_concurrent_transfers == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_concurrent_transfers must be greater than zero".into(),
            ));
        }
        if self.max_concurrent_chunks == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_concurrent_chunks must be greater than zero".into(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(EngineError::InvalidConfiguration(
                "buffer_size must be greater than zero".into(),
            ));
        }
        if self.event_buffer_size == 0 {
            return Err(EngineError::InvalidConfiguration(
                "event_buffer_size must be greater than zero".into(),
            ));
        }
        self.default_retry_policy.validate()?;
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_chunk_size_outside_bounds() {
        let mut cfg = Config::default();
        cfg.chunk_size = 1024;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_min_max() {
        let mut cfg = Config::default();
        cfg.min_chunk_size = 300 * 1024;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut cfg = Config::default();
        cfg.max_concurrent_transfers = 0;
        assert!(cfg.validate().is_err());
    }
}
