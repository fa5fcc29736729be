use crate::retry::Retrier;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry backoff parameters, suitable for embedding in an application's
/// config file (e.g. a `[retry]` table in TOML).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Initial backoff ceiling in seconds (e.g. 0.25 = 250ms).
    pub initial_delay_secs: f64,
    /// Maximum backoff ceiling in seconds.
    pub max_delay_secs: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 1.0,
            max_delay_secs: 30.0,
        }
    }
}

impl BackoffConfig {
    /// Build the retrier these settings describe. Negative, zero or NaN
    /// seconds count as zero and are then clamped by [`Retrier::new`].
    pub fn retrier(&self) -> Retrier {
        Retrier::new(
            secs_to_duration(self.initial_delay_secs),
            secs_to_duration(self.max_delay_secs),
        )
    }
}

impl From<BackoffConfig> for Retrier {
    fn from(cfg: BackoffConfig) -> Self {
        cfg.retrier()
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
