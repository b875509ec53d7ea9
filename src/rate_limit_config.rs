use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed-window throttle parameters with a penalty box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleSettings {
    /// Maximum hits allowed inside one window
    pub limit: u32,
    /// Window length
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// How long a key stays blocked after exceeding `limit`
    #[serde(with = "humantime_serde")]
    pub penalty: Duration,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            limit: 10,
            window: Duration::from_millis(60_000),
            penalty: Duration::from_millis(10_000),
        }
    }
}

impl ThrottleSettings {
    pub fn new(limit: u32, window_ms: u64, penalty_ms: u64) -> Self {
        Self {
            limit,
            window: Duration::from_millis(window_ms),
            penalty: Duration::from_millis(penalty_ms),
        }
    }

    /// Validate rule parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err("THROTTLE_LIMIT must be greater than 0".to_string());
        }
        if self.window.is_zero() {
            return Err("THROTTLE_TTL must be greater than 0".to_string());
        }
        Ok(())
    }
}
