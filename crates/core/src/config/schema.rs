//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Position tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// How long `start` waits for the initial fix
    #[serde(default = "default_fix_timeout_secs")]
    pub fix_timeout_secs: u64,

    /// Oldest acceptable initial fix
    #[serde(default = "default_max_fix_age_secs")]
    pub max_fix_age_secs: u64,

    /// Ask the sensor for its most accurate mode
    #[serde(default = "default_true")]
    pub high_accuracy: bool,

    /// Samples with a worse accuracy radius are flagged as poor signal
    #[serde(default = "default_poor_signal_threshold_m")]
    pub poor_signal_threshold_m: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            fix_timeout_secs: default_fix_timeout_secs(),
            max_fix_age_secs: default_max_fix_age_secs(),
            high_accuracy: true,
            poor_signal_threshold_m: default_poor_signal_threshold_m(),
        }
    }
}

impl TrackingConfig {
    pub fn fix_timeout(&self) -> Duration {
        Duration::from_secs(self.fix_timeout_secs)
    }

    pub fn max_fix_age(&self) -> Duration {
        Duration::from_secs(self.max_fix_age_secs)
    }
}

fn default_fix_timeout_secs() -> u64 {
    10
}

fn default_max_fix_age_secs() -> u64 {
    60
}

fn default_poor_signal_threshold_m() -> f64 {
    1000.0
}

fn default_true() -> bool {
    true
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
