//! Position samples and sensor request options

use chrono::{DateTime, Utc};
use safetrip_core::config::TrackingConfig;
use safetrip_geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One reading from the positioning sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Reported position
    pub coordinate: Coordinate,
    /// Radius of uncertainty in meters
    pub accuracy_meters: f64,
    /// When the sensor took the reading
    pub captured_at: DateTime<Utc>,
}

impl PositionSample {
    /// Creates a sample with an explicit capture time
    pub fn new(coordinate: Coordinate, accuracy_meters: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            accuracy_meters,
            captured_at,
        }
    }

    /// Creates a sample captured now
    pub fn now(coordinate: Coordinate, accuracy_meters: f64) -> Self {
        Self::new(coordinate, accuracy_meters, Utc::now())
    }

    /// Age of the reading at `now`. Readings stamped in the future have age zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.captured_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// How the sensor should produce a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixOptions {
    /// Prefer GPS-grade accuracy over battery life
    pub high_accuracy: bool,
    /// Upper bound on waiting for one fix
    pub timeout: Duration,
    /// Oldest cached fix the sensor may hand back
    pub max_age: Duration,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_age: Duration::from_secs(60),
        }
    }
}

impl From<&TrackingConfig> for FixOptions {
    fn from(config: &TrackingConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: config.fix_timeout(),
            max_age: config.max_fix_age(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age() {
        let now = Utc::now();
        let sample = PositionSample::new(
            Coordinate::new(0.0, 0.0),
            5.0,
            now - chrono::Duration::seconds(90),
        );
        assert_eq!(sample.age_at(now), Duration::from_secs(90));
    }

    #[test]
    fn test_future_timestamp_has_zero_age() {
        let now = Utc::now();
        let sample =
            PositionSample::new(Coordinate::new(0.0, 0.0), 5.0, now + chrono::Duration::seconds(5));
        assert_eq!(sample.age_at(now), Duration::ZERO);
    }

    #[test]
    fn test_fix_options_from_config() {
        let config = TrackingConfig {
            fix_timeout_secs: 4,
            max_fix_age_secs: 30,
            high_accuracy: false,
            ..TrackingConfig::default()
        };
        let options = FixOptions::from(&config);
        assert_eq!(options.timeout, Duration::from_secs(4));
        assert_eq!(options.max_age, Duration::from_secs(30));
        assert!(!options.high_accuracy);
    }

    #[test]
    fn test_sample_json_round_trip_keeps_timestamp() {
        let sample = PositionSample::now(Coordinate::new(48.8566, 2.3522), 12.5);
        let json = serde_json::to_string(&sample).unwrap();
        let back: PositionSample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
