//! Logging and tracker metrics for the SafeTrip tools
//!
//! - Structured logging through `tracing`, compact or JSON
//! - A process-wide session id for correlating log lines
//! - Counters and a latency summary for the tracking loop

use once_cell::sync::Lazy;
use safetrip_core::config::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

static METRICS: Lazy<TrackerMetrics> = Lazy::new(TrackerMetrics::new);

static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Latency samples kept for the summary; older ones are dropped first
const LATENCY_WINDOW: usize = 512;

/// Initialize logging with default settings
pub fn init() -> anyhow::Result<()> {
    init_with_config(TelemetryConfig::default())
}

/// Initialize logging. `RUST_LOG` takes precedence over the configured level.
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Logs go to stderr so command output on stdout stays parseable
    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(config.show_target)
                    .with_current_span(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(config.show_target)
                    .with_thread_ids(config.show_thread_ids),
            )
            .try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    tracing::debug!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}

/// Get the current session ID
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json: bool,
    pub show_target: bool,
    pub show_thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            show_target: false,
            show_thread_ids: false,
        }
    }
}

impl From<&LoggingConfig> for TelemetryConfig {
    fn from(logging: &LoggingConfig) -> Self {
        Self {
            log_level: logging.level.clone(),
            json: logging.json,
            ..Self::default()
        }
    }
}

/// Counters for the position tracking loop
pub struct TrackerMetrics {
    ticks: AtomicU64,
    alerts: AtomicU64,
    persistence_failures: AtomicU64,
    registry_failures: AtomicU64,
    invalid_samples: AtomicU64,
    discarded_after_stop: AtomicU64,
    tick_latencies_ms: Mutex<VecDeque<f64>>,
    started: Instant,
}

impl TrackerMetrics {
    fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
            registry_failures: AtomicU64::new(0),
            invalid_samples: AtomicU64::new(0),
            discarded_after_stop: AtomicU64::new(0),
            tick_latencies_ms: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW)),
            started: Instant::now(),
        }
    }

    /// Record a delivered tick and how many alerts it carried
    pub fn record_tick(&self, alerts: usize, latency: Duration) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.alerts.fetch_add(alerts as u64, Ordering::Relaxed);

        let mut window = self
            .tick_latencies_ms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if window.len() == LATENCY_WINDOW {
            window.pop_front();
        }
        window.push_back(latency.as_secs_f64() * 1000.0);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_registry_failure(&self) {
        self.registry_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_sample(&self) {
        self.invalid_samples.fetch_add(1, Ordering::Relaxed);
    }

    /// A tick finished after `stop()` and its report was dropped
    pub fn record_discarded(&self) {
        self.discarded_after_stop.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let latencies: Vec<f64> = self
            .tick_latencies_ms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .copied()
            .collect();

        MetricsSnapshot {
            session_id: session_id().to_string(),
            uptime_secs: self.started.elapsed().as_secs(),
            ticks: self.ticks.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            registry_failures: self.registry_failures.load(Ordering::Relaxed),
            invalid_samples: self.invalid_samples.load(Ordering::Relaxed),
            discarded_after_stop: self.discarded_after_stop.load(Ordering::Relaxed),
            tick_latency_ms: LatencySummary::from_values(&latencies),
        }
    }

    /// Export metrics as JSON
    pub fn export_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

/// Serializable copy of [`TrackerMetrics`]
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub session_id: String,
    pub uptime_secs: u64,
    pub ticks: u64,
    pub alerts: u64,
    pub persistence_failures: u64,
    pub registry_failures: u64,
    pub invalid_samples: u64,
    pub discarded_after_stop: u64,
    pub tick_latency_ms: LatencySummary,
}

/// Latency summary over the recent window
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
}

impl LatencySummary {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();

        Self {
            count,
            mean: sorted.iter().sum::<f64>() / count as f64,
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
            max: sorted[count - 1],
        }
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Get the global tracker metrics
pub fn metrics() -> &'static TrackerMetrics {
    &METRICS
}

/// Measures one tick from sample arrival to delivery
pub struct TickTimer {
    start: Instant,
}

impl TickTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Record the tick as delivered with `alerts` alerts
    pub fn finish(self, alerts: usize) -> Duration {
        let elapsed = self.start.elapsed();
        metrics().record_tick(alerts, elapsed);
        tracing::trace!(elapsed_ms = elapsed.as_millis() as u64, alerts, "Tick completed");
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_counters() {
        let m = TrackerMetrics::new();
        m.record_tick(2, Duration::from_millis(5));
        m.record_tick(0, Duration::from_millis(15));
        m.record_persistence_failure();
        m.record_discarded();

        let snap = m.snapshot();
        assert_eq!(snap.ticks, 2);
        assert_eq!(snap.alerts, 2);
        assert_eq!(snap.persistence_failures, 1);
        assert_eq!(snap.registry_failures, 0);
        assert_eq!(snap.discarded_after_stop, 1);
        assert_eq!(snap.tick_latency_ms.count, 2);
        assert_eq!(snap.tick_latency_ms.max, 15.0);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let m = TrackerMetrics::new();
        for i in 0..(LATENCY_WINDOW + 10) {
            m.record_tick(0, Duration::from_millis(i as u64));
        }
        let snap = m.snapshot();
        assert_eq!(snap.ticks, (LATENCY_WINDOW + 10) as u64);
        assert_eq!(snap.tick_latency_ms.count, LATENCY_WINDOW);
    }

    #[test]
    fn test_latency_window_evicts_oldest() {
        let m = TrackerMetrics::new();
        for i in 0..(LATENCY_WINDOW + 10) {
            m.record_tick(0, Duration::from_millis(i as u64));
        }

        // 0..10 ms fell out; 10..LATENCY_WINDOW+10 ms remain
        let latency = m.snapshot().tick_latency_ms;
        let expected_mean = (LATENCY_WINDOW as f64 + 19.0) / 2.0;
        assert!((latency.mean - expected_mean).abs() < 1e-6);
        assert!((latency.max - (LATENCY_WINDOW + 9) as f64).abs() < 1e-6);
    }

    #[test]
    fn test_latency_summary() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let summary = LatencySummary::from_values(&values);

        assert_eq!(summary.count, 10);
        assert_eq!(summary.max, 10.0);
        assert_eq!(summary.mean, 5.5);
        assert_eq!(LatencySummary::from_values(&[]).count, 0);
    }

    #[test]
    fn test_config_from_logging_section() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            json: true,
        };
        let config = TelemetryConfig::from(&logging);
        assert_eq!(config.log_level, "debug");
        assert!(config.json);
    }

    #[test]
    fn test_export_json_has_session() {
        let json = metrics().export_json();
        assert_eq!(json["session_id"], session_id());
        assert!(Uuid::parse_str(session_id()).is_ok());
    }
}
