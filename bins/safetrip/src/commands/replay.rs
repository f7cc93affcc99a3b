//! Replay command
//!
//! Feeds a recorded track through the live tracking loop. The first point is
//! the initial fix, and the sensor watch then plays the whole track, one point
//! per interval, so every point yields one report.

use super::backend;
use crate::input::{load_fences, load_track, LOCAL_USER};
use crate::output::{format_count, print_tick, Status, TickLine};
use crate::OutputFormat;
use anyhow::Result;
use owo_colors::OwoColorize;
use safetrip_api_client::SupabaseSync;
use safetrip_core::config::TrackingConfig;
use safetrip_tracker::{
    LoggingSync, PositionTracker, ReplaySensor, StaticRegistry, SyncSink, TickReport, TrackerError,
    TrackerOptions, TrackerState, ZoneRegistry,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// How often the wait loop checks whether the session ended on its own
const STATE_POLL: Duration = Duration::from_millis(100);

/// Replay options
pub struct ReplayArgs {
    pub track: PathBuf,
    pub fences: Option<PathBuf>,
    pub user: Option<String>,
    pub interval_ms: u64,
    pub sync: bool,
    pub trip: Option<String>,
    pub verbose: bool,
}

/// Run the replay and print one report per sample
pub async fn run(args: ReplayArgs, tracking: &TrackingConfig, format: OutputFormat) -> Result<()> {
    let samples = load_track(&args.track)?;
    let user = args.user.clone().unwrap_or_else(|| LOCAL_USER.to_string());
    let options = TrackerOptions::from(tracking);
    let sensor = ReplaySensor::new(samples, Duration::from_millis(args.interval_ms));

    let remote = if args.sync || args.fences.is_none() {
        let mut sync = SupabaseSync::new(backend()?);
        if let Some(trip) = &args.trip {
            sync = sync.with_trip(trip.clone());
        }
        Some(sync)
    } else {
        None
    };

    let local_fences = match &args.fences {
        Some(path) => Some(StaticRegistry::new(load_fences(path, &user)?)),
        None => None,
    };

    // Pick collaborators; each combination is its own tracker type
    match (args.sync, local_fences, remote) {
        (true, Some(registry), Some(sync)) => {
            drive(&user, options, sensor, sync, registry, format, args.verbose).await
        }
        (false, Some(registry), _) => {
            drive(&user, options, sensor, LoggingSync, registry, format, args.verbose).await
        }
        (true, None, Some(remote)) => {
            drive(&user, options, sensor, remote.clone(), remote, format, args.verbose).await
        }
        (false, None, Some(remote)) => {
            drive(&user, options, sensor, LoggingSync, remote, format, args.verbose).await
        }
        (_, None, None) => anyhow::bail!("either --fences or --user is required"),
        (true, Some(_), None) => anyhow::bail!("--sync needs backend access"),
    }
}

async fn drive<P, R>(
    user: &str,
    options: TrackerOptions,
    sensor: ReplaySensor,
    sync: P,
    registry: R,
    format: OutputFormat,
    verbose: bool,
) -> Result<()>
where
    P: SyncSink,
    R: ZoneRegistry,
{
    let expected = sensor.len();
    let (tx, mut rx) = mpsc::unbounded_channel::<TickReport>();
    let sink = move |report: TickReport| {
        // The receiver outlives the tracker session, so a send only fails during shutdown
        let _ = tx.send(report);
    };

    let tracker = PositionTracker::new(user, options, sensor, sync, registry, sink);

    if format == OutputFormat::Text {
        Status::header(&format!(
            "Replaying {} for {user}",
            format_count(expected, "sample", "samples")
        ));
    }

    if let Err(e) = tracker.start().await {
        return Err(tracker_error(e).into());
    }

    let mut received = 0usize;
    let mut alerts = 0usize;
    let mut degraded = 0usize;
    let mut poll = tokio::time::interval(STATE_POLL);

    while received < expected {
        tokio::select! {
            report = rx.recv() => {
                let Some(report) = report else { break };
                received += 1;
                alerts += report.alerts.len();
                if report.is_degraded() {
                    degraded += 1;
                }
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string(&TickLine::new(received, &report))?),
                    OutputFormat::Text => print_tick(received, &report),
                }
            }
            _ = poll.tick() => {
                if tracker.state() == TrackerState::Stopped && rx.is_empty() {
                    tracing::debug!(received, expected, "Session ended before all samples were reported");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                Status::warning("Interrupted");
                break;
            }
        }
    }

    tracker.stop();

    if format == OutputFormat::Text {
        println!();
        let line = format!(
            "{} processed, {}",
            format_count(received, "sample", "samples"),
            format_count(alerts, "alert", "alerts")
        );
        if degraded == 0 {
            Status::success(&line);
        } else {
            Status::warning(&format!("{line}, {degraded} degraded"));
        }
        if verbose {
            let snapshot = safetrip_telemetry::metrics().snapshot();
            println!(
                "{}",
                format!(
                    "tick latency p50 {:.1} ms, p95 {:.1} ms, max {:.1} ms",
                    snapshot.tick_latency_ms.p50,
                    snapshot.tick_latency_ms.p95,
                    snapshot.tick_latency_ms.max
                )
                .dimmed()
            );
        }
    }

    Ok(())
}

fn tracker_error(e: TrackerError) -> safetrip_core::Error {
    match e {
        TrackerError::LocationUnavailable(msg) => safetrip_core::Error::location_unavailable(msg),
        TrackerError::AlreadyRunning | TrackerError::StoppedDuringStart => {
            safetrip_core::Error::new(safetrip_core::ErrorCode::TrackerBusy, e.to_string())
        }
    }
}
