//! The position tracking loop
//!
//! Lifecycle: `Idle → Starting → Tracking → Stopped`, restartable from `Stopped`.
//! One worker task per session persists the initial fix, then consumes watched
//! samples strictly in order. Every session carries a generation number, and
//! reports pass through a delivery gate that `stop()` waits on, so a tick that
//! finishes after `stop()` (or after a restart) is dropped instead of delivered.
//! The sink runs outside the lifecycle lock and may itself call `stop()`.

use crate::collaborators::{AlertSink, Sensor, SyncSink, WatchHandle, ZoneRegistry};
use crate::error::TrackerError;
use crate::report::{TickIssue, TickReport};
use crate::sample::{FixOptions, PositionSample};
use chrono::Utc;
use safetrip_core::config::TrackingConfig;
use safetrip_geo::evaluate;
use safetrip_telemetry::{metrics, TickTimer};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`PositionTracker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    /// Never started, or the last start failed
    Idle,
    /// Waiting for the initial fix
    Starting,
    /// Watch active; samples are being processed
    Tracking,
    /// Stopped by the caller or because the sensor ended the watch
    Stopped,
}

/// Tracker settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerOptions {
    /// Options for the initial fix and the watch
    pub fix: FixOptions,
    /// Accuracy radius above which a sample is flagged as poor signal
    pub poor_signal_threshold_m: f64,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            fix: FixOptions::default(),
            poor_signal_threshold_m: 1000.0,
        }
    }
}

impl From<&TrackingConfig> for TrackerOptions {
    fn from(config: &TrackingConfig) -> Self {
        Self {
            fix: FixOptions::from(config),
            poor_signal_threshold_m: config.poor_signal_threshold_m,
        }
    }
}

struct Lifecycle {
    state: TrackerState,
    generation: u64,
    watch: Option<WatchHandle>,
    cancel: Option<CancellationToken>,
}

struct Shared<S, P, R, A> {
    user_id: String,
    options: TrackerOptions,
    sensor: S,
    sync: P,
    registry: R,
    sink: A,
    lifecycle: Mutex<Lifecycle>,
    /// Held for the whole of a delivery
    delivery: Mutex<()>,
}

thread_local! {
    /// Tracker whose sink is running on this thread, by address; 0 when none
    static DELIVERING: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as inside a sink until dropped
struct DeliveryScope {
    previous: usize,
}

impl DeliveryScope {
    fn enter(key: usize) -> Self {
        Self {
            previous: DELIVERING.replace(key),
        }
    }

    fn is_inside(key: usize) -> bool {
        DELIVERING.get() == key
    }
}

impl Drop for DeliveryScope {
    fn drop(&mut self) {
        DELIVERING.set(self.previous);
    }
}

/// Drives geofence evaluation from a live position sensor.
///
/// Cloning yields another handle to the same tracker.
pub struct PositionTracker<S, P, R, A> {
    shared: Arc<Shared<S, P, R, A>>,
}

impl<S, P, R, A> Clone for PositionTracker<S, P, R, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, P, R, A> PositionTracker<S, P, R, A>
where
    S: Sensor,
    P: SyncSink,
    R: ZoneRegistry,
    A: AlertSink,
{
    /// Create an idle tracker for `user_id`
    pub fn new(
        user_id: impl Into<String>,
        options: TrackerOptions,
        sensor: S,
        sync: P,
        registry: R,
        sink: A,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                user_id: user_id.into(),
                options,
                sensor,
                sync,
                registry,
                sink,
                lifecycle: Mutex::new(Lifecycle {
                    state: TrackerState::Idle,
                    generation: 0,
                    watch: None,
                    cancel: None,
                }),
                delivery: Mutex::new(()),
            }),
        }
    }

    /// User whose samples and fences this tracker handles
    pub fn user_id(&self) -> &str {
        &self.shared.user_id
    }

    /// Current lifecycle state
    pub fn state(&self) -> TrackerState {
        self.shared.lock().state
    }

    /// Acquire an initial fix and begin continuous tracking.
    ///
    /// The initial fix is persisted in the background but neither evaluated
    /// nor delivered; alerts come from watched samples only. Returns that fix.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - `AlreadyRunning` while starting or tracking
    /// - `LocationUnavailable` on sensor failure, timeout or a stale fix; the
    ///   tracker returns to `Idle`
    /// - `StoppedDuringStart` if `stop()` was called before the fix arrived;
    ///   returns as soon as `stop()` lands
    pub async fn start(&self) -> Result<PositionSample, TrackerError> {
        let (generation, cancel) = {
            let mut lifecycle = self.shared.lock();
            if matches!(lifecycle.state, TrackerState::Starting | TrackerState::Tracking) {
                return Err(TrackerError::AlreadyRunning);
            }
            let cancel = CancellationToken::new();
            lifecycle.state = TrackerState::Starting;
            lifecycle.generation += 1;
            lifecycle.cancel = Some(cancel.clone());
            (lifecycle.generation, cancel)
        };

        info!(
            user_id = %self.shared.user_id,
            generation,
            timeout_ms = self.shared.options.fix.timeout.as_millis() as u64,
            "Requesting initial fix"
        );

        let acquired = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TrackerError::StoppedDuringStart),
            fix = self.shared.acquire_fix() => fix,
        };
        let fix = match acquired {
            Ok(fix) => fix,
            Err(TrackerError::StoppedDuringStart) => {
                debug!(generation, "Stopped while waiting for fix");
                return Err(TrackerError::StoppedDuringStart);
            }
            Err(e) => {
                let mut lifecycle = self.shared.lock();
                if lifecycle.generation == generation && lifecycle.state == TrackerState::Starting {
                    lifecycle.state = TrackerState::Idle;
                    lifecycle.cancel = None;
                }
                warn!(user_id = %self.shared.user_id, error = %e, "Initial fix failed");
                return Err(e);
            }
        };

        let samples = {
            let mut lifecycle = self.shared.lock();
            if lifecycle.generation != generation || lifecycle.state != TrackerState::Starting {
                debug!(generation, "Start superseded while waiting for fix");
                return Err(TrackerError::StoppedDuringStart);
            }

            let watch = match self.shared.sensor.watch(&self.shared.options.fix) {
                Ok(watch) => watch,
                Err(e) => {
                    lifecycle.state = TrackerState::Idle;
                    lifecycle.cancel = None;
                    warn!(user_id = %self.shared.user_id, error = %e, "Watch registration failed");
                    return Err(TrackerError::LocationUnavailable(e.to_string()));
                }
            };

            lifecycle.state = TrackerState::Tracking;
            lifecycle.watch = Some(watch.handle);
            watch.samples
        };

        info!(
            user_id = %self.shared.user_id,
            generation,
            position = %fix.coordinate,
            "Tracking started"
        );

        let shared = Arc::clone(&self.shared);
        tokio::spawn(run_session(shared, generation, fix.clone(), samples, cancel));

        Ok(fix)
    }

    /// Stop tracking and cancel the sensor watch.
    ///
    /// After this returns the alert sink receives no further reports, even for
    /// samples already being processed. A delivery already inside the sink is
    /// waited for, unless `stop()` is called from that sink. Returns the state
    /// before the call. Stopping an idle or stopped tracker does nothing.
    pub fn stop(&self) -> TrackerState {
        let previous = {
            let mut lifecycle = self.shared.lock();
            let previous = lifecycle.state;
            if matches!(previous, TrackerState::Idle | TrackerState::Stopped) {
                return previous;
            }

            lifecycle.state = TrackerState::Stopped;
            if let Some(handle) = lifecycle.watch.take() {
                self.shared.sensor.cancel_watch(handle);
            }
            if let Some(cancel) = lifecycle.cancel.take() {
                cancel.cancel();
            }
            previous
        };

        if !DeliveryScope::is_inside(self.shared.key()) {
            drop(self.shared.gate());
        }

        info!(user_id = %self.shared.user_id, from = ?previous, "Tracking stopped");
        previous
    }
}

impl<S, P, R, A> Shared<S, P, R, A>
where
    S: Sensor,
    P: SyncSink,
    R: ZoneRegistry,
    A: AlertSink,
{
    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        // Lifecycle is updated in single assignments, so a poisoned lock is still consistent
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.delivery
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn key(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }

    async fn acquire_fix(&self) -> Result<PositionSample, TrackerError> {
        let options = &self.options.fix;

        let fix = tokio::time::timeout(options.timeout, self.sensor.current_fix(options))
            .await
            .map_err(|_| {
                TrackerError::LocationUnavailable(format!(
                    "no fix within {}s",
                    options.timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| TrackerError::LocationUnavailable(e.to_string()))?;

        let age = fix.age_at(Utc::now());
        if age > options.max_age {
            return Err(TrackerError::LocationUnavailable(format!(
                "fix is {}s old (limit {}s)",
                age.as_secs(),
                options.max_age.as_secs()
            )));
        }

        fix.coordinate
            .validate()
            .map_err(|e| TrackerError::LocationUnavailable(e.to_string()))?;

        Ok(fix)
    }

    /// Store the initial fix. Failures are logged and counted, nothing is delivered.
    async fn persist_initial(&self, fix: &PositionSample) {
        match self.sync.persist(&self.user_id, fix).await {
            Ok(()) => debug!(user_id = %self.user_id, position = %fix.coordinate, "Initial fix persisted"),
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Initial fix not persisted");
                metrics().record_persistence_failure();
            }
        }
    }

    /// Persist, fetch fences, evaluate. Never fails; problems go into the report.
    async fn run_tick(&self, sample: PositionSample) -> TickReport {
        if let Err(e) = sample.coordinate.validate() {
            warn!(user_id = %self.user_id, error = %e, "Discarding invalid sample");
            metrics().record_invalid_sample();
            let mut report = TickReport::new(sample);
            report.issues.push(TickIssue::InvalidSample(e));
            return report;
        }

        let mut issues = Vec::new();
        if sample.accuracy_meters > self.options.poor_signal_threshold_m {
            debug!(accuracy_m = sample.accuracy_meters, "Poor signal");
            issues.push(TickIssue::PoorSignal {
                accuracy_meters: sample.accuracy_meters,
            });
        }

        let (persisted, fences) = tokio::join!(
            self.sync.persist(&self.user_id, &sample),
            self.registry.active_fences(&self.user_id),
        );

        if let Err(e) = persisted {
            warn!(user_id = %self.user_id, error = %e, "Sample not persisted");
            metrics().record_persistence_failure();
            issues.push(TickIssue::Persistence(e));
        }

        let mut alerts = Vec::new();
        let mut fences_checked = 0;
        let mut evaluated = false;
        match fences {
            Ok(fences) => match evaluate(&sample.coordinate, &fences) {
                Ok(found) => {
                    alerts = found;
                    fences_checked = fences.iter().filter(|f| f.active).count();
                    evaluated = true;
                }
                Err(e) => {
                    warn!(user_id = %self.user_id, error = %e, "Geofence evaluation aborted");
                    issues.push(TickIssue::Evaluation(e));
                }
            },
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Skipping evaluation, fences unavailable");
                metrics().record_registry_failure();
                issues.push(TickIssue::Registry(e));
            }
        }

        TickReport {
            sample,
            alerts,
            fences_checked,
            evaluated,
            issues,
        }
    }

    /// Deliver `report` if the session is still current. Returns false once the
    /// session is over.
    fn deliver(&self, generation: u64, report: TickReport, timer: TickTimer) -> bool {
        let _gate = self.gate();
        let current = {
            let lifecycle = self.lock();
            lifecycle.generation == generation && lifecycle.state == TrackerState::Tracking
        };
        if !current {
            debug!(generation, "Dropping report from a finished session");
            metrics().record_discarded();
            return false;
        }

        let alerts = report.alerts.len();
        debug!(
            user_id = %self.user_id,
            alerts,
            fences = report.fences_checked,
            issues = report.issues.len(),
            "Delivering tick"
        );
        {
            let _scope = DeliveryScope::enter(self.key());
            self.sink.deliver(report);
        }
        timer.finish(alerts);
        true
    }

    /// The sensor closed the watch on its own; the session ends
    fn finish_session(&self, generation: u64) {
        let mut lifecycle = self.lock();
        if lifecycle.generation == generation && lifecycle.state == TrackerState::Tracking {
            lifecycle.state = TrackerState::Stopped;
            lifecycle.watch = None;
            lifecycle.cancel = None;
            info!(user_id = %self.user_id, "Sensor ended the watch, tracking stopped");
        }
    }
}

async fn run_session<S, P, R, A>(
    shared: Arc<Shared<S, P, R, A>>,
    generation: u64,
    initial: PositionSample,
    mut samples: mpsc::UnboundedReceiver<PositionSample>,
    cancel: CancellationToken,
) where
    S: Sensor,
    P: SyncSink,
    R: ZoneRegistry,
    A: AlertSink,
{
    shared.persist_initial(&initial).await;

    loop {
        let sample = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = samples.recv() => match received {
                Some(sample) => sample,
                None => {
                    shared.finish_session(generation);
                    break;
                }
            },
        };

        // An accepted sample runs to completion so its persistence is not cut
        // short; delivery re-checks the session afterwards.
        let timer = TickTimer::start();
        let report = shared.run_tick(sample).await;
        if !shared.deliver(generation, report, timer) {
            break;
        }
    }

    debug!(generation, "Tracking session worker exited");
}
