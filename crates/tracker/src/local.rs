//! In-process collaborators
//!
//! [`ChannelSensor`] lets host code push positions it receives from the
//! platform. [`ReplaySensor`] plays back a recorded track. [`StaticRegistry`] and
//! [`LoggingSync`] cover running without a backend.

use crate::collaborators::{Sensor, SyncSink, Watch, WatchHandle, ZoneRegistry};
use crate::error::{PersistenceError, RegistryError, SensorError};
use crate::sample::{FixOptions, PositionSample};
use chrono::Utc;
use safetrip_geo::Geofence;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Default)]
struct FeedState {
    latest: Option<PositionSample>,
    subscriber: Option<(WatchHandle, mpsc::UnboundedSender<PositionSample>)>,
    next_handle: u64,
}

struct FeedShared {
    state: Mutex<FeedState>,
    arrived: Notify,
}

impl FeedShared {
    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Sensor fed by host code through a [`SensorFeed`].
///
/// `current_fix` returns the latest pushed sample, waiting for one if nothing
/// has been pushed yet. Only one watch is live at a time; a new watch replaces
/// the previous one.
pub struct ChannelSensor {
    shared: Arc<FeedShared>,
}

/// Producer half of a [`ChannelSensor`]
#[derive(Clone)]
pub struct SensorFeed {
    shared: Arc<FeedShared>,
}

impl ChannelSensor {
    /// Create a sensor and the feed that drives it
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Self, SensorFeed) {
        let shared = Arc::new(FeedShared {
            state: Mutex::new(FeedState::default()),
            arrived: Notify::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            SensorFeed { shared },
        )
    }
}

impl SensorFeed {
    /// Publish a new reading
    pub fn push(&self, sample: PositionSample) {
        {
            let mut state = self.shared.lock();
            if let Some((_, tx)) = &state.subscriber {
                if tx.send(sample.clone()).is_err() {
                    state.subscriber = None;
                }
            }
            state.latest = Some(sample);
        }
        self.shared.arrived.notify_waiters();
    }

    /// Whether a watch is currently registered
    pub fn is_watched(&self) -> bool {
        self.shared.lock().subscriber.is_some()
    }
}

impl Sensor for ChannelSensor {
    async fn current_fix(&self, _options: &FixOptions) -> Result<PositionSample, SensorError> {
        loop {
            let arrived = self.shared.arrived.notified();
            if let Some(sample) = self.shared.lock().latest.clone() {
                return Ok(sample);
            }
            arrived.await;
        }
    }

    fn watch(&self, _options: &FixOptions) -> Result<Watch, SensorError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.shared.lock();
        state.next_handle += 1;
        let handle = WatchHandle(state.next_handle);
        state.subscriber = Some((handle, tx));
        Ok(Watch {
            handle,
            samples: rx,
        })
    }

    fn cancel_watch(&self, handle: WatchHandle) {
        let mut state = self.shared.lock();
        if matches!(&state.subscriber, Some((current, _)) if *current == handle) {
            state.subscriber = None;
        }
    }
}

/// Plays back a recorded track.
///
/// The first sample doubles as the initial fix. The watch emits the whole
/// track, the first sample right away and the rest one per `interval`, the way
/// a platform watch reports the current position as soon as it is registered.
/// Capture times are restamped at emission so the fix is never stale. Must be
/// used inside a Tokio runtime.
pub struct ReplaySensor {
    samples: Vec<PositionSample>,
    interval: Duration,
    active: Mutex<Option<(WatchHandle, CancellationToken)>>,
    next_handle: Mutex<u64>,
}

impl ReplaySensor {
    /// Create a replay of `samples`, emitting one every `interval`
    pub fn new(samples: Vec<PositionSample>, interval: Duration) -> Self {
        Self {
            samples,
            interval,
            active: Mutex::new(None),
            next_handle: Mutex::new(0),
        }
    }

    /// Number of samples in the track
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the track has no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn restamped(sample: &PositionSample) -> PositionSample {
        PositionSample::new(sample.coordinate, sample.accuracy_meters, Utc::now())
    }
}

impl Sensor for ReplaySensor {
    async fn current_fix(&self, _options: &FixOptions) -> Result<PositionSample, SensorError> {
        self.samples
            .first()
            .map(Self::restamped)
            .ok_or_else(|| SensorError::Unavailable("track is empty".into()))
    }

    fn watch(&self, _options: &FixOptions) -> Result<Watch, SensorError> {
        let handle = {
            let mut next = self
                .next_handle
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *next += 1;
            WatchHandle(*next)
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let track = self.samples.clone();
        let interval = self.interval;
        let token = cancel.clone();

        tokio::spawn(async move {
            for (index, sample) in track.into_iter().enumerate() {
                let wait = if index == 0 { Duration::ZERO } else { interval };
                tokio::select! {
                    () = token.cancelled() => return,
                    () = tokio::time::sleep(wait) => {}
                }
                if tx.send(Self::restamped(&sample)).is_err() {
                    return;
                }
            }
            debug!("Replay track exhausted");
        });

        let previous = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace((handle, cancel));
        if let Some((_, old)) = previous {
            old.cancel();
        }

        Ok(Watch {
            handle,
            samples: rx,
        })
    }

    fn cancel_watch(&self, handle: WatchHandle) {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if matches!(&*active, Some((current, _)) if *current == handle) {
            if let Some((_, cancel)) = active.take() {
                cancel.cancel();
            }
        }
    }
}

/// Fixed set of fences held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    fences: Vec<Geofence>,
}

impl StaticRegistry {
    /// Create a registry over `fences`
    pub fn new(fences: Vec<Geofence>) -> Self {
        Self { fences }
    }
}

impl ZoneRegistry for StaticRegistry {
    async fn active_fences(&self, user_id: &str) -> Result<Vec<Geofence>, RegistryError> {
        Ok(self
            .fences
            .iter()
            .filter(|f| f.active && f.owner_id == user_id)
            .cloned()
            .collect())
    }
}

/// Sync sink that only logs. For offline runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSync;

impl SyncSink for LoggingSync {
    async fn persist(&self, user_id: &str, sample: &PositionSample) -> Result<(), PersistenceError> {
        debug!(
            user_id,
            position = %sample.coordinate,
            accuracy_m = sample.accuracy_meters,
            "Sample recorded locally"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safetrip_geo::{AlertPolicy, Coordinate};

    fn sample(lat: f64, lon: f64) -> PositionSample {
        PositionSample::now(Coordinate::new(lat, lon), 5.0)
    }

    #[tokio::test]
    async fn test_current_fix_waits_for_first_push() {
        let (sensor, feed) = ChannelSensor::new();
        let pending = tokio::spawn(async move {
            sensor.current_fix(&FixOptions::default()).await
        });
        tokio::task::yield_now().await;
        feed.push(sample(1.0, 2.0));

        let fix = pending.await.unwrap().unwrap();
        assert_eq!(fix.coordinate, Coordinate::new(1.0, 2.0));
    }

    #[tokio::test]
    async fn test_watch_receives_pushes_until_cancelled() {
        let (sensor, feed) = ChannelSensor::new();
        let mut watch = sensor.watch(&FixOptions::default()).unwrap();
        assert!(feed.is_watched());

        feed.push(sample(1.0, 1.0));
        feed.push(sample(2.0, 2.0));
        assert_eq!(watch.samples.recv().await.unwrap().coordinate.latitude, 1.0);
        assert_eq!(watch.samples.recv().await.unwrap().coordinate.latitude, 2.0);

        sensor.cancel_watch(watch.handle);
        assert!(!feed.is_watched());
        feed.push(sample(3.0, 3.0));
        assert!(watch.samples.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_cancel_keeps_newer_watch() {
        let (sensor, feed) = ChannelSensor::new();
        let first = sensor.watch(&FixOptions::default()).unwrap();
        let _second = sensor.watch(&FixOptions::default()).unwrap();

        sensor.cancel_watch(first.handle);
        assert!(feed.is_watched());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_watch_emits_whole_track() {
        let track = vec![sample(0.0, 0.0), sample(0.1, 0.0), sample(0.2, 0.0)];
        let sensor = ReplaySensor::new(track, Duration::from_secs(1));

        let fix = sensor.current_fix(&FixOptions::default()).await.unwrap();
        assert_eq!(fix.coordinate.latitude, 0.0);

        let mut watch = sensor.watch(&FixOptions::default()).unwrap();
        let started = tokio::time::Instant::now();
        assert_eq!(watch.samples.recv().await.unwrap().coordinate.latitude, 0.0);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(watch.samples.recv().await.unwrap().coordinate.latitude, 0.1);
        assert_eq!(watch.samples.recv().await.unwrap().coordinate.latitude, 0.2);
        assert!(watch.samples.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_replay_empty_track() {
        let sensor = ReplaySensor::new(Vec::new(), Duration::from_millis(1));
        assert!(sensor.is_empty());
        let err = sensor.current_fix(&FixOptions::default()).await.unwrap_err();
        assert!(matches!(err, SensorError::Unavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_cancel_closes_stream() {
        let track = vec![sample(0.0, 0.0), sample(0.1, 0.0), sample(0.2, 0.0)];
        let sensor = ReplaySensor::new(track, Duration::from_secs(1));

        let mut watch = sensor.watch(&FixOptions::default()).unwrap();
        sensor.cancel_watch(watch.handle);
        assert!(watch.samples.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_static_registry_filters_owner_and_active() {
        let center = Coordinate::new(0.0, 0.0);
        let registry = StaticRegistry::new(vec![
            Geofence::new("a", "u1", "A", center, 100.0, AlertPolicy::Entry).unwrap(),
            Geofence::new("b", "u2", "B", center, 100.0, AlertPolicy::Entry).unwrap(),
            Geofence::new("c", "u1", "C", center, 100.0, AlertPolicy::Exit)
                .unwrap()
                .with_active(false),
        ]);

        let fences = registry.active_fences("u1").await.unwrap();
        let ids: Vec<&str> = fences.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }
}
