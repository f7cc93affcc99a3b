//! Boundary traits for the services the tracker depends on
//!
//! The tracker owns none of these. Platform code supplies the sensor, the
//! backend client supplies sync and registry, and the UI supplies the alert sink.

use crate::error::{PersistenceError, RegistryError, SensorError};
use crate::report::TickReport;
use crate::sample::{FixOptions, PositionSample};
use safetrip_geo::Geofence;
use std::future::Future;
use tokio::sync::mpsc;

/// Identifies one active watch registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub u64);

/// A continuous position subscription.
///
/// Samples arrive on `samples` until the watch is cancelled or the sensor
/// closes the channel.
#[derive(Debug)]
pub struct Watch {
    /// Handle to pass back to [`Sensor::cancel_watch`]
    pub handle: WatchHandle,
    /// Stream of readings in sensor order
    pub samples: mpsc::UnboundedReceiver<PositionSample>,
}

/// Source of device positions
pub trait Sensor: Send + Sync + 'static {
    /// Produce a single fix. The tracker applies `options.timeout` itself, so an
    /// implementation may simply wait.
    fn current_fix(
        &self,
        options: &FixOptions,
    ) -> impl Future<Output = Result<PositionSample, SensorError>> + Send;

    /// Start a continuous watch
    fn watch(&self, options: &FixOptions) -> Result<Watch, SensorError>;

    /// Cancel a watch. Unknown or already cancelled handles are ignored.
    fn cancel_watch(&self, handle: WatchHandle);
}

/// Remote store for raw position samples
pub trait SyncSink: Send + Sync + 'static {
    /// Store one sample for `user_id`
    fn persist(
        &self,
        user_id: &str,
        sample: &PositionSample,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Read access to a user's geofences
pub trait ZoneRegistry: Send + Sync + 'static {
    /// Active fences owned by `user_id`, fetched fresh on every call
    fn active_fences(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<Geofence>, RegistryError>> + Send;
}

/// Receives one report per processed sample.
///
/// Called on the worker task without the lifecycle lock held, so a sink may
/// call `state()` or `stop()` on its own tracker. `stop()` from another thread
/// waits for a delivery in progress, so slow sinks delay it.
pub trait AlertSink: Send + Sync + 'static {
    /// Deliver the report for one tick. Never retried.
    fn deliver(&self, report: TickReport);
}

impl<F> AlertSink for F
where
    F: Fn(TickReport) + Send + Sync + 'static,
{
    fn deliver(&self, report: TickReport) {
        self(report);
    }
}
