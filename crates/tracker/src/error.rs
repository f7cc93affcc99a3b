//! Error types for the tracking loop and its collaborators

use thiserror::Error;

/// Errors returned by [`PositionTracker::start`](crate::PositionTracker::start)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    /// No usable initial fix: sensor failure, timeout or a stale reading.
    /// The tracker is back in `Idle` and `start` may be retried.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    /// `start` was called while starting or tracking
    #[error("Tracking is already running")]
    AlreadyRunning,

    /// `stop` was called while the initial fix was pending
    #[error("Tracking was stopped before the initial fix arrived")]
    StoppedDuringStart,
}

/// Failures reported by a [`Sensor`](crate::Sensor)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// The user or platform denied location access
    #[error("Location permission denied")]
    PermissionDenied,

    /// The sensor could not produce a position
    #[error("Position unavailable: {0}")]
    Unavailable(String),

    /// The device has no positioning support
    #[error("Geolocation is not supported")]
    Unsupported,
}

/// A sample could not be stored by the [`SyncSink`](crate::SyncSink)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersistenceError {
    /// The backend answered but refused the sample
    #[error("Sample rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached
    #[error("Sync backend unreachable: {0}")]
    Unreachable(String),
}

/// The [`ZoneRegistry`](crate::ZoneRegistry) could not list fences
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// The registry could not be reached
    #[error("Zone registry unreachable: {0}")]
    Unreachable(String),

    /// The registry answered with data that could not be read
    #[error("Zone registry returned malformed data: {0}")]
    Malformed(String),
}
