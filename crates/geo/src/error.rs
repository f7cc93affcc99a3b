//! Error types for the geo crate.

use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur during geo operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude or longitude out of range, or not a finite number
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Geofence that violates its construction invariants
    #[error("Invalid geofence: {0}")]
    InvalidGeofence(String),
}

/// Error code for integration with safetrip-core error handling.
/// Range: 10xxx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// Invalid coordinate values
    InvalidCoordinate = 10001,
    /// Invalid geofence definition
    InvalidGeofence = 10002,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::InvalidCoordinate(_) => GeoErrorCode::InvalidCoordinate,
            GeoError::InvalidGeofence(_) => GeoErrorCode::InvalidGeofence,
        }
    }
}
