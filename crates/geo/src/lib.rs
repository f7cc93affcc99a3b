//! Geodesy and geofence evaluation for SafeTrip.
//!
//! This crate provides:
//! - Haversine great-circle distance with coordinate validation
//! - Closed-disk containment tests
//! - Geofence evaluation against per-fence alert policies
//!
//! Everything here is pure computation. No I/O, no cross-call state.
//!
//! # Example
//!
//! ```
//! use safetrip_geo::{evaluate, AlertKind, AlertPolicy, Coordinate, Geofence};
//!
//! let bengaluru = Coordinate::new(12.9716, 77.5946);
//! let fence = Geofence::new("f1", "user-1", "Hotel", bengaluru, 500.0, AlertPolicy::Entry).unwrap();
//!
//! let alerts = evaluate(&bengaluru, &[fence]).unwrap();
//! assert_eq!(alerts.len(), 1);
//! assert_eq!(alerts[0].kind, AlertKind::Entry);
//! ```

mod error;
pub mod geofence;
mod haversine;

pub use error::{GeoError, GeoErrorCode, Result};
pub use geofence::{
    containment, evaluate, AlertKind, AlertPolicy, ContainmentResult, Geofence, GeofenceAlert,
};
pub use haversine::{
    distance_meters, haversine_distance, haversine_distance_meters, is_within, EARTH_RADIUS_KM,
    EARTH_RADIUS_M,
};

/// A geographic coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate without range checks.
    ///
    /// Use [`Coordinate::try_new`] at input boundaries.
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Creates a coordinate, rejecting out-of-range or non-finite values.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self> {
        let coord = Self::new(latitude, longitude);
        coord.validate()?;
        Ok(coord)
    }

    /// Returns true if the coordinate has valid values.
    ///
    /// NaN fails every comparison, so it is rejected here as well.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Checks the coordinate, returning `InvalidCoordinate` when out of range.
    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(GeoError::InvalidCoordinate(format!(
                "({}, {}) is outside lat [-90, 90] / lon [-180, 180]",
                self.latitude, self.longitude
            )))
        }
    }

    /// Converts degrees to radians for internal calculations.
    #[inline]
    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}
