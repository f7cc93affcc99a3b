//! Fence and track files
//!
//! Both are JSON arrays. Fences use the backend's column names so a table
//! export can be fed straight in:
//!
//! ```json
//! [{"id": "hotel", "name": "Hotel", "latitude": 12.9716, "longitude": 77.5946,
//!   "radius_meters": 500, "alert_type": "entry"}]
//! ```
//!
//! Tracks are `[{"latitude": .., "longitude": .., "accuracy": ..}]`, oldest first.

use safetrip_core::{Error, ErrorCode, ResultExt};
use safetrip_geo::{AlertPolicy, Coordinate, Geofence};
use safetrip_tracker::PositionSample;
use serde::Deserialize;
use std::path::Path;

/// Owner assigned to fences loaded from a file when no user is given
pub const LOCAL_USER: &str = "local";

#[derive(Debug, Deserialize)]
struct FenceSpec {
    id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    radius_meters: f64,
    #[serde(default = "default_alert_type")]
    alert_type: String,
    #[serde(default = "default_active", alias = "is_active")]
    active: bool,
}

fn default_alert_type() -> String {
    "both".to_string()
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct TrackPoint {
    latitude: f64,
    longitude: f64,
    #[serde(default = "default_accuracy")]
    accuracy: f64,
}

fn default_accuracy() -> f64 {
    10.0
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> safetrip_core::Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(format!("reading {}", path.display()))?;
    let parsed: T = serde_json::from_str(&raw)?;
    Ok(parsed)
}

/// Load fences from `path`, owned by `owner`
pub fn load_fences(path: &Path, owner: &str) -> safetrip_core::Result<Vec<Geofence>> {
    let entries: Vec<FenceSpec> =
        read_json(path).context(format!("parsing fences from {}", path.display()))?;

    entries
        .into_iter()
        .map(|entry| {
            let policy: AlertPolicy = entry.alert_type.parse().map_err(geo_error)?;
            Geofence::new(
                entry.id,
                owner,
                entry.name,
                Coordinate::new(entry.latitude, entry.longitude),
                entry.radius_meters,
                policy,
            )
            .map(|fence| fence.with_active(entry.active))
            .map_err(geo_error)
        })
        .collect()
}

/// Load a recorded track from `path`
pub fn load_track(path: &Path) -> safetrip_core::Result<Vec<PositionSample>> {
    let points: Vec<TrackPoint> =
        read_json(path).context(format!("parsing track from {}", path.display()))?;

    if points.is_empty() {
        return Err(Error::validation(format!("track {} is empty", path.display())));
    }

    // Coordinates are not validated here; out-of-range points show up as
    // invalid-sample ticks during replay.
    Ok(points
        .into_iter()
        .map(|p| PositionSample::now(Coordinate::new(p.latitude, p.longitude), p.accuracy))
        .collect())
}

/// Map an engine error onto the CLI error type
pub fn geo_error(e: safetrip_geo::GeoError) -> Error {
    match e {
        safetrip_geo::GeoError::InvalidCoordinate(msg) => Error::invalid_coordinate(msg),
        safetrip_geo::GeoError::InvalidGeofence(msg) => Error::new(ErrorCode::InvalidGeofence, msg),
    }
}
