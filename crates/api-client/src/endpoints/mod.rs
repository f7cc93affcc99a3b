//! Endpoint-specific API implementations
//!
//! | Module | Backend | Description |
//! |--------|---------|-------------|
//! | `location` | `location-tracker` edge function | Store samples, history, remote geofence check |
//! | `geofences` | `geofences` table | The user's fence definitions |

pub mod geofences;
pub mod location;

pub use geofences::{GeofenceRow, GeofencesApi};
pub use location::{LocationApi, LocationRecord, RemoteAlert, RemoteGeofenceCheck};
