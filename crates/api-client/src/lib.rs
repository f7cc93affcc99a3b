//! Supabase client for SafeTrip backend services
//!
//! Provides the backend side of live tracking: storing position samples through
//! the `location-tracker` edge function, reading the user's fences from the
//! `geofences` table, location history, and the backend's own geofence check.
//!
//! # Features
//!
//! - **Environment-based configuration**: Load the project URL and keys from environment variables
//! - **Retry with exponential backoff**: Automatic retry for transient failures
//! - **Circuit breaker**: Fail fast while the backend is down
//! - **Request correlation**: Track requests with unique IDs for debugging
//! - **Tracker collaborators**: [`SupabaseSync`] plugs straight into a `PositionTracker`
//!
//! # Example
//!
//! ```rust,no_run
//! use safetrip_api_client::SafeTripClient;
//! use safetrip_geo::Coordinate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SafeTripClient::new()?;
//!
//!     let check = client
//!         .location()
//!         .check_geofences("traveler", Coordinate::new(12.9716, 77.5946))
//!         .await?;
//!     println!("{} fences checked, {} alerts", check.geofences_checked, check.alerts.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod sink;

pub use client::SafeTripClient;
pub use config::{ClientConfig, Environment};
pub use error::{ApiError, ApiResult};
pub use sink::SupabaseSync;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::SafeTripClient;
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::endpoints::{GeofencesApi, LocationApi};
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::sink::SupabaseSync;
}
