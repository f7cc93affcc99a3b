//! Live position tracking with geofence alerts
//!
//! [`PositionTracker`] drives geofence evaluation from a position sensor. For every
//! sample it:
//!
//! 1. persists the sample through a [`SyncSink`] (best effort),
//! 2. fetches the user's active fences from a [`ZoneRegistry`],
//! 3. evaluates them with [`safetrip_geo::evaluate`],
//! 4. hands one [`TickReport`] to the caller's [`AlertSink`].
//!
//! Samples are processed one at a time in arrival order, so reports reach the
//! sink in the same order as the samples that produced them. Once
//! [`PositionTracker::stop`] returns, the sink receives nothing more.
//!
//! # Example
//!
//! ```rust,no_run
//! use safetrip_geo::{AlertPolicy, Coordinate, Geofence};
//! use safetrip_tracker::{
//!     ChannelSensor, LoggingSync, PositionSample, PositionTracker, StaticRegistry, TickReport,
//!     TrackerOptions,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let (sensor, feed) = ChannelSensor::new();
//! let hotel = Coordinate::new(12.9716, 77.5946);
//! let registry = StaticRegistry::new(vec![
//!     Geofence::new("hotel", "traveler", "Hotel", hotel, 300.0, AlertPolicy::Exit)?,
//! ]);
//!
//! let tracker = PositionTracker::new(
//!     "traveler",
//!     TrackerOptions::default(),
//!     sensor,
//!     LoggingSync,
//!     registry,
//!     |report: TickReport| {
//!         for alert in &report.alerts {
//!             println!("{}", alert.message);
//!         }
//!     },
//! );
//!
//! feed.push(PositionSample::now(hotel, 8.0));
//! tracker.start().await?;
//! // ... the platform keeps calling feed.push(...) as positions arrive
//! tracker.stop();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod collaborators;
mod error;
mod local;
mod report;
mod sample;
mod tracker;

pub use collaborators::{AlertSink, Sensor, SyncSink, Watch, WatchHandle, ZoneRegistry};
pub use error::{PersistenceError, RegistryError, SensorError, TrackerError};
pub use local::{ChannelSensor, LoggingSync, ReplaySensor, SensorFeed, StaticRegistry};
pub use report::{TickIssue, TickReport};
pub use sample::{FixOptions, PositionSample};
pub use tracker::{PositionTracker, TrackerOptions, TrackerState};
