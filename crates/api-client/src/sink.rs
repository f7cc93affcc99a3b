//! Supabase-backed tracker collaborators

use crate::client::SafeTripClient;
use safetrip_geo::Geofence;
use safetrip_tracker::{PersistenceError, PositionSample, RegistryError, SyncSink, ZoneRegistry};
use tracing::info;

/// Stores samples through the `location-tracker` function and reads fences
/// from the `geofences` table.
///
/// Every persisted sample is tagged with the trip id when one is set.
#[derive(Clone)]
pub struct SupabaseSync {
    client: SafeTripClient,
    trip_id: Option<String>,
}

impl SupabaseSync {
    /// Create a sync sink that does not tag samples with a trip
    #[must_use]
    pub fn new(client: SafeTripClient) -> Self {
        Self {
            client,
            trip_id: None,
        }
    }

    /// Tag every stored sample with `trip_id`
    #[must_use]
    pub fn with_trip(mut self, trip_id: impl Into<String>) -> Self {
        self.trip_id = Some(trip_id.into());
        self
    }

    /// Trip the samples are attached to
    #[must_use]
    pub fn trip_id(&self) -> Option<&str> {
        self.trip_id.as_deref()
    }
}

impl SyncSink for SupabaseSync {
    async fn persist(&self, user_id: &str, sample: &PositionSample) -> Result<(), PersistenceError> {
        let update = self
            .client
            .location()
            .update_location(user_id, sample, self.trip_id.as_deref())
            .await?;

        for notice in &update.alerts {
            info!(user_id, kind = %notice.kind, "{}", notice.message);
        }
        Ok(())
    }
}

impl ZoneRegistry for SupabaseSync {
    async fn active_fences(&self, user_id: &str) -> Result<Vec<Geofence>, RegistryError> {
        Ok(self.client.geofences().active(user_id).await?)
    }
}
