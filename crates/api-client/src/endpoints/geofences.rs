//! `geofences` table

use crate::client::SafeTripClient;
use crate::error::ApiResult;
use safetrip_geo::{AlertPolicy, Coordinate, GeoError, Geofence};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const TABLE: &str = "geofences";

/// Geofences API interface
#[derive(Clone)]
pub struct GeofencesApi {
    client: SafeTripClient,
}

impl GeofencesApi {
    /// Create a new geofences API interface
    pub(crate) fn new(client: SafeTripClient) -> Self {
        Self { client }
    }

    /// Raw active rows for `user_id`
    pub async fn active_rows(&self, user_id: &str) -> ApiResult<Vec<GeofenceRow>> {
        self.client.select(TABLE, &active_filter(user_id)).await
    }

    /// Active fences for `user_id`, in table order.
    ///
    /// Rows that fail validation are skipped with a warning so one bad row does
    /// not hide the user's other fences.
    pub async fn active(&self, user_id: &str) -> ApiResult<Vec<Geofence>> {
        let rows = self.active_rows(user_id).await?;
        let total = rows.len();

        let fences: Vec<Geofence> = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                Geofence::try_from(row)
                    .map_err(|e| warn!(fence_id = %id, error = %e, "Skipping invalid geofence row"))
                    .ok()
            })
            .collect();

        debug!(user_id, total, usable = fences.len(), "Fetched geofences");
        Ok(fences)
    }
}

/// PostgREST filter for a user's active fences, oldest first
fn active_filter(user_id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        ("user_id", format!("eq.{user_id}")),
        ("is_active", "eq.true".to_string()),
        ("order", "created_at.asc".to_string()),
    ]
}

/// A row of the `geofences` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceRow {
    /// Fence id
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Center latitude in degrees
    pub latitude: f64,
    /// Center longitude in degrees
    pub longitude: f64,
    /// Radius in meters
    pub radius_meters: f64,
    /// `entry`, `exit` or `both`
    pub alert_type: String,
    /// Inactive rows are never evaluated
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl TryFrom<GeofenceRow> for Geofence {
    type Error = GeoError;

    fn try_from(row: GeofenceRow) -> Result<Self, Self::Error> {
        let policy: AlertPolicy = row.alert_type.parse()?;
        Ok(Geofence::new(
            row.id,
            row.user_id,
            row.name,
            Coordinate::new(row.latitude, row.longitude),
            row.radius_meters,
            policy,
        )?
        .with_active(row.is_active))
    }
}
