//! `location-tracker` edge function
//!
//! One function, dispatched on `action`. Every response carries `success`; a
//! `false` there is turned into [`ApiError::FunctionFailed`].

use crate::client::SafeTripClient;
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use safetrip_geo::{AlertKind, Coordinate, GeofenceAlert};
use safetrip_tracker::PositionSample;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const FUNCTION: &str = "location-tracker";

/// Most rows the backend returns for a history query
pub const HISTORY_LIMIT: usize = 100;

/// Location tracker API interface
#[derive(Clone)]
pub struct LocationApi {
    client: SafeTripClient,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationRequest<'a> {
    action: &'a str,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trip_id: Option<&'a str>,
}

impl<'a> LocationRequest<'a> {
    fn new(action: &'a str, user_id: &'a str) -> Self {
        Self {
            action,
            user_id,
            latitude: None,
            longitude: None,
            accuracy: None,
            trip_id: None,
        }
    }

    fn at(mut self, coordinate: Coordinate) -> Self {
        self.latitude = Some(coordinate.latitude);
        self.longitude = Some(coordinate.longitude);
        self
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    data: T,
}

impl LocationApi {
    /// Create a new location API interface
    pub(crate) fn new(client: SafeTripClient) -> Self {
        Self { client }
    }

    async fn call<T: DeserializeOwned>(&self, request: &LocationRequest<'_>) -> ApiResult<T> {
        let envelope: Envelope<T> = self.client.invoke(FUNCTION, request).await?;
        if envelope.success {
            Ok(envelope.data)
        } else {
            Err(ApiError::FunctionFailed {
                function: format!("{FUNCTION}/{}", request.action),
                message: envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }

    /// Store one sample, optionally tied to a trip
    pub async fn update_location(
        &self,
        user_id: &str,
        sample: &PositionSample,
        trip_id: Option<&str>,
    ) -> ApiResult<LocationUpdate> {
        let mut request = LocationRequest::new("update_location", user_id).at(sample.coordinate);
        request.accuracy = Some(sample.accuracy_meters);
        request.trip_id = trip_id;

        let update: LocationUpdate = self.call(&request).await?;
        debug!(user_id, notices = update.alerts.len(), "Location stored");
        Ok(update)
    }

    /// Stored samples for `user_id`, newest first, at most `limit` (capped at 100)
    pub async fn history(&self, user_id: &str, limit: usize) -> ApiResult<Vec<LocationRecord>> {
        let request = LocationRequest::new("get_location_history", user_id);
        let mut history: LocationHistory = self.call(&request).await?;
        history.locations.truncate(limit.min(HISTORY_LIMIT));
        Ok(history.locations)
    }

    /// Evaluate the user's fences on the backend
    pub async fn check_geofences(
        &self,
        user_id: &str,
        coordinate: Coordinate,
    ) -> ApiResult<RemoteGeofenceCheck> {
        coordinate
            .validate()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let request = LocationRequest::new("check_geofences", user_id).at(coordinate);
        self.call(&request).await
    }
}

/// Result of `update_location`
#[derive(Debug, Clone, Deserialize)]
pub struct LocationUpdate {
    /// The stored row
    pub location: Option<LocationRecord>,
    /// Server-side notices such as a poor-signal warning
    #[serde(default)]
    pub alerts: Vec<ServerNotice>,
    /// Human readable status
    #[serde(default)]
    pub message: Option<String>,
}

/// Informational notice attached to a stored sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerNotice {
    /// Notice kind, e.g. `poor_signal`
    #[serde(rename = "type")]
    pub kind: String,
    /// Text shown to the user
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct LocationHistory {
    #[serde(default)]
    locations: Vec<LocationRecord>,
}

/// A row of the `location_updates` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Row id
    pub id: String,
    /// Owner of the sample
    pub user_id: String,
    /// Trip the sample was recorded on
    #[serde(default)]
    pub trip_id: Option<String>,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// `"{lat:.6}, {lon:.6}"` as stored by the backend
    #[serde(default)]
    pub address: Option<String>,
    /// Accuracy radius in meters, when the sensor reported one
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Server receive time
    pub created_at: DateTime<Utc>,
}

impl LocationRecord {
    /// Stored position
    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Display address, formatted from the coordinate when the row has none
    #[must_use]
    pub fn display_address(&self) -> String {
        self.address
            .clone()
            .unwrap_or_else(|| self.coordinate().to_string())
    }

    /// The row as a position sample
    #[must_use]
    pub fn to_sample(&self) -> PositionSample {
        PositionSample::new(
            self.coordinate(),
            self.accuracy.unwrap_or_default(),
            self.created_at,
        )
    }
}

/// Result of a backend geofence check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteGeofenceCheck {
    /// Alerts in fence order
    #[serde(default)]
    pub alerts: Vec<RemoteAlert>,
    /// Active fences the backend evaluated
    #[serde(default)]
    pub geofences_checked: usize,
}

/// Alert in the backend's wire shape. Distances are whole meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAlert {
    /// Fence id
    pub geofence_id: String,
    /// Fence name
    pub name: String,
    /// Alert kind
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Text shown to the user
    pub message: String,
    /// Distance to the fence center, rounded to whole meters
    pub distance: f64,
}

impl From<&GeofenceAlert> for RemoteAlert {
    fn from(alert: &GeofenceAlert) -> Self {
        Self {
            geofence_id: alert.fence_id.clone(),
            name: alert.fence_name.clone(),
            kind: alert.kind,
            message: alert.message.clone(),
            distance: alert.distance_meters.round(),
        }
    }
}
