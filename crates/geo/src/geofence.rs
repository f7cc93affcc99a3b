//! Geofence containment and alert evaluation.
//!
//! Evaluation is stateless: each call recomputes containment from geometry and
//! applies the fence's alert policy. Nothing is remembered between calls, so an
//! `Entry` fence alerts on every evaluation made from inside it, and a `Both`
//! fence alerts on every evaluation.

use crate::haversine::distance_meters;
use crate::{Coordinate, GeoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which containment states produce an alert for a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPolicy {
    /// Alert while the position is inside the fence
    Entry,
    /// Alert while the position is outside the fence
    Exit,
    /// Always alert, reporting inside or outside
    Both,
}

impl AlertPolicy {
    /// Wire name used by the `geofences.alert_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPolicy::Entry => "entry",
            AlertPolicy::Exit => "exit",
            AlertPolicy::Both => "both",
        }
    }
}

impl fmt::Display for AlertPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertPolicy {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" => Ok(AlertPolicy::Entry),
            "exit" => Ok(AlertPolicy::Exit),
            "both" => Ok(AlertPolicy::Both),
            other => Err(GeoError::InvalidGeofence(format!("unknown alert policy '{other}'"))),
        }
    }
}

/// Kind of alert produced by one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Entry,
    Exit,
    Inside,
    Outside,
}

/// A named circular zone owned by a user.
///
/// Fences are read-only to the evaluator. Construct them through [`Geofence::new`]
/// (or deserialize and call [`Geofence::validate`]) so the radius and center
/// invariants hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub center: Coordinate,
    pub radius_meters: f64,
    pub alert_policy: AlertPolicy,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Geofence {
    /// Creates an active geofence.
    ///
    /// # Errors
    /// `InvalidGeofence` if the radius is not a positive finite number,
    /// `InvalidCoordinate` if the center is out of range.
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        center: Coordinate,
        radius_meters: f64,
        alert_policy: AlertPolicy,
    ) -> Result<Self> {
        let fence = Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            center,
            radius_meters,
            alert_policy,
            active: true,
        };
        fence.validate()?;
        Ok(fence)
    }

    /// Builder-style method to set the active flag
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Checks the construction invariants.
    pub fn validate(&self) -> Result<()> {
        if !(self.radius_meters.is_finite() && self.radius_meters > 0.0) {
            return Err(GeoError::InvalidGeofence(format!(
                "fence '{}' has radius {} (must be > 0)",
                self.id, self.radius_meters
            )));
        }
        self.center.validate()
    }
}

/// Containment of one position relative to one fence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainmentResult<'a> {
    pub fence: &'a Geofence,
    pub distance_meters: f64,
    pub is_inside: bool,
}

impl ContainmentResult<'_> {
    /// Applies the fence's alert policy.
    ///
    /// Returns `None` when the policy is silent for this containment state.
    pub fn alert(&self) -> Option<GeofenceAlert> {
        let name = &self.fence.name;
        let (kind, message) = match (self.fence.alert_policy, self.is_inside) {
            (AlertPolicy::Entry, true) => (AlertKind::Entry, format!("You have entered: {name}")),
            (AlertPolicy::Exit, false) => (AlertKind::Exit, format!("You have left: {name}")),
            (AlertPolicy::Both, true) => (AlertKind::Inside, format!("Inside: {name}")),
            (AlertPolicy::Both, false) => (AlertKind::Outside, format!("Outside: {name}")),
            (AlertPolicy::Entry, false) | (AlertPolicy::Exit, true) => return None,
        };

        Some(GeofenceAlert {
            fence_id: self.fence.id.clone(),
            fence_name: name.clone(),
            kind,
            message,
            distance_meters: self.distance_meters,
        })
    }
}

/// One alert produced by an evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceAlert {
    pub fence_id: String,
    pub fence_name: String,
    pub kind: AlertKind,
    pub message: String,
    pub distance_meters: f64,
}

/// Computes containment of `position` in `fence`.
///
/// The boundary (`distance == radius`) is inside.
pub fn containment<'a>(position: &Coordinate, fence: &'a Geofence) -> Result<ContainmentResult<'a>> {
    let distance = distance_meters(position, &fence.center)?;
    Ok(ContainmentResult {
        fence,
        distance_meters: distance,
        is_inside: distance <= fence.radius_meters,
    })
}

/// Evaluates a position against a set of fences.
///
/// Inactive fences are skipped. Alerts come back in fence input order, at most one
/// per fence. An invalid position or fence center aborts the whole evaluation.
///
/// # Example
/// ```
/// use safetrip_geo::{evaluate, Coordinate};
///
/// assert!(evaluate(&Coordinate::new(0.0, 0.0), &[]).unwrap().is_empty());
/// ```
pub fn evaluate(position: &Coordinate, fences: &[Geofence]) -> Result<Vec<GeofenceAlert>> {
    position.validate()?;

    let alert_for = |fence: &Geofence| -> Result<Option<GeofenceAlert>> {
        if !fence.active {
            return Ok(None);
        }
        Ok(containment(position, fence)?.alert())
    };

    #[cfg(feature = "parallel")]
    let per_fence: Vec<Option<GeofenceAlert>> = {
        use rayon::prelude::*;
        // Indexed iterator end to end, so collect keeps input order
        fences.par_iter().map(alert_for).collect::<Result<_>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let per_fence: Vec<Option<GeofenceAlert>> =
        fences.iter().map(alert_for).collect::<Result<_>>()?;

    Ok(per_fence.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haversine::haversine_distance_meters;

    const CENTER: Coordinate = Coordinate { latitude: 12.9716, longitude: 77.5946 };

    fn fence(id: &str, center: Coordinate, radius: f64, policy: AlertPolicy) -> Geofence {
        Geofence::new(id, "user-1", format!("Zone {id}"), center, radius, policy).unwrap()
    }

    /// A point roughly `meters` north of `origin`.
    fn north_of(origin: Coordinate, meters: f64) -> Coordinate {
        Coordinate::new(origin.latitude + meters / 111_195.0, origin.longitude)
    }

    #[test]
    fn test_empty_fence_list() {
        assert!(evaluate(&CENTER, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_entry_policy() {
        let fences = [fence("a", CENTER, 500.0, AlertPolicy::Entry)];

        let alerts = evaluate(&CENTER, &fences).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Entry);
        assert_eq!(alerts[0].message, "You have entered: Zone a");
        assert_eq!(alerts[0].distance_meters, 0.0);

        let far = north_of(CENTER, 10_000.0);
        assert!(evaluate(&far, &fences).unwrap().is_empty());
    }

    #[test]
    fn test_exit_policy() {
        let fences = [fence("a", CENTER, 500.0, AlertPolicy::Exit)];

        let far = north_of(CENTER, 10_000.0);
        let alerts = evaluate(&far, &fences).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Exit);
        assert_eq!(alerts[0].message, "You have left: Zone a");
        assert!((alerts[0].distance_meters - 10_000.0).abs() < 50.0);

        assert!(evaluate(&CENTER, &fences).unwrap().is_empty());
    }

    #[test]
    fn test_both_policy_always_one_alert() {
        let fences = [fence("a", CENTER, 500.0, AlertPolicy::Both)];

        for meters in [0.0, 250.0, 499.0, 501.0, 10_000.0, 2_000_000.0] {
            let alerts = evaluate(&north_of(CENTER, meters), &fences).unwrap();
            assert_eq!(alerts.len(), 1, "at {meters} m");
            let expected = if alerts[0].distance_meters <= 500.0 {
                AlertKind::Inside
            } else {
                AlertKind::Outside
            };
            assert_eq!(alerts[0].kind, expected);
        }

        let inside = evaluate(&CENTER, &fences).unwrap();
        assert_eq!(inside[0].message, "Inside: Zone a");
        let outside = evaluate(&north_of(CENTER, 10_000.0), &fences).unwrap();
        assert_eq!(outside[0].message, "Outside: Zone a");
    }

    #[test]
    fn test_two_fences_keep_input_order() {
        let x_center = CENTER;
        let y_center = north_of(CENTER, 400.0);
        let fences = [
            fence("x", x_center, 200.0, AlertPolicy::Entry),
            fence("y", y_center, 1000.0, AlertPolicy::Both),
        ];

        // 100 m from X's center, 300 m from Y's center: inside both
        let position = north_of(CENTER, 100.0);
        let alerts = evaluate(&position, &fences).unwrap();

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].fence_id, "x");
        assert_eq!(alerts[0].kind, AlertKind::Entry);
        assert_eq!(alerts[1].fence_id, "y");
        assert_eq!(alerts[1].kind, AlertKind::Inside);
    }

    #[test]
    fn test_order_follows_input_not_distance() {
        let fences: Vec<Geofence> = (0..64)
            .rev()
            .map(|i| fence(&i.to_string(), north_of(CENTER, i as f64 * 50.0), 10.0, AlertPolicy::Both))
            .collect();

        let alerts = evaluate(&CENTER, &fences).unwrap();
        let ids: Vec<&str> = alerts.iter().map(|a| a.fence_id.as_str()).collect();
        let expected: Vec<String> = (0..64).rev().map(|i: i32| i.to_string()).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_inactive_fences_skipped() {
        let fences = [
            fence("off", CENTER, 500.0, AlertPolicy::Both).with_active(false),
            fence("on", CENTER, 500.0, AlertPolicy::Entry),
        ];
        let alerts = evaluate(&CENTER, &fences).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].fence_id, "on");
    }

    #[test]
    fn test_boundary_counts_as_inside() {
        let edge = Coordinate::new(0.0, 0.01);
        let radius = haversine_distance_meters(&Coordinate::new(0.0, 0.0), &edge);
        let f = fence("edge", Coordinate::new(0.0, 0.0), radius, AlertPolicy::Entry);

        let result = containment(&edge, &f).unwrap();
        assert!(result.is_inside);
        assert_eq!(result.alert().map(|a| a.kind), Some(AlertKind::Entry));
    }

    #[test]
    fn test_invalid_position_propagates() {
        let fences = [fence("a", CENTER, 500.0, AlertPolicy::Both)];
        let err = evaluate(&Coordinate::new(0.0, 200.0), &fences).unwrap_err();
        assert!(matches!(err, GeoError::InvalidCoordinate(_)));
    }

    #[test]
    fn test_invalid_fence_center_propagates() {
        let mut broken = fence("a", CENTER, 500.0, AlertPolicy::Both);
        broken.center = Coordinate::new(95.0, 0.0);
        let err = evaluate(&CENTER, &[broken]).unwrap_err();
        assert!(matches!(err, GeoError::InvalidCoordinate(_)));
    }

    #[test]
    fn test_constructor_rejects_bad_radius() {
        for radius in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = Geofence::new("a", "u", "n", CENTER, radius, AlertPolicy::Entry).unwrap_err();
            assert!(matches!(err, GeoError::InvalidGeofence(_)), "radius {radius}");
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("entry".parse::<AlertPolicy>().unwrap(), AlertPolicy::Entry);
        assert_eq!(" EXIT ".parse::<AlertPolicy>().unwrap(), AlertPolicy::Exit);
        assert_eq!("both".parse::<AlertPolicy>().unwrap(), AlertPolicy::Both);
        assert!("sometimes".parse::<AlertPolicy>().is_err());
    }

    #[test]
    fn test_fence_json_shape() {
        let json = r#"{
            "id": "f-1",
            "owner_id": "u-1",
            "name": "Hostel",
            "center": {"latitude": 12.9716, "longitude": 77.5946},
            "radius_meters": 300,
            "alert_policy": "exit"
        }"#;
        let fence: Geofence = serde_json::from_str(json).unwrap();
        assert!(fence.active);
        assert_eq!(fence.alert_policy, AlertPolicy::Exit);
        assert!(fence.validate().is_ok());
    }
}
