//! Haversine distance calculation.
//!
//! The Haversine formula calculates the great-circle distance between two points
//! on a sphere given their longitudes and latitudes. The longitude delta only ever
//! passes through `sin`, so antimeridian crossings need no special case.

use crate::{Coordinate, Result};

/// Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth's mean radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two validated coordinates.
///
/// # Errors
/// Returns [`GeoError::InvalidCoordinate`](crate::GeoError::InvalidCoordinate)
/// if either point is out of range.
///
/// # Example
/// ```
/// use safetrip_geo::{distance_meters, Coordinate};
///
/// let d = distance_meters(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 1.0)).unwrap();
/// assert!((d - 111_195.0).abs() < 300.0);
/// ```
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> Result<f64> {
    a.validate()?;
    b.validate()?;
    Ok(haversine_distance_meters(a, b))
}

/// Returns true when `point` lies in the closed disk around `center`.
///
/// A point exactly `radius_meters` away counts as inside.
pub fn is_within(point: &Coordinate, center: &Coordinate, radius_meters: f64) -> Result<bool> {
    Ok(distance_meters(point, center)? <= radius_meters)
}

/// Calculates the great-circle distance between two coordinates in kilometers.
///
/// No range checks; callers that accept external input should use [`distance_meters`].
#[inline]
pub fn haversine_distance(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_KM)
}

/// Calculates the great-circle distance between two coordinates in meters.
#[inline]
pub fn haversine_distance_meters(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_M)
}

#[inline]
fn haversine_distance_with_radius(from: &Coordinate, to: &Coordinate, radius: f64) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push `a` a hair past 1.0 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    radius * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoError;
    use proptest::prelude::*;

    const BERLIN: Coordinate = Coordinate { latitude: 52.5200, longitude: 13.4050 };
    const PARIS: Coordinate = Coordinate { latitude: 48.8566, longitude: 2.3522 };
    const BENGALURU: Coordinate = Coordinate { latitude: 12.9716, longitude: 77.5946 };

    #[test]
    fn test_one_degree_longitude_at_equator() {
        let d = distance_meters(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 1.0)).unwrap();
        assert!((d - 111_195.0).abs() < 300.0, "got {d}");
    }

    #[test]
    fn test_berlin_to_paris() {
        let distance = haversine_distance(&BERLIN, &PARIS);
        assert!((distance - 878.0).abs() < 5.0, "Berlin-Paris: {}", distance);
    }

    #[test]
    fn test_same_point_zero_distance() {
        assert_eq!(distance_meters(&BENGALURU, &BENGALURU).unwrap(), 0.0);
    }

    #[test]
    fn test_antimeridian_crossing_is_short() {
        let west = Coordinate::new(0.0, 179.5);
        let east = Coordinate::new(0.0, -179.5);
        let d = distance_meters(&west, &east).unwrap();
        assert!((d - 111_195.0).abs() < 300.0, "got {d}");
    }

    #[test]
    fn test_near_pole_distance() {
        // Opposite meridians near the pole: the short path runs over the pole, ~2.2 km
        let a = Coordinate::new(89.99, 0.0);
        let b = Coordinate::new(89.99, 180.0);
        let d = distance_meters(&a, &b).unwrap();
        assert!((d - 2_223.9).abs() < 5.0, "got {d}");
    }

    #[test]
    fn test_antipodal_points() {
        let d = distance_meters(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 180.0)).unwrap();
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_M;
        assert!((d - half_circumference).abs() < 1.0);
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        let bad = Coordinate::new(120.0, 0.0);
        assert!(matches!(
            distance_meters(&bad, &BERLIN),
            Err(GeoError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            is_within(&BERLIN, &bad, 10.0),
            Err(GeoError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_colinear_points_add_up() {
        // Three points on the equator, b between a and c
        let a = Coordinate::new(0.0, 10.0);
        let b = Coordinate::new(0.0, 10.5);
        let c = Coordinate::new(0.0, 11.25);
        let ab = distance_meters(&a, &b).unwrap();
        let bc = distance_meters(&b, &c).unwrap();
        let ac = distance_meters(&a, &c).unwrap();
        assert!((ac - (ab + bc)).abs() < 1e-6 * ac);

        // Same along a meridian
        let a = Coordinate::new(40.0, -3.7);
        let b = Coordinate::new(41.0, -3.7);
        let c = Coordinate::new(43.5, -3.7);
        let ac = distance_meters(&a, &c).unwrap();
        let sum = distance_meters(&a, &b).unwrap() + distance_meters(&b, &c).unwrap();
        assert!((ac - sum).abs() < 1e-6 * ac);
    }

    #[test]
    fn test_boundary_is_inside() {
        let point = Coordinate::new(0.0, 1.0);
        let center = Coordinate::new(0.0, 0.0);
        let exact = distance_meters(&point, &center).unwrap();

        assert!(is_within(&point, &center, exact).unwrap());
        assert!(!is_within(&point, &center, exact - 0.001).unwrap());
    }

    #[test]
    fn test_meters_conversion() {
        let km = haversine_distance(&BERLIN, &PARIS);
        let meters = haversine_distance_meters(&BERLIN, &PARIS);
        assert!((meters - km * 1000.0).abs() < 1.0);
    }

    fn coordinate() -> impl Strategy<Value = Coordinate> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lon)| Coordinate::new(lat, lon))
    }

    proptest! {
        #[test]
        fn prop_distance_is_symmetric(a in coordinate(), b in coordinate()) {
            let ab = distance_meters(&a, &b).unwrap();
            let ba = distance_meters(&b, &a).unwrap();
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn prop_self_distance_is_zero(a in coordinate()) {
            prop_assert_eq!(distance_meters(&a, &a).unwrap(), 0.0);
        }

        #[test]
        fn prop_distance_is_bounded(a in coordinate(), b in coordinate()) {
            let d = distance_meters(&a, &b).unwrap();
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_M + 1e-6);
        }

        #[test]
        fn prop_is_within_matches_distance(a in coordinate(), b in coordinate(), r in 0.0f64..5_000_000.0) {
            let d = distance_meters(&a, &b).unwrap();
            prop_assert_eq!(is_within(&a, &b, r).unwrap(), d <= r);
        }

        #[test]
        fn prop_monotonic_along_equator(start in -170.0f64..0.0, step1 in 0.0f64..80.0, step2 in 0.0f64..80.0) {
            let origin = Coordinate::new(0.0, start);
            let near = Coordinate::new(0.0, start + step1.min(step2));
            let far = Coordinate::new(0.0, start + step1.max(step2));
            prop_assert!(
                distance_meters(&origin, &near).unwrap() <= distance_meters(&origin, &far).unwrap() + 1e-6
            );
        }
    }
}
