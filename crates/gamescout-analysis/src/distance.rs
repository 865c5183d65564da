//! Distance metrics between [`GeoPoint`]s.
//!
//! Two metrics coexist: planar Euclidean distance in degree space (cheap,
//! flat-earth, used by the reference outlier filter) and haversine
//! great-circle distance in meters.

use gamescout_core::GeoPoint;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Rough meters per degree used when a degree distance must be shown in meters.
pub const DEGREES_TO_METERS: f64 = 111_320.0;

/// Great-circle distance between two points in meters.
#[must_use]
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Clamp guards against h drifting past 1.0 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

/// Euclidean distance in degree space, treating latitude/longitude as a plane.
#[must_use]
pub fn planar_degrees(a: GeoPoint, b: GeoPoint) -> f64 {
    (a.latitude - b.latitude).hypot(a.longitude - b.longitude)
}

/// Convert a degree-space distance to meters with the given factor.
#[must_use]
pub fn degrees_to_meters(degrees: f64, meters_per_degree: f64) -> f64 {
    degrees * meters_per_degree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn haversine_london_to_paris() {
        let d = haversine_meters(p(51.5074, -0.1278), p(48.8566, 2.3522));
        assert!((d - 343_500.0).abs() < 2_000.0, "got {d}");
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = p(37.7749, -122.4194);
        let b = p(40.7128, -74.0060);
        assert!((haversine_meters(a, b) - haversine_meters(b, a)).abs() < 1e-9);
    }

    #[test]
    fn haversine_of_identical_points_is_zero() {
        let a = p(37.7749, -122.4194);
        assert!(haversine_meters(a, a).abs() < 1e-9);
    }

    #[test]
    fn haversine_antipodes_is_half_circumference() {
        let d = haversine_meters(p(0.0, 0.0), p(0.0, 180.0));
        let expected = std::f64::consts::PI * EARTH_RADIUS_METERS;
        assert!((d - expected).abs() < 1.0, "got {d}");
    }

    #[test]
    fn planar_degrees_is_pythagorean() {
        let d = planar_degrees(p(0.0, 0.0), p(3.0, 4.0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn degrees_to_meters_uses_factor() {
        assert!((degrees_to_meters(0.05, DEGREES_TO_METERS) - 5_566.0).abs() < 1e-9);
    }
}
