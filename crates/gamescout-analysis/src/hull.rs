//! Polygon helpers for map output: convex hull of a cluster and a
//! circle approximated as a closed ring.

use gamescout_core::GeoPoint;
use geo::{ConvexHull, MultiPoint, Point, Polygon};

use crate::distance::EARTH_RADIUS_METERS;

/// Convex hull of the points, in `(x = longitude, y = latitude)` order.
///
/// Returns `None` for fewer than three points, where no area can be enclosed.
#[must_use]
pub fn convex_hull(points: &[GeoPoint]) -> Option<Polygon<f64>> {
    if points.len() < 3 {
        return None;
    }
    let multi: MultiPoint<f64> = points
        .iter()
        .map(|p| Point::new(p.longitude, p.latitude))
        .collect();
    Some(multi.convex_hull())
}

/// Closed ring of `segments` destination points at `radius_meters` from `center`.
///
/// The first coordinate is repeated at the end so the ring can be emitted
/// directly as a GeoJSON polygon. A zero radius yields a ring collapsed onto
/// the center.
#[must_use]
pub fn circle_ring(center: GeoPoint, radius_meters: f64, segments: usize) -> Vec<GeoPoint> {
    let segments = segments.max(3);
    let angular = radius_meters / EARTH_RADIUS_METERS;
    let lat1 = center.latitude.to_radians();
    let lon1 = center.longitude.to_radians();

    let mut ring: Vec<GeoPoint> = (0..segments)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let bearing = 2.0 * std::f64::consts::PI * (i as f64) / (segments as f64);
            let lat2 = (lat1.sin() * angular.cos()
                + lat1.cos() * angular.sin() * bearing.cos())
            .asin();
            let lon2 = lon1
                + (bearing.sin() * angular.sin() * lat1.cos())
                    .atan2(angular.cos() - lat1.sin() * lat2.sin());
            GeoPoint {
                latitude: lat2.to_degrees(),
                longitude: normalize_longitude(lon2.to_degrees()),
            }
        })
        .collect();

    ring.push(ring[0]);
    ring
}

fn normalize_longitude(lon: f64) -> f64 {
    (lon + 540.0).rem_euclid(360.0) - 180.0
}
