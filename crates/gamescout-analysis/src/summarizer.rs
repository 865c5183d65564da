//! Covering-circle summary of a city's point cluster.
//!
//! The pipeline is: centroid, outlier filter relative to the centroid,
//! farthest pair among the survivors, then midpoint and half-distance of that
//! pair as a covering circle. [`summarize`] is the single entry point; the
//! other functions are its building blocks and are public for callers that
//! need only one step.
//!
//! By default the outlier filter measures planar distance in degrees while
//! the farthest pair is measured geodesically in meters. Passing
//! [`OutlierThreshold::Meters`] switches the filter to haversine distance so
//! a single metric is used throughout.

use gamescout_core::GeoPoint;
use geo::Polygon;
use serde::Serialize;

use crate::distance::{haversine_meters, planar_degrees};
use crate::error::AnalysisError;
use crate::hull::convex_hull;

/// Reference outlier cutoff: about 5 km at mid-latitudes.
pub const DEFAULT_OUTLIER_THRESHOLD_DEGREES: f64 = 0.05;

/// Distance from the centroid at or beyond which a point is an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "metric", content = "value", rename_all = "lowercase")]
pub enum OutlierThreshold {
    /// Planar Euclidean distance in degree space.
    Degrees(f64),
    /// Haversine distance in meters.
    Meters(f64),
}

impl Default for OutlierThreshold {
    fn default() -> Self {
        Self::Degrees(DEFAULT_OUTLIER_THRESHOLD_DEGREES)
    }
}

impl OutlierThreshold {
    fn admits(self, point: GeoPoint, centroid: GeoPoint) -> bool {
        match self {
            Self::Degrees(limit) => planar_degrees(point, centroid) < limit,
            Self::Meters(limit) => haversine_meters(point, centroid) < limit,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryOptions {
    pub threshold: OutlierThreshold,
    /// Also compute the convex hull of the retained points.
    pub with_hull: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FarthestPair {
    pub a: GeoPoint,
    pub b: GeoPoint,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoverageCircle {
    pub center: GeoPoint,
    pub radius_meters: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub centroid: GeoPoint,
    pub circle: CoverageCircle,
    /// `None` when fewer than two points survived filtering.
    pub farthest: Option<FarthestPair>,
    pub retained: usize,
    pub discarded: usize,
    pub hull: Option<Polygon<f64>>,
}

/// Arithmetic mean of the coordinates, or `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lat_sum, lon_sum) = points.iter().fold((0.0, 0.0), |(lat, lon), p| {
        (lat + p.latitude, lon + p.longitude)
    });
    Some(GeoPoint {
        latitude: lat_sum / n,
        longitude: lon_sum / n,
    })
}

/// Indices of the points strictly closer to the centroid than `threshold`,
/// in input order.
#[must_use]
pub fn retained_indices(points: &[GeoPoint], threshold: OutlierThreshold) -> Vec<usize> {
    let Some(center) = centroid(points) else {
        return Vec::new();
    };
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| threshold.admits(**p, center))
        .map(|(i, _)| i)
        .collect()
}

/// Keep the points whose distance to the centroid is below `threshold`.
#[must_use]
pub fn filter_outliers_by(points: &[GeoPoint], threshold: OutlierThreshold) -> Vec<GeoPoint> {
    retained_indices(points, threshold)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Keep the points whose planar degree distance to the centroid is strictly
/// less than `threshold_degrees`. Input order is preserved.
#[must_use]
pub fn filter_outliers(points: &[GeoPoint], threshold_degrees: f64) -> Vec<GeoPoint> {
    filter_outliers_by(points, OutlierThreshold::Degrees(threshold_degrees))
}

/// The two points with the greatest haversine distance.
///
/// Pairs are visited as `(i, j)` with `i < j` in lexicographic order and an
/// incumbent is only replaced by a strictly greater distance, so the earliest
/// pair wins ties.
///
/// # Errors
///
/// Returns [`AnalysisError::InsufficientData`] when fewer than two points are given.
pub fn farthest_pair(points: &[GeoPoint]) -> Result<FarthestPair, AnalysisError> {
    if points.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            required: 2,
            found: points.len(),
        });
    }

    let mut best = FarthestPair {
        a: points[0],
        b: points[1],
        distance_meters: haversine_meters(points[0], points[1]),
    };

    for (i, &a) in points.iter().enumerate() {
        for &b in &points[i + 1..] {
            let distance_meters = haversine_meters(a, b);
            if distance_meters > best.distance_meters {
                best = FarthestPair {
                    a,
                    b,
                    distance_meters,
                };
            }
        }
    }

    Ok(best)
}

/// Summarize a city's points into a centroid, covering circle and optional hull.
///
/// Returns `None` when `points` is empty. When fewer than two points survive
/// the outlier filter the circle degenerates to the centroid with radius 0.
#[must_use]
pub fn summarize(points: &[GeoPoint], options: &SummaryOptions) -> Option<ClusterSummary> {
    let center = centroid(points)?;
    let retained = filter_outliers_by(points, options.threshold);
    let discarded = points.len() - retained.len();

    tracing::debug!(
        total = points.len(),
        retained = retained.len(),
        discarded,
        "outlier filter applied"
    );

    let hull = if options.with_hull {
        convex_hull(&retained)
    } else {
        None
    };

    // Fewer than two survivors: keep a point-on-map at the centroid.
    let farthest = farthest_pair(&retained).ok();
    let circle = farthest.map_or(
        CoverageCircle {
            center,
            radius_meters: 0.0,
        },
        |pair| CoverageCircle {
            center: GeoPoint {
                latitude: (pair.a.latitude + pair.b.latitude) / 2.0,
                longitude: (pair.a.longitude + pair.b.longitude) / 2.0,
            },
            radius_meters: pair.distance_meters / 2.0,
        },
    );

    Some(ClusterSummary {
        centroid: center,
        circle,
        farthest,
        retained: retained.len(),
        discarded,
        hull,
    })
}

/// Midpoint and covering radius for one city, filtering outliers in degree space.
///
/// Returns `None` ("no data") for an empty input.
#[must_use]
pub fn midpoint_and_radius(city_points: &[GeoPoint], threshold_degrees: f64) -> Option<CoverageCircle> {
    let options = SummaryOptions {
        threshold: OutlierThreshold::Degrees(threshold_degrees),
        with_hull: false,
    };
    summarize(city_points, &options).map(|s| s.circle)
}

#[cfg(test)]
#[path = "summarizer_test.rs"]
mod tests;
