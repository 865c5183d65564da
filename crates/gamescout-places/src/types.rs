//! Foursquare Places v3 request and response types.
//!
//! Only the fields the collector reads are modelled; everything else in the
//! response is ignored by serde.

use gamescout_analysis::CoverageCircle;
use gamescout_core::GeoPoint;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// places/search response
// ---------------------------------------------------------------------------

/// Envelope for `places/search`: `{ "results": [ ... ] }`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Place>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub fsq_id: String,
    pub name: String,
    #[serde(default)]
    pub chains: Vec<Chain>,
    #[serde(default)]
    pub geocodes: Option<Geocodes>,
    #[serde(default)]
    pub location: Location,
}

/// A brand the place belongs to (e.g. every Starbucks shares one chain).
#[derive(Debug, Clone, Deserialize)]
pub struct Chain {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geocodes {
    #[serde(default)]
    pub main: Option<LatLng>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
}

// ---------------------------------------------------------------------------
// places/search request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Relevance,
    Rating,
    #[default]
    Distance,
    Popularity,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "RELEVANCE",
            Self::Rating => "RATING",
            Self::Distance => "DISTANCE",
            Self::Popularity => "POPULARITY",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub center: GeoPoint,
    pub radius_meters: u32,
    pub sort: SortOrder,
    pub limit: u32,
}

impl SearchRequest {
    /// Largest radius the API accepts.
    pub const MAX_RADIUS_METERS: u32 = 100_000;
    /// Largest page the API returns.
    pub const MAX_LIMIT: u32 = 50;

    /// Radius to search around a city's covering circle.
    ///
    /// `floor(circle.radius_meters / radius_divisor)` clamped to
    /// `1..=MAX_RADIUS_METERS`, so a divisor of 4 searches the inner quarter
    /// of the circle. A non-positive divisor is treated as 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn search_radius(circle: &CoverageCircle, radius_divisor: f64) -> u32 {
        let divisor = if radius_divisor > 0.0 {
            radius_divisor
        } else {
            1.0
        };
        let raw = (circle.radius_meters / divisor).floor();
        if raw.is_finite() {
            raw.clamp(1.0, f64::from(Self::MAX_RADIUS_METERS)) as u32
        } else {
            1
        }
    }

    /// Search around a city's covering circle, using [`Self::search_radius`].
    #[must_use]
    pub fn within_circle(
        query: &str,
        circle: &CoverageCircle,
        radius_divisor: f64,
        limit: u32,
    ) -> Self {
        Self {
            query: query.to_string(),
            center: circle.center,
            radius_meters: Self::search_radius(circle, radius_divisor),
            sort: SortOrder::Distance,
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.query.clone()),
            ("ll", self.center.to_string()),
            ("radius", self.radius_meters.to_string()),
            ("sort", self.sort.as_str().to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(radius_meters: f64) -> CoverageCircle {
        CoverageCircle {
            center: GeoPoint::new(37.7799, -122.4194).unwrap(),
            radius_meters,
        }
    }

    #[test]
    fn within_circle_divides_and_floors_radius() {
        let req = SearchRequest::within_circle("Starbucks", &circle(2_835.9), 4.0, 50);
        assert_eq!(req.radius_meters, 708);
        assert_eq!(req.sort, SortOrder::Distance);
        assert_eq!(req.limit, 50);
    }

    #[test]
    fn within_circle_clamps_radius_and_limit() {
        let tiny = SearchRequest::within_circle("Bar", &circle(0.0), 4.0, 0);
        assert_eq!(tiny.radius_meters, 1);
        assert_eq!(tiny.limit, 1);

        let huge = SearchRequest::within_circle("Bar", &circle(10_000_000.0), 4.0, 500);
        assert_eq!(huge.radius_meters, SearchRequest::MAX_RADIUS_METERS);
        assert_eq!(huge.limit, SearchRequest::MAX_LIMIT);
    }

    #[test]
    fn within_circle_treats_non_positive_divisor_as_one() {
        let req = SearchRequest::within_circle("Club", &circle(1_200.0), 0.0, 10);
        assert_eq!(req.radius_meters, 1_200);
    }

    #[test]
    fn search_radius_matches_request_radius() {
        let c = circle(1_417.36);
        assert_eq!(SearchRequest::search_radius(&c, 4.0), 354);
        assert_eq!(
            SearchRequest::within_circle("Bar", &c, 4.0, 50).radius_meters,
            SearchRequest::search_radius(&c, 4.0)
        );
    }

    #[test]
    fn query_pairs_format_ll_as_lat_comma_lon() {
        let req = SearchRequest::within_circle("School", &circle(4_000.0), 4.0, 50);
        let pairs = req.query_pairs();
        assert!(pairs.contains(&("ll", "37.779900,-122.419400".to_string())));
        assert!(pairs.contains(&("radius", "1000".to_string())));
        assert!(pairs.contains(&("sort", "DISTANCE".to_string())));
    }

    #[test]
    fn place_deserializes_with_missing_optional_fields() {
        let place: Place = serde_json::from_value(serde_json::json!({
            "fsq_id": "abc",
            "name": "Corner Bar"
        }))
        .unwrap();
        assert!(place.chains.is_empty());
        assert!(place.geocodes.is_none());
        assert!(place.location.locality.is_none());
    }

    #[test]
    fn place_ignores_response_fields_the_collector_does_not_read() {
        let place: Place = serde_json::from_value(serde_json::json!({
            "fsq_id": "abc",
            "name": "Corner Bar",
            "chains": [{ "id": "c9", "name": "Corner Bars Inc" }],
            "location": { "locality": "Oakland", "country": "US" },
            "categories": [{ "id": 13003, "name": "Bar" }],
            "distance": 42
        }))
        .unwrap();
        assert_eq!(place.chains[0].name, "Corner Bars Inc");
        assert_eq!(place.location.locality.as_deref(), Some("Oakland"));
    }
}
