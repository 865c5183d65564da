//! Spatial and scoring analysis over gaming-company offices and amenity counts.
//!
//! Everything in this crate is synchronous and pure: inputs are passed in
//! explicitly and nothing is cached between calls.

pub mod cities;
pub mod distance;
pub mod error;
pub mod hull;
pub mod scoring;
pub mod summarizer;

pub use cities::{count_by_city, dedup_offices, group_by_city, top_cities, CityCount, CityPoints};
pub use distance::{degrees_to_meters, haversine_meters, planar_degrees, DEGREES_TO_METERS};
pub use error::AnalysisError;
pub use hull::{circle_ring, convex_hull};
pub use scoring::{category_shares, score_cities, score_shares, CategoryScore, CityScore, Share};
pub use summarizer::{
    centroid, farthest_pair, filter_outliers, filter_outliers_by, midpoint_and_radius,
    retained_indices, summarize, ClusterSummary, CoverageCircle, FarthestPair, OutlierThreshold,
    SummaryOptions, DEFAULT_OUTLIER_THRESHOLD_DEGREES,
};
