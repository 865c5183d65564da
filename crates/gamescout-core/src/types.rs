//! Domain types shared across the workspace.
//!
//! Coordinates enter the system through [`GeoPoint::new`], which rejects
//! non-finite and out-of-range values. Everything downstream assumes clean
//! numeric input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating coordinates at ingestion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("invalid coordinates for '{label}': {reason}")]
    Record { label: String, reason: String },
}

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a validated point.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if either coordinate is NaN/infinite or
    /// outside its valid range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() {
            return Err(ValidationError::NonFinite { field: "latitude" });
        }
        if !longitude.is_finite() {
            return Err(ValidationError::NonFinite { field: "longitude" });
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Validate an optional coordinate pair coming from an upstream record.
    ///
    /// A record missing either coordinate yields `Ok(None)` and is dropped by
    /// the caller. Present-but-invalid coordinates fail with
    /// [`ValidationError::Record`] naming `label`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Record`] when both coordinates are present
    /// but do not form a valid point.
    pub fn from_record(
        latitude: Option<f64>,
        longitude: Option<f64>,
        label: &str,
    ) -> Result<Option<Self>, ValidationError> {
        let (Some(lat), Some(lon)) = (latitude, longitude) else {
            return Ok(None);
        };
        Self::new(lat, lon)
            .map(Some)
            .map_err(|e| ValidationError::Record {
                label: label.to_string(),
                reason: e.to_string(),
            })
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// A point with the label and street it was recorded under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub point: GeoPoint,
    pub label: Option<String>,
    pub street: Option<String>,
}

/// One company office with validated coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub company: String,
    pub city: String,
    pub street: Option<String>,
    pub point: GeoPoint,
}

impl Office {
    #[must_use]
    pub fn to_labeled_point(&self) -> LabeledPoint {
        LabeledPoint {
            point: self.point,
            label: Some(self.company.clone()),
            street: self.street.clone(),
        }
    }
}

/// A point of interest returned by the places API, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedVenue {
    /// Provider-assigned place ID.
    pub fsq_id: String,
    /// Category slug from `categories.yaml`.
    pub category: String,
    pub name: String,
    pub address: Option<String>,
    /// Locality reported by the provider; used for per-city counting.
    pub locality: Option<String>,
    pub point: GeoPoint,
    /// The city whose covering circle produced this result.
    pub search_city: String,
}
