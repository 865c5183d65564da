//! Database operations for the `venues` table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use gamescout_core::{GeoPoint, NormalizedVenue, ValidationError};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `venues` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VenueRow {
    pub id: i64,
    pub fsq_id: String,
    pub category: String,
    pub name: String,
    pub address: Option<String>,
    pub locality: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub search_city: String,
    pub collection_run_id: Option<i64>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl VenueRow {
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the stored coordinates are out of range.
    pub fn point(&self) -> Result<GeoPoint, ValidationError> {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Venue count for one `(locality, category)` pair.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LocalityCountRow {
    pub locality: String,
    pub category: String,
    pub count: i64,
}

/// Insert new venues and refresh existing ones, keyed on `(fsq_id, category)`.
///
/// Returns `(new_count, updated_count)`. A place listed twice in the same
/// batch is written once (first occurrence wins), since Postgres rejects an
/// `ON CONFLICT DO UPDATE` that touches the same row twice.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_venues(
    pool: &PgPool,
    run_id: Option<i64>,
    venues: &[NormalizedVenue],
) -> Result<(u64, u64), DbError> {
    let mut seen = HashSet::new();
    let batch: Vec<&NormalizedVenue> = venues
        .iter()
        .filter(|v| seen.insert((v.fsq_id.as_str(), v.category.as_str())))
        .collect();

    if batch.is_empty() {
        return Ok((0, 0));
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut fsq_ids: Vec<&str> = Vec::with_capacity(batch.len());
    let mut categories: Vec<&str> = Vec::with_capacity(batch.len());
    let mut names: Vec<&str> = Vec::with_capacity(batch.len());
    let mut addresses: Vec<Option<&str>> = Vec::with_capacity(batch.len());
    let mut localities: Vec<Option<&str>> = Vec::with_capacity(batch.len());
    let mut latitudes: Vec<f64> = Vec::with_capacity(batch.len());
    let mut longitudes: Vec<f64> = Vec::with_capacity(batch.len());
    let mut search_cities: Vec<&str> = Vec::with_capacity(batch.len());

    for venue in &batch {
        fsq_ids.push(&venue.fsq_id);
        categories.push(&venue.category);
        names.push(&venue.name);
        addresses.push(venue.address.as_deref());
        localities.push(venue.locality.as_deref());
        latitudes.push(venue.point.latitude);
        longitudes.push(venue.point.longitude);
        search_cities.push(&venue.search_city);
    }

    let rows: Vec<bool> = sqlx::query_scalar::<_, bool>(
        "INSERT INTO venues \
             (collection_run_id, fsq_id, category, name, address, locality, \
              latitude, longitude, search_city) \
         SELECT $1, * FROM UNNEST(\
              $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], \
              $7::float8[], $8::float8[], $9::text[]) \
         ON CONFLICT (fsq_id, category) DO UPDATE SET \
             collection_run_id = COALESCE(EXCLUDED.collection_run_id, venues.collection_run_id), \
             name              = EXCLUDED.name, \
             address           = EXCLUDED.address, \
             locality          = EXCLUDED.locality, \
             latitude          = EXCLUDED.latitude, \
             longitude         = EXCLUDED.longitude, \
             search_city       = EXCLUDED.search_city, \
             last_seen_at      = NOW() \
         RETURNING (xmax = 0) AS is_new",
    )
    .bind(run_id)
    .bind(&fsq_ids)
    .bind(&categories)
    .bind(&names)
    .bind(&addresses)
    .bind(&localities)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&search_cities)
    .fetch_all(pool)
    .await?;

    let new_count = rows.iter().filter(|&&is_new| is_new).count() as u64;
    let updated_count = rows.len() as u64 - new_count;

    Ok((new_count, updated_count))
}

/// Venue counts per `(locality, category)` for the given localities.
///
/// Localities with no venues produce no rows; callers treat a missing pair
/// as zero.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_venues_by_locality(
    pool: &PgPool,
    cities: &[String],
) -> Result<Vec<LocalityCountRow>, DbError> {
    let rows = sqlx::query_as::<_, LocalityCountRow>(
        "SELECT locality, category, COUNT(*) AS count \
         FROM venues \
         WHERE locality = ANY($1::text[]) \
         GROUP BY locality, category \
         ORDER BY locality, category",
    )
    .bind(cities)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All venues, optionally only those reported in `locality`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_venues(pool: &PgPool, locality: Option<&str>) -> Result<Vec<VenueRow>, DbError> {
    let rows = sqlx::query_as::<_, VenueRow>(
        "SELECT id, fsq_id, category, name, address, locality, latitude, longitude, \
                search_city, collection_run_id, first_seen_at, last_seen_at \
         FROM venues \
         WHERE $1::text IS NULL OR locality = $1::text \
         ORDER BY locality NULLS LAST, category, name, id",
    )
    .bind(locality)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
