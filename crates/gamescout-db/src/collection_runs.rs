//! Ledger of venue collection runs.
//!
//! A run moves `queued -> running -> succeeded | failed`. Each city it visits
//! gets one `collection_run_cities` row recording the circle that was
//! searched, the categories asked for and how many venues came back, so a
//! later run can be compared against an earlier one for the same city.

use chrono::{DateTime, Utc};
use gamescout_core::GeoPoint;
use sqlx::{postgres::PgQueryResult, PgPool};
use uuid::Uuid;

use crate::DbError;

/// A row from `collection_runs`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Sum of `venues_found` over the run's cities, set on completion.
    pub venues_found: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// How a single city fared within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityRunStatus {
    Succeeded,
    Failed,
    /// No office coordinates, so no circle to search.
    Skipped,
}

impl CityRunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// The covering circle of a city and the narrower radius sent to the
/// places API around its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    pub center: GeoPoint,
    pub radius_meters: f64,
    pub search_radius_meters: u32,
}

/// One city's outcome, as written by [`record_run_city`].
#[derive(Debug, Clone)]
pub struct RunCityOutcome<'a> {
    pub city: &'a str,
    pub status: CityRunStatus,
    /// `None` only for [`CityRunStatus::Skipped`].
    pub area: Option<SearchArea>,
    /// Category slugs searched, in configuration order.
    pub categories: &'a [String],
    pub venues_found: usize,
    pub error_message: Option<&'a str>,
}

/// A row from `collection_run_cities`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRunCityRow {
    pub id: i64,
    pub collection_run_id: i64,
    pub city: String,
    pub status: String,
    pub center_latitude: Option<f64>,
    pub center_longitude: Option<f64>,
    pub radius_meters: Option<f64>,
    pub search_radius_meters: Option<i32>,
    pub categories: Vec<String>,
    pub venues_found: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CollectionRunCityRow {
    /// The searched area, or `None` for a skipped city.
    #[must_use]
    pub fn area(&self) -> Option<SearchArea> {
        let center = GeoPoint::new(self.center_latitude?, self.center_longitude?).ok()?;
        Some(SearchArea {
            center,
            radius_meters: self.radius_meters?,
            search_radius_meters: u32::try_from(self.search_radius_meters?).ok()?,
        })
    }
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// A guarded `UPDATE ... WHERE status = <expected>` that touched nothing means
/// the run was not in the expected status (or does not exist).
fn require_transition(
    result: &PgQueryResult,
    id: i64,
    expected_status: &'static str,
) -> Result<(), DbError> {
    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCollectionRunTransition {
            id,
            expected_status,
        });
    }
    Ok(())
}

/// Queues a new venue collection run.
///
/// `public_id` is generated here so callers can log it before any city is
/// searched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_collection_run(pool: &PgPool) -> Result<CollectionRunRow, DbError> {
    let row = sqlx::query_as::<_, CollectionRunRow>(
        "INSERT INTO collection_runs (public_id) VALUES ($1) \
         RETURNING id, public_id, status, started_at, completed_at, \
                   venues_found, error_message, created_at",
    )
    .bind(Uuid::new_v4())
    .fetch_one(pool)
    .await?;

    tracing::debug!(run_id = row.id, public_id = %row.public_id, "queued collection run");
    Ok(row)
}

/// Moves a queued run to `running`.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] unless the run is
/// `queued`, or [`DbError::Sqlx`] if the update fails.
pub async fn start_collection_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    require_transition(&result, id, "queued")
}

/// Marks a running run `succeeded` and totals the venues its cities found.
///
/// Returns the total stored on the run.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] unless the run is
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_collection_run(pool: &PgPool, id: i64) -> Result<i32, DbError> {
    let total = sqlx::query_scalar::<_, i32>(
        "UPDATE collection_runs SET \
             status = 'succeeded', \
             completed_at = NOW(), \
             venues_found = ( \
                 SELECT COALESCE(SUM(venues_found), 0)::INTEGER \
                 FROM collection_run_cities WHERE collection_run_id = $1 \
             ) \
         WHERE id = $1 AND status = 'running' \
         RETURNING venues_found",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::InvalidCollectionRunTransition {
        id,
        expected_status: "running",
    })?;

    Ok(total)
}

/// Marks a running run `failed` with the reason.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] unless the run is
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_collection_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $2 \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(error_message)
    .execute(pool)
    .await?;

    require_transition(&result, id, "running")
}

/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown `id`, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_collection_run(pool: &PgPool, id: i64) -> Result<CollectionRunRow, DbError> {
    sqlx::query_as::<_, CollectionRunRow>(
        "SELECT id, public_id, status, started_at, completed_at, \
                venues_found, error_message, created_at \
         FROM collection_runs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// The newest `limit` runs first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_collection_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<CollectionRunRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectionRunRow>(
        "SELECT id, public_id, status, started_at, completed_at, \
                venues_found, error_message, created_at \
         FROM collection_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Records where and what one city was searched for within a run.
///
/// Recording the same city twice in a run replaces the earlier outcome.
/// Only succeeded cities keep a venue count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the write fails, including when a searched
/// city has no area (rejected by the table's checks).
pub async fn record_run_city(
    pool: &PgPool,
    run_id: i64,
    outcome: &RunCityOutcome<'_>,
) -> Result<(), DbError> {
    let venues_found = if outcome.status == CityRunStatus::Succeeded {
        saturating_i32(outcome.venues_found)
    } else {
        0
    };
    let area = outcome.area;

    sqlx::query(
        "INSERT INTO collection_run_cities \
             (collection_run_id, city, status, center_latitude, center_longitude, \
              radius_meters, search_radius_meters, categories, venues_found, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (collection_run_id, city) DO UPDATE SET \
             status               = EXCLUDED.status, \
             center_latitude      = EXCLUDED.center_latitude, \
             center_longitude     = EXCLUDED.center_longitude, \
             radius_meters        = EXCLUDED.radius_meters, \
             search_radius_meters = EXCLUDED.search_radius_meters, \
             categories           = EXCLUDED.categories, \
             venues_found         = EXCLUDED.venues_found, \
             error_message        = EXCLUDED.error_message",
    )
    .bind(run_id)
    .bind(outcome.city)
    .bind(outcome.status.as_str())
    .bind(area.map(|a| a.center.latitude))
    .bind(area.map(|a| a.center.longitude))
    .bind(area.map(|a| a.radius_meters))
    .bind(area.map(|a| i32::try_from(a.search_radius_meters).unwrap_or(i32::MAX)))
    .bind(outcome.categories)
    .bind(venues_found)
    .bind(outcome.error_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Every city recorded for a run, alphabetically.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_run_cities(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<CollectionRunCityRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectionRunCityRow>(
        "SELECT id, collection_run_id, city, status, center_latitude, center_longitude, \
                radius_meters, search_radius_meters, categories, venues_found, \
                error_message, created_at \
         FROM collection_run_cities \
         WHERE collection_run_id = $1 \
         ORDER BY city",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
