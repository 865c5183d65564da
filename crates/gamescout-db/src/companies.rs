//! Database operations for the `companies` and `offices` tables.

use chrono::{DateTime, Utc};
use gamescout_core::{GeoPoint, Office, ValidationError};
use sqlx::PgPool;

use crate::DbError;

/// Input record for one office of an imported company.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOffice {
    pub city: String,
    pub street: Option<String>,
    pub point: GeoPoint,
}

/// An office joined with its company name, as read back for analysis.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OfficeRow {
    pub office_id: i64,
    pub company: String,
    pub city: String,
    pub street: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OfficeRow> for Office {
    type Error = ValidationError;

    fn try_from(row: OfficeRow) -> Result<Self, Self::Error> {
        let point = GeoPoint::new(row.latitude, row.longitude).map_err(|e| {
            ValidationError::Record {
                label: row.company.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Office {
            company: row.company,
            city: row.city,
            street: row.street,
            point,
        })
    }
}

/// Insert a company or refresh its `tag_list`, returning its `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_company(
    pool: &PgPool,
    name: &str,
    tag_list: Option<&str>,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO companies (name, tag_list) \
         VALUES ($1, $2) \
         ON CONFLICT (name) DO UPDATE SET \
             tag_list   = EXCLUDED.tag_list, \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(name)
    .bind(tag_list)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Replace every office of `company_id` with `offices`.
///
/// Delete and batch insert run in one transaction, so a re-import of the same
/// export leaves the table unchanged. Returns the number of offices inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the transaction is
/// rolled back.
pub async fn replace_offices(
    pool: &PgPool,
    company_id: i64,
    offices: &[NewOffice],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM offices WHERE company_id = $1")
        .bind(company_id)
        .execute(&mut *tx)
        .await?;

    let inserted = if offices.is_empty() {
        0
    } else {
        let cities: Vec<&str> = offices.iter().map(|o| o.city.as_str()).collect();
        let streets: Vec<Option<&str>> = offices.iter().map(|o| o.street.as_deref()).collect();
        let latitudes: Vec<f64> = offices.iter().map(|o| o.point.latitude).collect();
        let longitudes: Vec<f64> = offices.iter().map(|o| o.point.longitude).collect();

        sqlx::query(
            "INSERT INTO offices (company_id, city, street, latitude, longitude) \
             SELECT $1, * FROM UNNEST($2::text[], $3::text[], $4::float8[], $5::float8[])",
        )
        .bind(company_id)
        .bind(&cities)
        .bind(&streets)
        .bind(&latitudes)
        .bind(&longitudes)
        .execute(&mut *tx)
        .await?
        .rows_affected()
    };

    tx.commit().await?;
    Ok(inserted)
}

/// Offices of companies whose `tag_list` contains `tag` (case-insensitive),
/// optionally restricted to `cities`.
///
/// Offices without coordinates are excluded. Ordered by company name
/// descending, then insertion order, which fixes the point order fed into the
/// summarizer.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_offices_by_tag(
    pool: &PgPool,
    tag: &str,
    cities: Option<&[String]>,
) -> Result<Vec<OfficeRow>, DbError> {
    let rows = sqlx::query_as::<_, OfficeRow>(
        "SELECT o.id AS office_id, c.name AS company, o.city, o.street, \
                o.latitude, o.longitude, o.created_at \
         FROM offices o \
         JOIN companies c ON c.id = o.company_id \
         WHERE strpos(lower(COALESCE(c.tag_list, '')), lower($1)) > 0 \
           AND o.latitude IS NOT NULL \
           AND o.longitude IS NOT NULL \
           AND ($2::text[] IS NULL OR o.city = ANY($2::text[])) \
         ORDER BY c.name DESC, o.id",
    )
    .bind(tag)
    .bind(cities)
    .fetch_all(pool)
    .await?;

    tracing::debug!(tag, rows = rows.len(), "loaded tagged offices");
    Ok(rows)
}

/// Number of companies, optionally only those whose `tag_list` contains `tag`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_companies(pool: &PgPool, tag: Option<&str>) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM companies \
         WHERE $1::text IS NULL \
            OR strpos(lower(COALESCE(tag_list, '')), lower($1::text)) > 0",
    )
    .bind(tag)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
