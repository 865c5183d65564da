//! Offline unit tests for gamescout-db pool configuration and row types.
//! These tests do not require a live database connection.

use gamescout_core::{AppConfig, Environment, Office, ValidationError};
use gamescout_db::{CollectionRunRow, OfficeRow, PoolConfig, VenueRow};
use std::path::PathBuf;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        categories_path: PathBuf::from("./config/categories.yaml"),
        foursquare_api_key: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        places_request_timeout_secs: 30,
        places_user_agent: "ua".to_string(),
        places_max_retries: 3,
        places_retry_backoff_base_ms: 1_000,
        places_max_concurrent: 1,
        places_result_limit: 50,
        search_radius_divisor: 4.0,
        company_tag: "gaming".to_string(),
        top_cities: 3,
        outlier_threshold_degrees: 0.05,
        outlier_threshold_meters: None,
        degrees_to_meters: 111_320.0,
    }
}

fn office_row(latitude: f64, longitude: f64) -> OfficeRow {
    OfficeRow {
        office_id: 1,
        company: "Zynga".to_string(),
        city: "San Francisco".to_string(),
        street: Some("699 8th St".to_string()),
        latitude,
        longitude,
        created_at: chrono::Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`CollectionRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn collection_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = CollectionRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        status: "queued".to_string(),
        started_at: None,
        completed_at: None,
        venues_found: 0_i32,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.status, "queued");
    assert!(row.started_at.is_none());
    assert_eq!(row.venues_found, 0);
}

#[test]
fn office_row_converts_into_office() {
    let office = Office::try_from(office_row(37.7749, -122.4194)).unwrap();
    assert_eq!(office.company, "Zynga");
    assert_eq!(office.city, "San Francisco");
    assert_eq!(office.street.as_deref(), Some("699 8th St"));
    assert!((office.point.latitude - 37.7749).abs() < f64::EPSILON);
}

#[test]
fn office_row_with_bad_coordinates_names_company() {
    let err = Office::try_from(office_row(95.0, 0.0)).unwrap_err();
    assert!(
        matches!(err, ValidationError::Record { ref label, .. } if label == "Zynga"),
        "got {err:?}"
    );
}

#[test]
fn venue_row_point_validates() {
    let now = chrono::Utc::now();
    let mut row = VenueRow {
        id: 1,
        fsq_id: "5a1".to_string(),
        category: "coffee".to_string(),
        name: "Starbucks".to_string(),
        address: None,
        locality: Some("San Francisco".to_string()),
        latitude: 37.7751,
        longitude: -122.418,
        search_city: "San Francisco".to_string(),
        collection_run_id: None,
        first_seen_at: now,
        last_seen_at: now,
    };
    assert!(row.point().is_ok());
    row.longitude = 200.0;
    assert!(row.point().is_err());
}
