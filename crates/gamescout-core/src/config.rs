use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn invalid(var: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e))
    };

    let parse_positive_f64 = |var: &str, raw: &str| -> Result<f64, ConfigError> {
        let value = raw.parse::<f64>().map_err(|e| invalid(var, e))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(var, "must be a positive number"));
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("GAMESCOUT_ENV", "development"))?;

    let log_level = or_default("GAMESCOUT_LOG_LEVEL", "info");
    let categories_path = PathBuf::from(or_default(
        "GAMESCOUT_CATEGORIES_PATH",
        "./config/categories.yaml",
    ));
    let foursquare_api_key = lookup("FOURSQUARE_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());

    let db_max_connections = parse_u32("GAMESCOUT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("GAMESCOUT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("GAMESCOUT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let places_request_timeout_secs = parse_u64("GAMESCOUT_PLACES_REQUEST_TIMEOUT_SECS", "30")?;
    let places_user_agent = or_default("GAMESCOUT_PLACES_USER_AGENT", "gamescout/0.1 (city-analysis)");
    let places_max_retries = parse_u32("GAMESCOUT_PLACES_MAX_RETRIES", "3")?;
    let places_retry_backoff_base_ms = parse_u64("GAMESCOUT_PLACES_RETRY_BACKOFF_BASE_MS", "1000")?;
    let places_max_concurrent = parse_usize("GAMESCOUT_PLACES_MAX_CONCURRENT", "1")?;
    let places_result_limit = parse_u32("GAMESCOUT_PLACES_RESULT_LIMIT", "50")?;
    if !(1..=50).contains(&places_result_limit) {
        return Err(invalid("GAMESCOUT_PLACES_RESULT_LIMIT", "must be between 1 and 50"));
    }

    let search_radius_divisor = parse_positive_f64(
        "GAMESCOUT_SEARCH_RADIUS_DIVISOR",
        &or_default("GAMESCOUT_SEARCH_RADIUS_DIVISOR", "4"),
    )?;

    let company_tag = or_default("GAMESCOUT_COMPANY_TAG", "gaming");
    if company_tag.trim().is_empty() {
        return Err(invalid("GAMESCOUT_COMPANY_TAG", "must be non-empty"));
    }
    let top_cities = parse_usize("GAMESCOUT_TOP_CITIES", "3")?;

    let outlier_threshold_degrees = parse_positive_f64(
        "GAMESCOUT_OUTLIER_THRESHOLD_DEGREES",
        &or_default("GAMESCOUT_OUTLIER_THRESHOLD_DEGREES", "0.05"),
    )?;
    let outlier_threshold_meters = match lookup("GAMESCOUT_OUTLIER_THRESHOLD_METERS") {
        Ok(raw) => Some(parse_positive_f64("GAMESCOUT_OUTLIER_THRESHOLD_METERS", &raw)?),
        Err(_) => None,
    };
    let degrees_to_meters = parse_positive_f64(
        "GAMESCOUT_DEGREES_TO_METERS",
        &or_default("GAMESCOUT_DEGREES_TO_METERS", "111320"),
    )?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        categories_path,
        foursquare_api_key,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        places_request_timeout_secs,
        places_user_agent,
        places_max_retries,
        places_retry_backoff_base_ms,
        places_max_concurrent,
        places_result_limit,
        search_radius_divisor,
        company_tag,
        top_cities,
        outlier_threshold_degrees,
        outlier_threshold_meters,
        degrees_to_meters,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values are rejected rather than silently defaulting.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(invalid(
            "GAMESCOUT_ENV",
            format!("unknown environment '{other}'"),
        )),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
