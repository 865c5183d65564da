use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub categories_path: PathBuf,
    pub foursquare_api_key: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub places_request_timeout_secs: u64,
    pub places_user_agent: String,
    pub places_max_retries: u32,
    pub places_retry_backoff_base_ms: u64,
    pub places_max_concurrent: usize,
    pub places_result_limit: u32,
    pub search_radius_divisor: f64,
    pub company_tag: String,
    pub top_cities: usize,
    pub outlier_threshold_degrees: f64,
    /// When set, outliers are filtered by geodesic distance instead of degrees.
    pub outlier_threshold_meters: Option<f64>,
    pub degrees_to_meters: f64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("categories_path", &self.categories_path)
            .field("database_url", &"[redacted]")
            .field(
                "foursquare_api_key",
                &self.foursquare_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "places_request_timeout_secs",
                &self.places_request_timeout_secs,
            )
            .field("places_user_agent", &self.places_user_agent)
            .field("places_max_retries", &self.places_max_retries)
            .field(
                "places_retry_backoff_base_ms",
                &self.places_retry_backoff_base_ms,
            )
            .field("places_max_concurrent", &self.places_max_concurrent)
            .field("places_result_limit", &self.places_result_limit)
            .field("search_radius_divisor", &self.search_radius_divisor)
            .field("company_tag", &self.company_tag)
            .field("top_cities", &self.top_cities)
            .field("outlier_threshold_degrees", &self.outlier_threshold_degrees)
            .field("outlier_threshold_meters", &self.outlier_threshold_meters)
            .field("degrees_to_meters", &self.degrees_to_meters)
            .finish()
    }
}
