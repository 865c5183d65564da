//! HTTP client for the Foursquare Places v3 API.
//!
//! Wraps `reqwest` with key management, status-code mapping and retry. Only
//! `places/search` is used by the collector.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};

use crate::error::PlacesError;
use crate::retry::retry_with_backoff;
use crate::types::{Place, SearchRequest, SearchResponse};

const DEFAULT_BASE_URL: &str = "https://api.foursquare.com/v3/";

/// Client for the Foursquare Places API.
///
/// Use [`PlacesClient::new`] for production or [`PlacesClient::with_base_url`]
/// to point at a mock server in tests.
pub struct PlacesClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PlacesClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, PlacesError> {
        Self::with_base_url(
            api_key,
            timeout_secs,
            user_agent,
            max_retries,
            backoff_base_ms,
            DEFAULT_BASE_URL,
        )
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`PlacesError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
        base_url: &str,
    ) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so relative endpoint paths append to the
        // base path instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PlacesError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Searches for places matching `request`.
    ///
    /// Transient failures (network, 5xx, 429) are retried with back-off.
    ///
    /// # Errors
    ///
    /// - [`PlacesError::Unauthorized`] when the key is rejected.
    /// - [`PlacesError::RateLimited`] / [`PlacesError::UnexpectedStatus`] /
    ///   [`PlacesError::Http`] once retries are exhausted.
    /// - [`PlacesError::Deserialize`] if the body does not match the
    ///   expected shape.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Place>, PlacesError> {
        let pairs = request.query_pairs();
        let url = self.build_url("places/search", &pairs)?;
        let context = format!("places/search(query={}, ll={})", request.query, request.center);

        let response: SearchResponse = retry_with_backoff(
            self.max_retries,
            self.backoff_base_ms,
            || self.request_json(&url, &context),
        )
        .await?;

        tracing::debug!(
            query = %request.query,
            ll = %request.center,
            radius = request.radius_meters,
            results = response.results.len(),
            "places search complete"
        );
        Ok(response.results)
    }

    /// Builds the endpoint URL with properly percent-encoded query parameters.
    fn build_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, PlacesError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| PlacesError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Sends one authorized GET, maps the status code and parses the body.
    async fn request_json<T>(&self, url: &Url, context: &str) -> Result<T, PlacesError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, &self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PlacesError::Unauthorized(status.as_u16()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(PlacesError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(PlacesError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| PlacesError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }
}
