//! kDrive HTTP client
//!
//! Wraps `reqwest` with the bearer header, base URL construction, the
//! `{ result, data, ... }` response envelope and 429 back-off.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kdrive_api::client::KDriveClient;
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), kdrive_api::ApiError> {
//! let client = KDriveClient::new("access-token-here");
//! let envelope = client
//!     .send::<serde_json::Value>(Method::GET, "/3/drive/42/files/1", &[], None)
//!     .await?;
//! println!("{:?}", envelope.data);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use kdrive_core::config::ApiConfig;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::ApiError;

/// Base URL of the Infomaniak API
pub const DEFAULT_BASE_URL: &str = "https://api.infomaniak.com";

/// Default retry-after duration when header is missing (30 seconds)
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Maximum number of retries for 429 responses
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Retry-After values further out than this are ignored
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

// ============================================================================
// Response envelope
// ============================================================================

/// Error object of a failed call
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// Every kDrive response is wrapped in this object
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// `"success"` or `"error"`
    pub result: String,
    pub data: Option<T>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
    /// Server timestamp, unix seconds
    #[serde(default)]
    pub response_at: Option<i64>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.result == "success"
    }

    /// Unwraps `data`, turning an error result or a missing payload into `ApiError`
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.is_success() {
            return Err(envelope_error(self.error));
        }
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("envelope without data".to_string()))
    }
}

fn envelope_error(error: Option<ErrorBody>) -> ApiError {
    match error {
        Some(body) => ApiError::Api {
            code: body.code,
            description: body.description,
        },
        None => ApiError::InvalidResponse("error result without error object".to_string()),
    }
}

// ============================================================================
// KDriveClient
// ============================================================================

/// HTTP client for kDrive API calls
pub struct KDriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    access_token: String,
    max_retries: u32,
}

impl KDriveClient {
    /// Creates a client against the production API
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Creates a client from the `api` configuration section
    pub fn from_config(config: &ApiConfig, access_token: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Overrides how many times a throttled request is retried
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Updates the access token
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated KDriveClient access token");
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Sends a request and decodes the response envelope
    ///
    /// HTTP failures are mapped onto [`ApiError`]; a 2xx response whose
    /// envelope says `"error"` is returned as-is so callers can inspect it.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Envelope<T>, ApiError> {
        let response = self.execute_with_retry(method, path, query, body).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(status_error(status, path, response).await);
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("failed to decode response of {path}: {e}"))
        })
    }

    /// Executes an HTTP request with automatic 429 retry
    ///
    /// On HTTP 429 the `Retry-After` header is honored, then the request is
    /// sent again, at most `max_retries` times.
    pub async fn execute_with_retry(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ApiError> {
        let mut attempt = 0;
        loop {
            let mut request = self.request(method.clone(), path).query(query);
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(%method, path, attempt, "Sending request");
            let response = request.send().await?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                if attempt > 0 {
                    info!(path, attempt, "Request succeeded after retry");
                }
                return Ok(response);
            }

            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                .unwrap_or(DEFAULT_RETRY_AFTER);

            if attempt >= self.max_retries {
                warn!(path, attempts = attempt + 1, "429 retry limit exhausted");
                return Err(ApiError::TooManyRequests { retry_after });
            }

            info!(
                path,
                attempt,
                retry_after_ms = retry_after.as_millis() as u64,
                "Received 429, backing off"
            );
            tokio::time::sleep(retry_after).await;
            attempt += 1;
        }
    }
}

/// Maps a non-2xx response to an error, keeping the envelope description when present
async fn status_error(status: StatusCode, path: &str, response: Response) -> ApiError {
    let detail = match response.json::<Envelope<serde_json::Value>>().await {
        Ok(Envelope {
            error: Some(body), ..
        }) => format!("{path}: {} ({})", body.code, body.description),
        _ => format!("{path}: HTTP {status}"),
    };

    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(detail),
        StatusCode::FORBIDDEN => ApiError::Forbidden(detail),
        StatusCode::NOT_FOUND => ApiError::NotFound(detail),
        s if s.is_server_error() => ApiError::ServerError(detail),
        _ => ApiError::InvalidResponse(detail),
    }
}

/// Parses a `Retry-After` header value
///
/// Accepts delay-seconds or an HTTP-date. Dates in the past, or more than an
/// hour away, and unparseable values yield `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if let Ok(wait) = (target - now).to_std() {
            if wait <= MAX_RETRY_AFTER {
                return Duration::from_secs(wait.as_secs());
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
