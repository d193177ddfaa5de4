//! kDrive API - REST client for the kDrive file endpoints
//!
//! Provides async client for:
//! - Cursor-paginated folder listings and special folder listings
//! - File details
//! - The per-folder activity feed
//! - The mutations written through to the local mirror (rename, trash,
//!   color, favorites, dropbox)
//!
//! Authentication is out of scope: the client is handed a valid bearer token.
//!
//! ## Modules
//!
//! - [`client`] - HTTP client, response envelope and 429 handling
//! - [`models`] - Wire DTOs and their mapping to domain types
//! - [`provider`] - [`KDriveApi`], the `IDriveApi` port implementation

pub mod client;
pub mod models;
pub mod provider;

pub use client::KDriveClient;
pub use provider::KDriveApi;

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when communicating with the kDrive API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The bearer token is invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded and retries exhausted
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the server asked to wait
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// The server answered with `result: "error"`
    #[error("API error {code}: {description}")]
    Api {
        /// Machine-readable error code
        code: String,
        /// Human-readable description
        description: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// True for failures a later retry may not hit (network, 5xx, throttling)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::NetworkError(_) | ApiError::ServerError(_) | ApiError::TooManyRequests { .. }
        )
    }
}
