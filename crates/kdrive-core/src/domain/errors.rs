//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! such as parsing identifiers and user-supplied enumerations.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// A composite `{id}_{driveId}` key could not be parsed
    #[error("Invalid uid: {0}")]
    InvalidUid(String),

    /// Unknown sort order name
    #[error("Unknown sort type: {0}")]
    InvalidSortType(String),

    /// Unknown special folder name
    #[error("Unknown special folder: {0}")]
    InvalidSpecialFolder(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
