//! kDrive Telemetry - Error and anomaly reporting
//!
//! Provides:
//! - `ErrorReport`: A swallowed error or data anomaly with its context tags
//! - `LocalReportStore`: File-based report management
//! - `TelemetryReporter`: The `IErrorReporter` used by the cache and sync layers

pub mod error_report;
pub mod reporter;
pub mod store;

pub use error_report::{ErrorReport, ReportKind};
pub use reporter::TelemetryReporter;
pub use store::{LocalReportStore, ReportEntry};

use thiserror::Error;

/// Errors raised while persisting or reading reports
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed report: {0}")]
    Json(#[from] serde_json::Error),
}
