//! `IErrorReporter` implementation
//!
//! Every capture is logged. When a report store is configured, reports that
//! pass [`ErrorReport::should_persist`] are also written to disk. Failing to
//! write a report is logged and otherwise ignored.

use std::sync::atomic::{AtomicU64, Ordering};

use kdrive_core::config::TelemetryConfig;
use kdrive_core::ports::{ErrorContext, IErrorReporter};
use tracing::{info, warn};

use crate::error_report::ErrorReport;
use crate::store::LocalReportStore;

pub struct TelemetryReporter {
    store: Option<LocalReportStore>,
    errors: AtomicU64,
    anomalies: AtomicU64,
}

impl TelemetryReporter {
    /// Reporter that only logs
    pub fn new() -> Self {
        Self {
            store: None,
            errors: AtomicU64::new(0),
            anomalies: AtomicU64::new(0),
        }
    }

    pub fn with_store(store: LocalReportStore) -> Self {
        Self {
            store: Some(store),
            ..Self::new()
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        if config.enabled {
            Self::with_store(LocalReportStore::new(config.reports_dir.clone()))
        } else {
            Self::new()
        }
    }

    pub fn errors_captured(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn anomalies_captured(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }

    fn persist(&self, report: &ErrorReport) {
        let Some(store) = &self.store else {
            return;
        };
        if !report.should_persist() {
            return;
        }
        match store.save(report) {
            Ok(path) => info!(id = %report.id, path = %path.display(), "Report saved"),
            Err(e) => warn!(error = %e, "Failed to save report"),
        }
    }
}

impl Default for TelemetryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl IErrorReporter for TelemetryReporter {
    fn capture_error(&self, error: &anyhow::Error, context: &ErrorContext) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!(error = %format!("{error:#}"), context = %context, "Captured error");
        self.persist(&ErrorReport::from_error(error, context));
    }

    fn capture_anomaly(&self, message: &str, context: &ErrorContext) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
        warn!(anomaly = message, context = %context, "Captured anomaly");
        self.persist(&ErrorReport::anomaly(message, context));
    }
}
