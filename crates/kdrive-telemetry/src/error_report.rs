//! Error report generation
//!
//! Turns what the layers hand to `IErrorReporter` into a serializable report.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use chrono::Utc;
use kdrive_core::ports::ErrorContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// A failure that was swallowed to keep an operation going
    Error,
    /// Unexpected data that did not raise an error
    Anomaly,
}

impl Display for ReportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Error => write!(f, "error"),
            ReportKind::Anomaly => write!(f, "anomaly"),
        }
    }
}

/// A structured, non-fatal report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub id: String,
    pub timestamp: String,
    pub version: String,
    pub kind: ReportKind,
    pub operation: String,
    pub message: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub chain: Vec<String>,
}

impl ErrorReport {
    /// Create a new report for `operation`.
    pub fn new(kind: ReportKind, operation: &str, message: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            kind,
            operation: operation.to_string(),
            message: message.to_string(),
            tags: BTreeMap::new(),
            chain: Vec::new(),
        }
    }

    /// Report for a swallowed error; its causes become the chain.
    pub fn from_error(error: &anyhow::Error, context: &ErrorContext) -> Self {
        let chain = error.chain().skip(1).map(|cause| cause.to_string()).collect();
        Self::new(ReportKind::Error, &context.operation, &error.to_string())
            .with_tags(context.tags.clone())
            .with_chain(chain)
    }

    pub fn anomaly(message: &str, context: &ErrorContext) -> Self {
        Self::new(ReportKind::Anomaly, &context.operation, message).with_tags(context.tags.clone())
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Add an error chain entry.
    pub fn with_chain(mut self, chain: Vec<String>) -> Self {
        self.chain = chain;
        self
    }

    /// Whether the report is worth keeping on disk.
    ///
    /// Anomalies always are. Errors are not when the message names a transient
    /// network condition that the next fetch is expected to clear.
    pub fn should_persist(&self) -> bool {
        match self.kind {
            ReportKind::Anomaly => true,
            ReportKind::Error => {
                !is_transient(&self.message) && !self.chain.iter().any(|c| is_transient(c))
            }
        }
    }
}

/// Excludes timeouts, refused connections and rate limiting.
fn is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
        || lower.contains("429")
}
