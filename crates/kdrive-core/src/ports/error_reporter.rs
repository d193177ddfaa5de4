//! Error telemetry port
//!
//! Failures that the cache layer deliberately swallows (per-node storage
//! errors, data anomalies) are forwarded here with enough context to be
//! diagnosed later.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Operation name and tags attached to a report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub operation: String,
    pub tags: BTreeMap<String, String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Adds a tag
    pub fn tag(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.tags.insert(key.into(), value.to_string());
        self
    }
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        for (key, value) in &self.tags {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// Port trait for error telemetry
pub trait IErrorReporter: Send + Sync {
    /// Records a swallowed error
    fn capture_error(&self, error: &anyhow::Error, context: &ErrorContext);

    /// Records a data anomaly that did not raise an error
    fn capture_anomaly(&self, message: &str, context: &ErrorContext);
}
