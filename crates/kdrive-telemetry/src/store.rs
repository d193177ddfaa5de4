//! Local report storage
//!
//! Keeps one JSON file per report, named `{kind}-{YYYYMMDD}-{id}.json`, in
//! the configured reports directory (`telemetry.reports_dir`).

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error_report::ErrorReport;
use crate::TelemetryError;

/// Entry in the local report store
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub id: String,
    pub kind: String,
    pub date: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// Manages the local directory of report files.
pub struct LocalReportStore {
    reports_dir: PathBuf,
}

impl LocalReportStore {
    /// Creates a new store pointing at `reports_dir`.
    pub fn new(reports_dir: PathBuf) -> Self {
        Self { reports_dir }
    }

    /// Writes `report`, creating the directory on first use.
    pub fn save(&self, report: &ErrorReport) -> Result<PathBuf, TelemetryError> {
        std::fs::create_dir_all(&self.reports_dir)?;
        let date = Utc::now().format("%Y%m%d");
        let path = self
            .reports_dir
            .join(format!("{}-{}-{}.json", report.kind, date, report.id));
        std::fs::write(&path, serde_json::to_vec_pretty(report)?)?;
        tracing::debug!(path = %path.display(), "Saved report");
        Ok(path)
    }

    /// List all report files, newest first.
    pub fn list(&self) -> Result<Vec<ReportEntry>, TelemetryError> {
        if !self.reports_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.reports_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }

            let stem = path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let (kind, date, id) = parse_report_filename(&stem);
            entries.push(ReportEntry {
                id,
                kind,
                date,
                size_bytes: entry.metadata()?.len(),
                path,
            });
        }

        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    /// Read a report by its id.
    pub fn read(&self, id: &str) -> Result<Option<ErrorReport>, TelemetryError> {
        let Some(entry) = self.find(id)? else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(&entry.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Delete a report by its id.
    pub fn delete(&self, id: &str) -> Result<bool, TelemetryError> {
        match self.find(id)? {
            Some(entry) => {
                std::fs::remove_file(&entry.path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete all reports.
    pub fn delete_all(&self) -> Result<u32, TelemetryError> {
        let mut count = 0;
        for entry in self.list()? {
            if std::fs::remove_file(&entry.path).is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    fn find(&self, id: &str) -> Result<Option<ReportEntry>, TelemetryError> {
        Ok(self.list()?.into_iter().find(|entry| entry.id == id))
    }
}

/// Parse a report filename like `anomaly-20260207-<uuid>` into (kind, date, id).
///
/// The id keeps its own dashes.
fn parse_report_filename(stem: &str) -> (String, String, String) {
    let parts: Vec<&str> = stem.splitn(3, '-').collect();
    match parts.len() {
        3 => (
            parts[0].to_string(),
            parts[1].to_string(),
            parts[2].to_string(),
        ),
        2 => (parts[0].to_string(), parts[1].to_string(), stem.to_string()),
        _ => ("unknown".to_string(), String::new(), stem.to_string()),
    }
}
