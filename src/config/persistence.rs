//! Report persistence module
//!
//! Handles saving, loading, and rotation of benchmark run reports.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::models::RunReport;
use crate::{LogBenchError, Result, APP_NAME, MAX_REPORT_HISTORY, REPORTS_FILE};

/// Report storage manager
#[derive(Debug)]
pub struct ReportStorage {
    reports_path: PathBuf,
}

/// Reports file structure for JSON persistence
#[derive(Debug, Serialize, Deserialize)]
struct ReportsFile {
    version: u32,
    reports: Vec<RunReport>,
}

impl ReportStorage {
    /// Create a new report storage manager at the standard location
    pub fn new() -> Result<Self> {
        let reports_path = Self::reports_file_path()?;
        Ok(Self { reports_path })
    }

    /// Create a storage manager backed by an explicit file path
    pub fn at(reports_path: PathBuf) -> Self {
        Self { reports_path }
    }

    /// Get the standard reports file path
    /// Uses $DATA_HOME/logbench/reports.json or the platform equivalent
    pub fn reports_file_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            LogBenchError::PersistenceError("Unable to determine data directory".to_string())
        })?;

        Ok(data_dir.join(APP_NAME).join(REPORTS_FILE))
    }

    /// Load all reports from the reports file
    pub fn load_reports(&self) -> Result<Vec<RunReport>> {
        if !self.reports_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.reports_path).map_err(|e| {
            LogBenchError::PersistenceError(format!(
                "Failed to read reports file {}: {}",
                self.reports_path.display(),
                e
            ))
        })?;

        let reports_file: ReportsFile = serde_json::from_str(&content).map_err(|e| {
            LogBenchError::PersistenceError(format!(
                "Failed to parse reports file {}: {}",
                self.reports_path.display(),
                e
            ))
        })?;

        Ok(reports_file.reports)
    }

    /// Append a new report to the reports file
    /// Automatically rotates old reports if the file exceeds MAX_REPORT_HISTORY entries
    pub fn append_report(&self, report: RunReport) -> Result<()> {
        let mut reports = self.load_reports()?;

        reports.push(report);

        if reports.len() > MAX_REPORT_HISTORY {
            let skip_count = reports.len() - MAX_REPORT_HISTORY;
            reports = reports.into_iter().skip(skip_count).collect();
        }

        self.save_reports(reports)
    }

    /// Save all reports to the reports file
    fn save_reports(&self, reports: Vec<RunReport>) -> Result<()> {
        if let Some(parent) = self.reports_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LogBenchError::PersistenceError(format!(
                    "Failed to create reports directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let reports_file = ReportsFile {
            version: 1,
            reports,
        };

        let content = serde_json::to_string_pretty(&reports_file).map_err(|e| {
            LogBenchError::PersistenceError(format!("Failed to serialize reports: {}", e))
        })?;

        fs::write(&self.reports_path, content).map_err(|e| {
            LogBenchError::PersistenceError(format!(
                "Failed to write reports file {}: {}",
                self.reports_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get the number of stored reports
    pub fn count_reports(&self) -> Result<usize> {
        let reports = self.load_reports()?;
        Ok(reports.len())
    }

    /// Get the most recent N reports
    pub fn get_recent_reports(&self, count: usize) -> Result<Vec<RunReport>> {
        let reports = self.load_reports()?;

        if reports.len() <= count {
            Ok(reports)
        } else {
            let skip_count = reports.len() - count;
            Ok(reports.into_iter().skip(skip_count).collect())
        }
    }

    /// Get the reports file path for external access
    pub fn reports_path(&self) -> &PathBuf {
        &self.reports_path
    }
}
