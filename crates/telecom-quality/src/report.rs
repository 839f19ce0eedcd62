//! Cleaning report.
//!
//! A [`CleaningReport`] records what one pass of the
//! [`DataQualityTransformer`](crate::DataQualityTransformer) did: row counts,
//! per-column fill and outlier counts, and a readable step log. It serializes
//! to JSON for `--json` output and for the `<stem>_report.json` file.

use crate::error::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// A count attributed to one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCount {
    pub column: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Total execution time in milliseconds
    pub duration_ms: u64,
    pub rows_before: usize,
    pub rows_after: usize,
    /// Column names, unchanged by the pass
    pub columns: Vec<String>,
    pub duplicates_removed: usize,
    /// Rows dropped because the required column was missing
    pub rows_missing_required: usize,
    pub defaults_filled: Vec<ColumnCount>,
    pub means_imputed: Vec<ColumnCount>,
    pub outliers_replaced: Vec<ColumnCount>,
    /// Human-readable log of the steps taken
    pub steps: Vec<String>,
}

impl CleaningReport {
    pub(crate) fn start(rows: usize, columns: Vec<String>) -> Self {
        Self {
            generated_at: String::new(),
            duration_ms: 0,
            rows_before: rows,
            rows_after: rows,
            columns,
            duplicates_removed: 0,
            rows_missing_required: 0,
            defaults_filled: Vec::new(),
            means_imputed: Vec::new(),
            outliers_replaced: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub(crate) fn step(&mut self, message: impl Into<String>) {
        self.steps.push(message.into());
    }

    pub(crate) fn finish(mut self, rows_after: usize, duration_ms: u64) -> Self {
        self.rows_after = rows_after;
        self.duration_ms = duration_ms;
        self.generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self
    }

    pub fn rows_removed(&self) -> usize {
        self.rows_before - self.rows_after
    }

    /// Total values changed by fills, imputation and outlier replacement.
    pub fn values_changed(&self) -> usize {
        self.defaults_filled
            .iter()
            .chain(&self.means_imputed)
            .chain(&self.outliers_replaced)
            .map(|c| c.count)
            .sum()
    }

    /// Write the report as pretty JSON to `<output_dir>/<stem>_report.json`.
    pub fn write_to_file(&self, output_dir: &Path, stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(format!("{}_report.json", stem));
        let mut file = File::create(&path)?;
        file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        info!("Cleaning report written to {}", path.display());
        Ok(path)
    }
}
