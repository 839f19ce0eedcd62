//! Data-quality transformations.
//!
//! This module provides:
//! - Duplicate removal and required-attribute filtering ([`dedupe_and_require`])
//! - Constant fills for optional attributes ([`fill_default`])
//! - Mean imputation of numeric columns ([`fill_numeric_means`])
//! - IQR outlier replacement ([`treat_outliers_with_mean`])
//!
//! Every function takes the dataset by reference and returns a new one; the
//! input is never modified. [`DataQualityTransformer`] chains them according
//! to a [`CleaningConfig`].

mod dedupe;
mod fill;
mod imputer;
mod outliers;

pub use dedupe::{dedupe_and_require, drop_missing, remove_duplicates};
pub use fill::fill_default;
pub use imputer::{fill_column_mean, fill_numeric_means};
pub use outliers::{
    OutlierBounds, quantile_sorted, replace_outliers, treat_column_outliers,
    treat_outliers_with_mean, treat_series_outliers,
};

use crate::config::CleaningConfig;
use crate::error::{Result, ResultExt};
use crate::report::{CleaningReport, ColumnCount};
use crate::schema::DatasetSchema;
use crate::utils::{
    column_names, ensure_column, ensure_numeric_column, missing_count, numeric_column_names,
};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Result of a cleaning pass.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub data: DataFrame,
    pub report: CleaningReport,
}

/// Runs the configured transformations in a fixed order.
///
/// 1. schema validation (when a schema is attached)
/// 2. duplicate removal
/// 3. required-column drop
/// 4. default fills, in configuration order
/// 5. numeric mean imputation
/// 6. outlier replacement, per configured column
///
/// Every column the configuration names is checked before step 2, so a bad
/// name fails without producing a partial result. Column names are never
/// changed; call [`DatasetSchema::conform`] beforehand to adopt the declared
/// names.
#[derive(Debug, Clone, Default)]
pub struct DataQualityTransformer {
    config: CleaningConfig,
    schema: Option<DatasetSchema>,
}

static_assertions::assert_impl_all!(DataQualityTransformer: Send, Sync);
static_assertions::assert_impl_all!(CleaningOutcome: Send, Sync);

impl DataQualityTransformer {
    pub fn new(config: CleaningConfig) -> Self {
        Self {
            config,
            schema: None,
        }
    }

    /// Attach a schema checked at the start of every pass.
    pub fn with_schema(mut self, schema: DatasetSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    pub fn schema(&self) -> Option<&DatasetSchema> {
        self.schema.as_ref()
    }

    /// Run one cleaning pass over `df`.
    pub fn clean(&self, df: &DataFrame) -> Result<CleaningOutcome> {
        let started = Instant::now();
        self.config.validate()?;

        if let Some(schema) = &self.schema {
            schema.validate(df).context("Schema validation failed")?;
        }
        self.check_columns(df)?;
        let mut data = df.clone();

        info!(
            "Cleaning dataset: {} rows x {} columns",
            data.height(),
            data.width()
        );
        let mut report = CleaningReport::start(data.height(), column_names(&data));

        if self.config.remove_duplicates {
            let before = data.height();
            data = remove_duplicates(&data)?;
            report.duplicates_removed = before - data.height();
            report.step(format!("Removed {} duplicate rows", report.duplicates_removed));
        }

        if let Some(ref required) = self.config.required_column {
            let before = data.height();
            data = drop_missing(&data, required)?;
            report.rows_missing_required = before - data.height();
            report.step(format!(
                "Dropped {} rows missing '{}'",
                report.rows_missing_required, required
            ));
        }

        for fill in &self.config.default_fills {
            let missing =
                missing_count(ensure_column(&data, &fill.column)?.as_materialized_series())?;
            data = fill_default(&data, &fill.column, &fill.value)
                .context(format!("Filling '{}'", fill.column))?;
            if missing > 0 {
                report.step(format!(
                    "Filled {} missing values in '{}' with {}",
                    missing, fill.column, fill.value
                ));
            }
            report.defaults_filled.push(ColumnCount {
                column: fill.column.clone(),
                count: missing,
            });
        }

        if self.config.impute_numeric_means {
            let gaps = numeric_gaps(&data)?;
            data = fill_numeric_means(&data)?;
            for (column, before) in gaps {
                let after =
                    missing_count(ensure_column(&data, &column)?.as_materialized_series())?;
                let filled = before - after;
                if filled > 0 {
                    report.step(format!("Imputed {} values in '{}' with the mean", filled, column));
                    report.means_imputed.push(ColumnCount {
                        column,
                        count: filled,
                    });
                }
            }
        }

        for column in &self.config.outlier_columns {
            let series = ensure_numeric_column(&data, column)?.as_materialized_series();
            let (treated, replaced) = treat_series_outliers(series, self.config.iqr_multiplier)
                .context(format!("Treating outliers in '{}'", column))?;
            data.replace(column, treated)?;
            report.step(format!(
                "Replaced {} outliers in '{}' with the column mean",
                replaced, column
            ));
            report.outliers_replaced.push(ColumnCount {
                column: column.clone(),
                count: replaced,
            });
        }

        let report = report.finish(data.height(), started.elapsed().as_millis() as u64);
        info!(
            "Cleaning complete: {} -> {} rows, {} values changed",
            report.rows_before,
            report.rows_after,
            report.values_changed()
        );

        Ok(CleaningOutcome { data, report })
    }

    /// Fail fast on any column the configuration names that `df` lacks, and
    /// on outlier columns that are not numeric.
    fn check_columns(&self, df: &DataFrame) -> Result<()> {
        for column in self.config.referenced_columns() {
            ensure_column(df, column)?;
        }
        for column in &self.config.outlier_columns {
            ensure_numeric_column(df, column).context("Outlier treatment")?;
        }
        debug!("All configured columns present");
        Ok(())
    }
}

/// Numeric columns with at least one missing value, and how many.
fn numeric_gaps(df: &DataFrame) -> Result<Vec<(String, usize)>> {
    let mut gaps = Vec::new();
    for name in numeric_column_names(df) {
        let missing = missing_count(ensure_column(df, &name)?.as_materialized_series())?;
        if missing > 0 {
            gaps.push((name, missing));
        }
    }
    Ok(gaps)
}
