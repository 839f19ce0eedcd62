//! Mean imputation for numeric columns.

use crate::error::Result;
use crate::utils::{ensure_numeric_column, is_numeric_dtype, mean_of, numeric_values};
use polars::prelude::*;
use tracing::debug;

/// Fill missing values of every numeric column with that column's mean.
///
/// Means are taken from the input frame before any column is modified, so the
/// result does not depend on column order. Columns without a single present
/// value, and non-numeric columns, are returned as they were. Integer columns
/// that receive a fill become `Float64`.
pub fn fill_numeric_means(df: &DataFrame) -> Result<DataFrame> {
    let mut planned: Vec<(String, Series)> = Vec::new();

    for column in df.get_columns() {
        if !is_numeric_dtype(column.dtype()) {
            continue;
        }
        let series = column.as_materialized_series();
        if let Some(filled) = mean_filled(series)? {
            planned.push((column.name().to_string(), filled));
        }
    }

    let mut out = df.clone();
    for (name, filled) in planned {
        out.replace(&name, filled)?;
    }
    Ok(out)
}

/// Fill missing values of one numeric column with its mean.
pub fn fill_column_mean(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let series = ensure_numeric_column(df, column)?.as_materialized_series();
    match mean_filled(series)? {
        Some(filled) => {
            let mut out = df.clone();
            out.replace(column, filled)?;
            Ok(out)
        }
        None => Ok(df.clone()),
    }
}

/// The series with its gaps filled, or `None` when there is nothing to fill
/// or no mean exists.
fn mean_filled(series: &Series) -> Result<Option<Series>> {
    let values = numeric_values(series)?;
    let missing = values.iter().filter(|v| v.is_none()).count();
    if missing == 0 {
        return Ok(None);
    }

    let Some(mean) = mean_of(&values) else {
        debug!("Column '{}' has no values; leaving it unfilled", series.name());
        return Ok(None);
    };

    let filled: Vec<Option<f64>> = values.iter().map(|v| Some(v.unwrap_or(mean))).collect();
    debug!(
        "Imputed {} missing values in '{}' with mean {:.4}",
        missing,
        series.name(),
        mean
    );
    Ok(Some(Series::new(series.name().clone(), filled)))
}
