//! Shared helpers for column lookup, dtype checks and value extraction.

use crate::error::{QualityError, Result};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a floating point type.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Names of all numeric columns, in frame order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

// =============================================================================
// Column Lookup
// =============================================================================

/// Look up a column, mapping absence to [`QualityError::InvalidColumn`].
pub fn ensure_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| QualityError::InvalidColumn(name.to_string()))
}

/// Look up a column that must hold numbers.
pub fn ensure_numeric_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    let column = ensure_column(df, name)?;
    if !is_numeric_dtype(column.dtype()) {
        return Err(QualityError::type_mismatch(name, "numeric", column.dtype()));
    }
    Ok(column)
}

/// Column names as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid regex: non-alphanumeric run"));

/// Canonical form of a column name used for tolerant matching.
///
/// `"Engagement Score"`, `"engagement_score"` and `" ENGAGEMENT-score "` all
/// normalize to `"engagement_score"`.
pub fn normalize_column_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Values of a numeric Series as `f64`, with nulls and NaN mapped to `None`.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Values of a Series rendered as strings, nulls preserved.
pub fn string_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let strings = series.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Arithmetic mean of the present values, `None` when there are none.
///
/// NaN counts as missing, as it does in [`numeric_values`]. This differs from
/// polars' `Series::mean()`, which returns NaN when any value is NaN.
pub fn mean_of(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|x| !x.is_nan())
        .collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Mask that is `true` where the value is present (not null, not NaN).
pub fn presence_mask(series: &Series) -> PolarsResult<BooleanChunked> {
    if is_float_dtype(series.dtype()) {
        let present: Vec<bool> = numeric_values(series)?
            .iter()
            .map(|v| v.is_some())
            .collect();
        Ok(BooleanChunked::from_slice(series.name().clone(), &present))
    } else {
        Ok(series.is_not_null())
    }
}

/// Count of missing entries (null, or NaN for float columns) in a Series.
pub fn missing_count(series: &Series) -> PolarsResult<usize> {
    if is_float_dtype(series.dtype()) {
        Ok(numeric_values(series)?.iter().filter(|v| v.is_none()).count())
    } else {
        Ok(series.null_count())
    }
}
