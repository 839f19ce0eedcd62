//! Duplicate removal and required-attribute filtering.

use crate::error::Result;
use crate::utils::{ensure_column, presence_mask};
use polars::prelude::*;
use tracing::debug;

/// Remove rows that exactly repeat an earlier row across all columns.
///
/// The first occurrence is kept and the relative order of the remaining rows
/// is preserved.
pub fn remove_duplicates(df: &DataFrame) -> Result<DataFrame> {
    if df.height() < 2 || df.width() == 0 {
        return Ok(df.clone());
    }

    let deduped = df
        .clone()
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;

    debug!("Removed {} duplicate rows", df.height() - deduped.height());
    Ok(deduped)
}

/// Drop every row whose value in `column` is missing.
pub fn drop_missing(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let series = ensure_column(df, column)?.as_materialized_series();
    if series.is_empty() {
        return Ok(df.clone());
    }

    let mask = presence_mask(series)?;
    let filtered = df.filter(&mask)?;

    debug!(
        "Dropped {} rows missing '{}'",
        df.height() - filtered.height(),
        column
    );
    Ok(filtered)
}

/// Remove exact duplicate rows, then rows missing `required_column`.
///
/// The column is checked before anything else, so an unknown name fails with
/// [`QualityError::InvalidColumn`](crate::QualityError::InvalidColumn)
/// without doing any work.
pub fn dedupe_and_require(df: &DataFrame, required_column: &str) -> Result<DataFrame> {
    ensure_column(df, required_column)?;
    let deduped = remove_duplicates(df)?;
    drop_missing(&deduped, required_column)
}
