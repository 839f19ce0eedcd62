//! Constant fills for designated optional attributes.

use crate::config::FillValue;
use crate::error::{QualityError, Result};
use crate::utils::{ensure_column, is_float_dtype, is_numeric_dtype, missing_count};
use polars::prelude::*;
use tracing::debug;

/// Replace every missing value in `column` with `value`.
///
/// Present values are left untouched and no row is removed. If the column has
/// nothing missing an unchanged copy is returned.
///
/// Dtype handling:
/// - integer column, integer default: keeps the column dtype, and the default
///   must be representable in it
/// - float column, or float default on an integer column: floating point result
/// - string column: the default is rendered as text
/// - boolean column: boolean default only
/// - all-null column: adopts the default's type
///
/// Anything else fails with [`QualityError::TypeMismatch`].
pub fn fill_default(df: &DataFrame, column: &str, value: &FillValue) -> Result<DataFrame> {
    let series = ensure_column(df, column)?.as_materialized_series();
    let missing = missing_count(series)?;
    if missing == 0 {
        return Ok(df.clone());
    }

    let filled = fill_series(series, value)?;
    let mut out = df.clone();
    out.replace(column, filled)?;

    debug!("Filled {} missing values in '{}' with {}", missing, column, value);
    Ok(out)
}

fn fill_series(series: &Series, value: &FillValue) -> Result<Series> {
    let name = series.name().clone();
    let dtype = series.dtype();

    let filled = match (dtype, value) {
        (DataType::Null, _) => literal_series(name, value, series.len()),
        (dt, FillValue::Int(i)) if is_numeric_dtype(dt) && !is_float_dtype(dt) => {
            // Filled in the column's own dtype; the default must fit it
            let filler = Series::new(name, vec![*i; series.len()])
                .strict_cast(dt)
                .map_err(|_| QualityError::type_mismatch(series.name().as_str(), "int", dt))?;
            series.zip_with(&series.is_not_null(), &filler)?
        }
        (dt, FillValue::Int(i)) if is_float_dtype(dt) => fill_float(series, *i as f64)?,
        (dt, FillValue::Float(f)) if is_numeric_dtype(dt) => fill_float(series, *f)?,
        (DataType::String, _) => {
            let text = value.to_string();
            let out: Vec<Option<String>> = series
                .str()?
                .into_iter()
                .map(|v| Some(v.unwrap_or(text.as_str()).to_string()))
                .collect();
            Series::new(name, out)
        }
        (DataType::Boolean, FillValue::Bool(b)) => {
            let out: Vec<Option<bool>> = series
                .bool()?
                .into_iter()
                .map(|v| Some(v.unwrap_or(*b)))
                .collect();
            Series::new(name, out)
        }
        (dt, _) => {
            return Err(QualityError::type_mismatch(
                series.name().as_str(),
                format!("a column accepting a {} default", value.type_name()),
                dt,
            ));
        }
    };

    Ok(filled)
}

/// Float fill that also replaces NaN. A `Float32` column stays `Float32`.
fn fill_float(series: &Series, fill: f64) -> Result<Series> {
    let floats = series.cast(&DataType::Float64)?;
    let out = floats
        .f64()?
        .apply(|v| Some(v.filter(|x| !x.is_nan()).unwrap_or(fill)))
        .into_series();

    if series.dtype() == &DataType::Float32 {
        Ok(out.cast(&DataType::Float32)?)
    } else {
        Ok(out)
    }
}

fn literal_series(name: PlSmallStr, value: &FillValue, len: usize) -> Series {
    match value {
        FillValue::Bool(b) => Series::new(name, vec![*b; len]),
        FillValue::Int(i) => Series::new(name, vec![*i; len]),
        FillValue::Float(f) => Series::new(name, vec![*f; len]),
        FillValue::Str(s) => Series::new(name, vec![s.as_str(); len]),
    }
}
