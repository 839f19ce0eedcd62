//! IQR outlier replacement.
//!
//! Values outside `[Q1 - k*IQR, Q3 + k*IQR]` (k = 1.5 unless configured) are
//! replaced with the arithmetic mean of the column. The mean is taken over the
//! untreated values, outliers included.

use crate::config::DEFAULT_IQR_MULTIPLIER;
use crate::error::{QualityError, Result};
use crate::utils::{ensure_numeric_column, is_numeric_dtype, mean_of, numeric_values};
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Quartiles, fences and mean computed from one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
    /// Mean of the present values before treatment.
    pub mean: f64,
}

impl OutlierBounds {
    /// Compute the bounds from the present values, `None` if there are none.
    pub fn from_values(values: &[Option<f64>], multiplier: f64) -> Option<Self> {
        let mut present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.is_empty() {
            return None;
        }
        present.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile_sorted(&present, 0.25);
        let q3 = quantile_sorted(&present, 0.75);
        let iqr = q3 - q1;
        let mean = mean_of(values)?;

        Some(Self {
            q1,
            q3,
            iqr,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
            mean,
        })
    }

    /// Strictly outside the fences.
    #[inline]
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Quantile of an ascending, non-empty slice using linear interpolation
/// between the closest ranks (position `q * (n - 1)`).
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

/// Replace outliers in `values` with the pre-treatment mean.
///
/// Returns the treated values (same length and order, missing entries kept
/// missing) and how many were replaced. `None` when no value is present.
pub fn replace_outliers(
    values: &[Option<f64>],
    multiplier: f64,
) -> Option<(Vec<Option<f64>>, OutlierBounds, usize)> {
    let bounds = OutlierBounds::from_values(values, multiplier)?;
    let mut replaced = 0;
    let treated = values
        .iter()
        .map(|v| {
            v.map(|x| {
                if bounds.is_outlier(x) {
                    replaced += 1;
                    bounds.mean
                } else {
                    x
                }
            })
        })
        .collect();
    Some((treated, bounds, replaced))
}

/// Replace IQR outliers in a numeric series with the series mean.
///
/// The result is a `Float64` series with the same name, length and order. An
/// empty series is returned as-is; a non-empty series with no present value
/// fails with [`QualityError::EmptyColumn`].
pub fn treat_outliers_with_mean(series: &Series) -> Result<Series> {
    treat_series_outliers(series, DEFAULT_IQR_MULTIPLIER).map(|(s, _)| s)
}

/// [`treat_outliers_with_mean`] with an explicit IQR multiplier, also
/// returning the number of replaced values.
pub fn treat_series_outliers(series: &Series, multiplier: f64) -> Result<(Series, usize)> {
    if !is_numeric_dtype(series.dtype()) && series.dtype() != &DataType::Null {
        return Err(QualityError::type_mismatch(
            series.name().as_str(),
            "numeric",
            series.dtype(),
        ));
    }
    if series.is_empty() {
        return Ok((series.cast(&DataType::Float64)?, 0));
    }

    let values = numeric_values(series)?;
    let (treated, bounds, replaced) = replace_outliers(&values, multiplier)
        .ok_or_else(|| QualityError::EmptyColumn(series.name().to_string()))?;

    debug!(
        "Column '{}': Q1={:.4} Q3={:.4} bounds=[{:.4}, {:.4}], replaced {} outliers with mean {:.4}",
        series.name(),
        bounds.q1,
        bounds.q3,
        bounds.lower,
        bounds.upper,
        replaced,
        bounds.mean
    );

    Ok((Series::new(series.name().clone(), treated), replaced))
}

/// Apply [`treat_outliers_with_mean`] to one column of a dataset.
pub fn treat_column_outliers(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let series = ensure_numeric_column(df, column)?.as_materialized_series();
    let treated = treat_outliers_with_mean(series)?;
    let mut out = df.clone();
    out.replace(column, treated)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values_of(series: &Series) -> Vec<Option<f64>> {
        series.f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_bounds_match_worked_example() {
        let values = [Some(10.0), Some(12.0), Some(11.0), Some(13.0), Some(100.0)];
        let bounds = OutlierBounds::from_values(&values, 1.5).unwrap();

        assert_eq!(bounds.q1, 11.0);
        assert_eq!(bounds.q3, 13.0);
        assert_eq!(bounds.iqr, 2.0);
        assert_eq!(bounds.lower, 8.0);
        assert_eq!(bounds.upper, 16.0);
        assert!((bounds.mean - 29.2).abs() < 1e-12);
    }

    #[test]
    fn test_outlier_replaced_with_pre_treatment_mean() {
        let series = Series::new("rtt".into(), &[10.0, 12.0, 11.0, 13.0, 100.0]);
        let treated = treat_outliers_with_mean(&series).unwrap();

        let values = values_of(&treated);
        assert_eq!(&values[..4], &[Some(10.0), Some(12.0), Some(11.0), Some(13.0)]);
        assert!((values[4].unwrap() - 29.2).abs() < 1e-12);
        assert_eq!(treated.name().as_str(), "rtt");
    }

    #[test]
    fn test_zero_variance_is_noop() {
        let series = Series::new("x".into(), &[5.0, 5.0, 5.0, 5.0]);
        let (treated, replaced) = treat_series_outliers(&series, 1.5).unwrap();
        assert_eq!(replaced, 0);
        assert!(treated.equals(&series));
    }

    #[test]
    fn test_interpolates_with_few_values() {
        // sorted [1, 2, 3]: Q1 at pos 0.5 -> 1.5, Q3 at pos 1.5 -> 2.5
        let bounds = OutlierBounds::from_values(&[Some(3.0), Some(1.0), Some(2.0)], 1.5).unwrap();
        assert_eq!(bounds.q1, 1.5);
        assert_eq!(bounds.q3, 2.5);
    }

    #[test]
    fn test_low_outlier_replaced() {
        let series = Series::new("x".into(), &[-50.0, 10.0, 11.0, 12.0, 13.0]);
        let (treated, replaced) = treat_series_outliers(&series, 1.5).unwrap();
        assert_eq!(replaced, 1);
        assert_eq!(values_of(&treated)[0], Some((-50.0 + 10.0 + 11.0 + 12.0 + 13.0) / 5.0));
    }

    #[test]
    fn test_missing_values_stay_missing() {
        let series = Series::new(
            "x".into(),
            &[Some(10.0), None, Some(12.0), Some(11.0), Some(13.0), Some(100.0)],
        );
        let treated = treat_outliers_with_mean(&series).unwrap();
        let values = values_of(&treated);
        assert_eq!(values.len(), 6);
        assert_eq!(values[1], None);
        assert!((values[5].unwrap() - 29.2).abs() < 1e-12);
    }

    #[test]
    fn test_all_missing_is_empty_column_error() {
        let series = Series::new("x".into(), &[None::<f64>, None]);
        let err = treat_outliers_with_mean(&series).unwrap_err();
        assert!(matches!(err, QualityError::EmptyColumn(ref c) if c == "x"));
    }

    #[test]
    fn test_empty_series_is_returned() {
        let series = Series::new("x".into(), Vec::<f64>::new());
        let treated = treat_outliers_with_mean(&series).unwrap();
        assert!(treated.is_empty());
    }

    #[test]
    fn test_non_numeric_rejected() {
        let series = Series::new("handset".into(), &["a", "b"]);
        let err = treat_outliers_with_mean(&series).unwrap_err();
        assert_eq!(err.error_code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_custom_multiplier() {
        let values = [Some(10.0), Some(12.0), Some(11.0), Some(13.0), Some(20.0)];
        // k = 1.5 -> upper 16, 20 is an outlier
        assert_eq!(replace_outliers(&values, 1.5).unwrap().2, 1);
        // k = 5 -> upper 23, nothing replaced
        assert_eq!(replace_outliers(&values, 5.0).unwrap().2, 0);
    }

    #[test]
    fn test_treat_column_outliers_only_touches_target() {
        let df = df![
            "a" => [10.0, 12.0, 11.0, 13.0, 100.0],
            "b" => [1.0, 2.0, 3.0, 4.0, 1000.0],
        ]
        .unwrap();

        let out = treat_column_outliers(&df, "a").unwrap();
        assert_eq!(out.height(), 5);
        assert!(
            out.column("b")
                .unwrap()
                .as_materialized_series()
                .equals(df.column("b").unwrap().as_materialized_series())
        );
        assert!(out.column("a").unwrap().f64().unwrap().max().unwrap() < 100.0);

        assert!(treat_column_outliers(&df, "c").unwrap_err().is_invalid_column());
    }
}
