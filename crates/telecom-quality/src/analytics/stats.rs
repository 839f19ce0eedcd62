//! Descriptive statistics used by the dashboard sections.
//!
//! All functions work on already-extracted values (`Option<f64>` / `Option<String>`),
//! treating `None` as missing.

use crate::quality::quantile_sorted;
use crate::utils::mean_of;
use polars::prelude::*;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Number of bins used for score histograms.
pub const HISTOGRAM_BINS: usize = 40;

/// Whisker reach, in IQRs, for [`BoxStats`].
const WHISKER_IQR: f64 = 1.5;

/// `describe()`-style statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (ddof = 1); `None` below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Count, mean, sample std and quartiles over the present values.
///
/// Missing entries and NaN are skipped, so on a float column with NaN the mean
/// and std differ from polars' `describe`, which propagates NaN.
pub fn describe(column: &str, values: &[Option<f64>]) -> SummaryStatistics {
    let sorted = sorted_present(values);
    let count = sorted.len();
    let mean = mean_of(values);
    let std = match (mean, count) {
        (Some(m), n) if n > 1 => {
            let ss: f64 = sorted.iter().map(|x| (x - m).powi(2)).sum();
            Some((ss / (n - 1) as f64).sqrt())
        }
        _ => None,
    };
    let quantile = |q: f64| (!sorted.is_empty()).then(|| quantile_sorted(&sorted, q));

    SummaryStatistics {
        column: column.to_string(),
        count,
        mean,
        std,
        min: sorted.first().copied(),
        q25: quantile(0.25),
        median: quantile(0.5),
        q75: quantile(0.75),
        max: sorted.last().copied(),
    }
}

/// Five-number summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    /// Lowest value within `q1 - 1.5 * IQR`.
    pub lower_whisker: f64,
    /// Highest value within `q3 + 1.5 * IQR`.
    pub upper_whisker: f64,
    pub outliers: usize,
}

impl BoxStats {
    /// `None` when no value is present.
    pub fn from_values(values: &[Option<f64>]) -> Option<Self> {
        let sorted = sorted_present(values);
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let q1 = quantile_sorted(&sorted, 0.25);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let (low_fence, high_fence) = (q1 - WHISKER_IQR * iqr, q3 + WHISKER_IQR * iqr);

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|x| *x >= low_fence && *x <= high_fence)
            .collect();

        Some(Self {
            count: sorted.len(),
            min,
            q1,
            median: quantile_sorted(&sorted, 0.5),
            q3,
            max,
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            lower_whisker: inside.first().copied().unwrap_or(min),
            upper_whisker: inside.last().copied().unwrap_or(max),
            outliers: sorted.len() - inside.len(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Occurrences of each present value, most frequent first (ties by value).
pub fn value_counts(values: &[Option<String>]) -> Vec<ValueCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v.as_str()).or_insert(0) += 1;
    }

    let mut out: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    out
}

/// Order cluster identifiers numerically when both parse, otherwise as text.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram over the range of the present values. The last bin
/// is closed on the right. A constant column yields a single bin.
pub fn histogram(values: &[Option<f64>], bins: usize) -> Vec<HistogramBin> {
    let sorted = sorted_present(values);
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    if min == max {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: sorted.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for x in sorted {
        let idx = (((x - min) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation; `None` when `y` is constant.
    pub r: Option<f64>,
    pub n: usize,
}

/// Fit over the rows where both `x` and `y` are present. `None` with fewer
/// than two such rows or a constant `x`.
pub fn linear_fit(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<LinearFit> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        r: (syy > 0.0).then(|| sxy / (sxx * syy).sqrt()),
        n,
    })
}

/// Row indices of the `n` largest present values, descending. Ties keep
/// their original order.
pub fn top_indices(values: &[Option<f64>], n: usize) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|x| (i, x)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.into_iter().take(n).map(|(i, _)| i).collect()
}

/// Selected rows of `df` as JSON objects keyed by column name.
pub fn records(df: &DataFrame, rows: &[usize], columns: &[&str]) -> PolarsResult<Vec<Value>> {
    let mut out = Vec::with_capacity(rows.len());
    for &row in rows {
        let mut record = Map::new();
        for &name in columns {
            let value = df.column(name)?.as_materialized_series().get(row)?;
            record.insert(name.to_string(), any_to_json(value));
        }
        out.push(Value::Object(record));
    }
    Ok(out)
}

fn any_to_json(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int8(v) => v.into(),
        AnyValue::Int16(v) => v.into(),
        AnyValue::Int32(v) => v.into(),
        AnyValue::Int64(v) => v.into(),
        AnyValue::UInt8(v) => v.into(),
        AnyValue::UInt16(v) => v.into(),
        AnyValue::UInt32(v) => v.into(),
        AnyValue::UInt64(v) => v.into(),
        AnyValue::Float32(v) => float_to_json(v as f64),
        AnyValue::Float64(v) => float_to_json(v),
        other => Value::String(other.to_string()),
    }
}

fn float_to_json(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

fn sorted_present(values: &[Option<f64>]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|x| !x.is_nan())
        .collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_describe() {
        let stats = describe("x", &[Some(1.0), Some(2.0), None, Some(3.0), Some(4.0)]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, Some(2.5));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.q25, Some(1.75));
        assert_eq!(stats.median, Some(2.5));
        assert_eq!(stats.q75, Some(3.25));
        assert_eq!(stats.max, Some(4.0));
        // sample variance of 1..4 is 5/3
        assert!((stats.std.unwrap() - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_describe_single_and_empty() {
        let one = describe("x", &[Some(7.0)]);
        assert_eq!(one.std, None);
        assert_eq!(one.median, Some(7.0));

        let none = describe("x", &[None, None]);
        assert_eq!(none.count, 0);
        assert_eq!(none.mean, None);
        assert_eq!(none.q25, None);
    }

    #[test]
    fn test_describe_skips_nan() {
        let stats = describe("x", &[Some(1.0), Some(f64::NAN), Some(3.0)]);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, Some(2.0));
        assert_eq!(stats.max, Some(3.0));
        assert!((stats.std.unwrap() - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_box_stats_whiskers() {
        let stats = BoxStats::from_values(&some(&[10.0, 11.0, 12.0, 13.0, 100.0])).unwrap();
        assert_eq!(stats.q1, 11.0);
        assert_eq!(stats.q3, 13.0);
        assert_eq!(stats.median, 12.0);
        assert_eq!(stats.lower_whisker, 10.0);
        assert_eq!(stats.upper_whisker, 13.0);
        assert_eq!(stats.outliers, 1);
        assert_eq!(stats.max, 100.0);

        assert!(BoxStats::from_values(&[None]).is_none());
    }

    #[test]
    fn test_value_counts_order() {
        let values: Vec<Option<String>> = ["b", "a", "b", "c", "a", "b"]
            .iter()
            .map(|s| Some(s.to_string()))
            .chain([None])
            .collect();
        let counts = value_counts(&values);
        assert_eq!(
            counts,
            vec![
                ValueCount { value: "b".into(), count: 3 },
                ValueCount { value: "a".into(), count: 2 },
                ValueCount { value: "c".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_compare_labels() {
        assert_eq!(compare_labels("2", "10"), Ordering::Less);
        assert_eq!(compare_labels("b", "a"), Ordering::Greater);
    }

    #[test]
    fn test_histogram() {
        let bins = histogram(&some(&[0.0, 1.0, 2.0, 3.0, 4.0]), 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).collect::<Vec<_>>(), vec![1, 1, 1, 2]);
        assert_eq!(bins[3].end, 4.0);

        let flat = histogram(&some(&[5.0, 5.0]), HISTOGRAM_BINS);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].count, 2);

        assert!(histogram(&[None], HISTOGRAM_BINS).is_empty());
    }

    #[test]
    fn test_linear_fit() {
        let xs = some(&[1.0, 2.0, 3.0, 4.0]);
        let ys = vec![Some(3.0), Some(5.0), None, Some(9.0)];
        let fit = linear_fit(&xs, &ys).unwrap();
        assert_eq!(fit.n, 3);
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r.unwrap() - 1.0).abs() < 1e-12);

        assert!(linear_fit(&some(&[1.0, 1.0]), &some(&[2.0, 3.0])).is_none());
    }

    #[test]
    fn test_top_indices_stable() {
        let values = vec![Some(1.0), Some(5.0), None, Some(5.0), Some(3.0)];
        assert_eq!(top_indices(&values, 3), vec![1, 3, 4]);
        assert_eq!(top_indices(&values, 10).len(), 4);
    }

    #[test]
    fn test_records() {
        let df = df![
            "MSISDN" => ["a", "b"],
            "score" => [Some(1.5), None],
        ]
        .unwrap();
        let rows = records(&df, &[1, 0], &["MSISDN", "score"]).unwrap();
        assert_eq!(rows[0]["MSISDN"], Value::String("b".into()));
        assert_eq!(rows[0]["score"], Value::Null);
        assert_eq!(rows[1]["score"], serde_json::json!(1.5));
    }
}
