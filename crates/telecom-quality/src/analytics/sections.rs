//! Per-section dashboard figures.

use super::DashboardSection;
use super::stats::{
    BoxStats, HISTOGRAM_BINS, HistogramBin, LinearFit, SummaryStatistics, ValueCount,
    compare_labels, describe, histogram, linear_fit, records, top_indices, value_counts,
};
use crate::error::Result;
use crate::schema::columns;
use crate::utils::{
    ensure_column, ensure_numeric_column, is_numeric_dtype, mean_of, numeric_values,
    string_values,
};
use polars::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Rows shown in the handset and top-user tables.
const TOP_N: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct OverviewSummary {
    /// Distinct subscribers.
    pub total_users: usize,
    pub average_engagement: Option<f64>,
    pub average_experience: Option<f64>,
    pub top_handsets: Vec<ValueCount>,
    pub statistics: Vec<SummaryStatistics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterShare {
    pub cluster: String,
    pub label: String,
    pub count: usize,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngagementSummary {
    pub clusters: Vec<ClusterShare>,
    pub top_users: Vec<Value>,
    /// Total traffic (MB) against engagement score.
    pub traffic_trend: Option<LinearFit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HandsetClusterBox {
    pub handset: String,
    pub cluster: String,
    pub rtt: BoxStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperienceSummary {
    /// Rows with handset, cluster and RTT all present.
    pub rows_used: usize,
    pub rtt_by_handset: Vec<HandsetClusterBox>,
    pub score_histogram: Vec<HistogramBin>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterBox {
    pub cluster: String,
    pub satisfaction: BoxStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterMeans {
    pub cluster: String,
    pub engagement_score: Option<f64>,
    pub experience_score: Option<f64>,
    pub satisfaction_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SatisfactionSummary {
    pub score_by_cluster: Vec<ClusterBox>,
    pub cluster_means: Vec<ClusterMeans>,
    pub top_users: Vec<Value>,
}

pub(super) fn overview(df: &DataFrame) -> Result<OverviewSummary> {
    let users = string_values(ensure_column(df, columns::MSISDN)?.as_materialized_series())?;
    let total_users = value_counts(&users).len();

    let handsets =
        string_values(ensure_column(df, columns::HANDSET_TYPE)?.as_materialized_series())?;
    let mut top_handsets = value_counts(&handsets);
    top_handsets.truncate(TOP_N);

    let mut statistics = Vec::new();
    for &name in DashboardSection::Overview.expected_columns() {
        let Ok(column) = df.column(name) else {
            continue;
        };
        if is_numeric_dtype(column.dtype()) {
            let values = numeric_values(column.as_materialized_series())?;
            statistics.push(describe(name, &values));
        }
    }

    Ok(OverviewSummary {
        total_users,
        average_engagement: mean_of(&scores(df, columns::ENGAGEMENT_SCORE)?),
        average_experience: mean_of(&scores(df, columns::EXPERIENCE_SCORE)?),
        top_handsets,
        statistics,
    })
}

pub(super) fn engagement(df: &DataFrame) -> Result<EngagementSummary> {
    let engagement = scores(df, columns::ENGAGEMENT_SCORE)?;
    let clusters = labels(df, columns::ENGAGEMENT_CLUSTER)?;

    let mut counts = value_counts(&clusters);
    counts.sort_by(|a, b| compare_labels(&a.value, &b.value));
    let total: usize = counts.iter().map(|c| c.count).sum();
    let clusters = counts
        .into_iter()
        .map(|c| ClusterShare {
            label: format!("Cluster {}", c.value),
            share: c.count as f64 / total as f64,
            cluster: c.value,
            count: c.count,
        })
        .collect();

    let traffic_trend = match df.column(columns::TOTAL_TRAFFIC_MB) {
        Ok(_) => linear_fit(&engagement, &scores(df, columns::TOTAL_TRAFFIC_MB)?),
        Err(_) => None,
    };

    let shown = present_columns(
        df,
        &[columns::MSISDN, columns::ENGAGEMENT_SCORE, columns::TOTAL_TRAFFIC_MB],
    );
    let top_users = records(df, &top_indices(&engagement, TOP_N), &shown)?;

    Ok(EngagementSummary {
        clusters,
        top_users,
        traffic_trend,
    })
}

pub(super) fn experience(df: &DataFrame) -> Result<ExperienceSummary> {
    let handsets = labels(df, columns::HANDSET_TYPE)?;
    let clusters = labels(df, columns::EXPERIENCE_CLUSTER)?;
    let rtt = scores(df, columns::AVG_RTT)?;
    let experience = scores(df, columns::EXPERIENCE_SCORE)?;

    let mut groups: BTreeMap<(String, String), Vec<Option<f64>>> = BTreeMap::new();
    let mut rows_used = 0;
    for ((handset, cluster), value) in handsets.iter().zip(&clusters).zip(&rtt) {
        if let (Some(h), Some(c), Some(v)) = (handset, cluster, value) {
            groups
                .entry((h.clone(), c.clone()))
                .or_default()
                .push(Some(*v));
            rows_used += 1;
        }
    }

    let mut rtt_by_handset: Vec<HandsetClusterBox> = groups
        .into_iter()
        .filter_map(|((handset, cluster), values)| {
            BoxStats::from_values(&values).map(|rtt| HandsetClusterBox {
                handset,
                cluster,
                rtt,
            })
        })
        .collect();
    rtt_by_handset.sort_by(|a, b| {
        a.handset
            .cmp(&b.handset)
            .then_with(|| compare_labels(&a.cluster, &b.cluster))
    });

    Ok(ExperienceSummary {
        rows_used,
        rtt_by_handset,
        score_histogram: histogram(&experience, HISTOGRAM_BINS),
    })
}

pub(super) fn satisfaction(df: &DataFrame) -> Result<SatisfactionSummary> {
    let clusters = labels(df, columns::SATISFACTION_CLUSTER)?;
    let engagement = scores(df, columns::ENGAGEMENT_SCORE)?;
    let experience = scores(df, columns::EXPERIENCE_SCORE)?;
    let satisfaction = scores(df, columns::SATISFACTION_SCORE)?;
    ensure_column(df, columns::MSISDN)?;

    let mut by_cluster: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (row, cluster) in clusters.iter().enumerate() {
        if let Some(c) = cluster {
            by_cluster.entry(c.clone()).or_default().push(row);
        }
    }
    let mut ordered: Vec<(String, Vec<usize>)> = by_cluster.into_iter().collect();
    ordered.sort_by(|a, b| compare_labels(&a.0, &b.0));

    let pick = |values: &[Option<f64>], rows: &[usize]| -> Vec<Option<f64>> {
        rows.iter().map(|&r| values[r]).collect()
    };

    let mut score_by_cluster = Vec::new();
    let mut cluster_means = Vec::new();
    for (cluster, rows) in ordered {
        let sat = pick(&satisfaction, &rows);
        if let Some(stats) = BoxStats::from_values(&sat) {
            score_by_cluster.push(ClusterBox {
                cluster: cluster.clone(),
                satisfaction: stats,
            });
        }
        cluster_means.push(ClusterMeans {
            engagement_score: mean_of(&pick(&engagement, &rows)),
            experience_score: mean_of(&pick(&experience, &rows)),
            satisfaction_score: mean_of(&sat),
            cluster,
        });
    }

    let top_users = records(
        df,
        &top_indices(&satisfaction, TOP_N),
        &[
            columns::MSISDN,
            columns::SATISFACTION_SCORE,
            columns::SATISFACTION_CLUSTER,
        ],
    )?;

    Ok(SatisfactionSummary {
        score_by_cluster,
        cluster_means,
        top_users,
    })
}

fn scores(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(numeric_values(
        ensure_numeric_column(df, name)?.as_materialized_series(),
    )?)
}

/// Cluster ids and handset names rendered as text.
fn labels(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = ensure_column(df, name)?.as_materialized_series();
    if is_numeric_dtype(column.dtype()) {
        // Whole-valued float ids render as "1", not "1.0".
        return Ok(numeric_values(column)?
            .into_iter()
            .map(|v| {
                v.map(|x| {
                    if x.fract() == 0.0 {
                        format!("{}", x as i64)
                    } else {
                        x.to_string()
                    }
                })
            })
            .collect());
    }
    Ok(string_values(column)?)
}

fn present_columns<'a>(df: &DataFrame, wanted: &[&'a str]) -> Vec<&'a str> {
    wanted
        .iter()
        .copied()
        .filter(|c| df.get_column_index(c).is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scores_frame() -> DataFrame {
        df![
            columns::MSISDN => ["u1", "u2", "u3", "u4", "u5", "u6"],
            columns::HANDSET_TYPE => [Some("Apple"), Some("Samsung"), Some("Apple"), None, Some("Apple"), Some("Huawei")],
            columns::ENGAGEMENT_SCORE => [1.0, 4.0, 2.0, 6.0, 3.0, 5.0],
            columns::EXPERIENCE_SCORE => [2.0, 1.0, 3.0, 4.0, 5.0, 6.0],
            columns::SATISFACTION_SCORE => [1.5, 2.5, 2.5, 5.0, 4.0, 5.5],
            columns::ENGAGEMENT_CLUSTER => [0i64, 1, 0, 2, 0, 1],
            columns::EXPERIENCE_CLUSTER => [Some(1.0), Some(0.0), Some(1.0), Some(1.0), None, Some(0.0)],
            columns::SATISFACTION_CLUSTER => [0i32, 0, 1, 1, 1, 10],
            columns::AVG_RTT => [Some(40.0), Some(60.0), Some(50.0), Some(30.0), Some(20.0), None],
            columns::TOTAL_TRAFFIC_MB => [100.0, 400.0, 200.0, 600.0, 300.0, 500.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_overview() {
        let summary = overview(&scores_frame()).unwrap();
        assert_eq!(summary.total_users, 6);
        assert_eq!(summary.average_engagement, Some(3.5));
        assert_eq!(summary.average_experience, Some(3.5));
        assert_eq!(summary.top_handsets[0].value, "Apple");
        assert_eq!(summary.top_handsets[0].count, 3);
        assert_eq!(summary.top_handsets.len(), 3);
        // MSISDN and handset are text; the three scores are described
        assert_eq!(summary.statistics.len(), 3);
        assert_eq!(summary.statistics[0].column, columns::ENGAGEMENT_SCORE);
    }

    #[test]
    fn test_overview_requires_handset() {
        let df = scores_frame().drop(columns::HANDSET_TYPE).unwrap();
        assert!(overview(&df).unwrap_err().is_invalid_column());
    }

    #[test]
    fn test_engagement() {
        let summary = engagement(&scores_frame()).unwrap();

        let labels: Vec<&str> = summary.clusters.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Cluster 0", "Cluster 1", "Cluster 2"]);
        assert_eq!(summary.clusters[0].count, 3);
        assert!((summary.clusters[0].share - 0.5).abs() < 1e-12);

        assert_eq!(summary.top_users.len(), 6);
        assert_eq!(summary.top_users[0][columns::MSISDN], "u4");

        let trend = summary.traffic_trend.unwrap();
        assert!((trend.slope - 100.0).abs() < 1e-9);
        assert!(trend.intercept.abs() < 1e-9);
    }

    #[test]
    fn test_experience() {
        let summary = experience(&scores_frame()).unwrap();
        // u4 has no handset, u5 no cluster, u6 no RTT
        assert_eq!(summary.rows_used, 3);

        let groups: Vec<(&str, &str, usize)> = summary
            .rtt_by_handset
            .iter()
            .map(|g| (g.handset.as_str(), g.cluster.as_str(), g.rtt.count))
            .collect();
        assert_eq!(groups, vec![("Apple", "1", 2), ("Samsung", "0", 1)]);
        assert_eq!(summary.rtt_by_handset[0].rtt.median, 45.0);

        let binned: usize = summary.score_histogram.iter().map(|b| b.count).sum();
        assert_eq!(binned, 6);
        assert_eq!(summary.score_histogram.len(), HISTOGRAM_BINS);
    }

    #[test]
    fn test_satisfaction() {
        let summary = satisfaction(&scores_frame()).unwrap();

        let clusters: Vec<&str> = summary
            .cluster_means
            .iter()
            .map(|c| c.cluster.as_str())
            .collect();
        assert_eq!(clusters, vec!["0", "1", "10"]);
        assert_eq!(summary.cluster_means[0].satisfaction_score, Some(2.0));
        assert_eq!(summary.cluster_means[1].engagement_score, Some(11.0 / 3.0));
        assert_eq!(summary.score_by_cluster[2].satisfaction.count, 1);

        assert_eq!(summary.top_users[0][columns::MSISDN], "u6");
        assert_eq!(summary.top_users[0][columns::SATISFACTION_CLUSTER], 10);
    }

    #[test]
    fn test_satisfaction_requires_cluster() {
        let df = scores_frame().drop(columns::SATISFACTION_CLUSTER).unwrap();
        let err = satisfaction(&df).unwrap_err();
        assert!(matches!(
            err,
            crate::QualityError::InvalidColumn(ref c) if c == columns::SATISFACTION_CLUSTER
        ));
    }
}
