//! Dashboard analytics over the cleaned scores table.
//!
//! The dashboard has four sections, each expecting a set of columns. A
//! [`DashboardContext`] prepares the data once (deriving traffic in megabytes)
//! and records which expected columns are absent; [`summarize`] then computes
//! the figures of one section.

mod sections;
pub mod stats;

pub use sections::{
    ClusterBox, ClusterMeans, ClusterShare, EngagementSummary, ExperienceSummary, HandsetClusterBox,
    OverviewSummary, SatisfactionSummary,
};
pub use stats::{BoxStats, HistogramBin, LinearFit, SummaryStatistics, ValueCount};

use crate::error::Result;
use crate::schema::columns;
use crate::utils::ensure_numeric_column;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardSection {
    Overview,
    Engagement,
    Experience,
    Satisfaction,
}

impl DashboardSection {
    pub const ALL: [DashboardSection; 4] = [
        Self::Overview,
        Self::Engagement,
        Self::Experience,
        Self::Satisfaction,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Overview => "User Overview Analysis",
            Self::Engagement => "User Engagement Analysis",
            Self::Experience => "Experience Analysis",
            Self::Satisfaction => "Satisfaction Analysis",
        }
    }

    /// Columns the section expects to find.
    pub fn expected_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Overview => &[
                columns::MSISDN,
                columns::HANDSET_TYPE,
                columns::ENGAGEMENT_SCORE,
                columns::EXPERIENCE_SCORE,
                columns::SATISFACTION_SCORE,
            ],
            Self::Engagement => &[
                columns::SESSION_FREQUENCY,
                columns::TOTAL_SESSION_DURATION,
                columns::TOTAL_TRAFFIC_BYTES,
                columns::ENGAGEMENT_SCORE,
                columns::ENGAGEMENT_CLUSTER,
            ],
            Self::Experience => &[
                columns::HANDSET_TYPE,
                columns::AVG_TCP_RETRANSMISSION,
                columns::AVG_RTT,
                columns::AVG_THROUGHPUT,
                columns::EXPERIENCE_CLUSTER,
            ],
            Self::Satisfaction => &[
                columns::MSISDN,
                columns::ENGAGEMENT_SCORE,
                columns::EXPERIENCE_SCORE,
                columns::SATISFACTION_SCORE,
                columns::SATISFACTION_CLUSTER,
            ],
        }
    }
}

impl fmt::Display for DashboardSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Add `Total Traffic (MB)` from `Total Traffic (Bytes)` when the former is
/// absent and the latter present. Otherwise the frame is returned unchanged.
pub fn with_traffic_megabytes(df: &DataFrame) -> Result<DataFrame> {
    let has = |name: &str| df.get_column_index(name).is_some();
    if has(columns::TOTAL_TRAFFIC_MB) || !has(columns::TOTAL_TRAFFIC_BYTES) {
        return Ok(df.clone());
    }

    let bytes = ensure_numeric_column(df, columns::TOTAL_TRAFFIC_BYTES)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let megabytes: Float64Chunked = bytes
        .f64()?
        .apply(|v| v.map(|b| b / BYTES_PER_MEGABYTE));

    let mut out = df.clone();
    out.with_column(
        megabytes
            .into_series()
            .with_name(columns::TOTAL_TRAFFIC_MB.into()),
    )?;
    debug!("Derived '{}' from bytes", columns::TOTAL_TRAFFIC_MB);
    Ok(out)
}

/// Prepared dashboard data.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    data: DataFrame,
    missing: BTreeMap<DashboardSection, Vec<String>>,
}

impl DashboardContext {
    pub fn new(df: &DataFrame) -> Result<Self> {
        let data = with_traffic_megabytes(df)?;

        let mut missing = BTreeMap::new();
        for section in DashboardSection::ALL {
            let absent: Vec<String> = section
                .expected_columns()
                .iter()
                .filter(|c| data.get_column_index(c).is_none())
                .map(|c| c.to_string())
                .collect();
            if !absent.is_empty() {
                warn!("{}: missing expected columns {}", section, absent.join(", "));
                missing.insert(section, absent);
            }
        }

        Ok(Self { data, missing })
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Expected columns absent from the data, by section. Sections with
    /// everything present are omitted.
    pub fn missing_columns(&self) -> &BTreeMap<DashboardSection, Vec<String>> {
        &self.missing
    }

    pub fn missing_for(&self, section: DashboardSection) -> &[String] {
        self.missing.get(&section).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Figures of one dashboard section.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum SectionSummary {
    Overview(OverviewSummary),
    Engagement(EngagementSummary),
    Experience(ExperienceSummary),
    Satisfaction(SatisfactionSummary),
}

impl SectionSummary {
    pub fn section(&self) -> DashboardSection {
        match self {
            Self::Overview(_) => DashboardSection::Overview,
            Self::Engagement(_) => DashboardSection::Engagement,
            Self::Experience(_) => DashboardSection::Experience,
            Self::Satisfaction(_) => DashboardSection::Satisfaction,
        }
    }
}

/// Compute one section. Fails with
/// [`QualityError::InvalidColumn`](crate::QualityError::InvalidColumn) when a
/// column the section's figures depend on is absent.
pub fn summarize(ctx: &DashboardContext, section: DashboardSection) -> Result<SectionSummary> {
    let df = ctx.data();
    Ok(match section {
        DashboardSection::Overview => SectionSummary::Overview(sections::overview(df)?),
        DashboardSection::Engagement => SectionSummary::Engagement(sections::engagement(df)?),
        DashboardSection::Experience => SectionSummary::Experience(sections::experience(df)?),
        DashboardSection::Satisfaction => {
            SectionSummary::Satisfaction(sections::satisfaction(df)?)
        }
    })
}
