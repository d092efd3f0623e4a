use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::util::format_number;

/// One entry of a breakdown series: a dimension (region, country,
/// category, unit...) with its aggregate and share of the whole series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub dimension: String,
    pub metric: f64,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthPoint {
    pub year: i32,
    pub growth_rate: f64,
}

/// Display-time view of a breakdown. Percentages were computed over the
/// full series, so truncating here never rescales them.
pub fn top(series: &[Share], n: usize) -> &[Share] {
    &series[..series.len().min(n)]
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ShareRow {
    #[serde(rename = "Dimension")]
    #[tabled(rename = "Dimension")]
    pub dimension: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Records")]
    #[tabled(rename = "Records")]
    pub records: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

impl From<&Share> for ShareRow {
    fn from(s: &Share) -> Self {
        ShareRow {
            dimension: s.dimension.clone(),
            value: format_number(s.metric, 2),
            records: s.count,
            share: format!("{}%", format_number(s.percentage, 2)),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendRow {
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Growth")]
    #[tabled(rename = "Growth")]
    pub growth: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StatusRow {
    #[serde(rename = "Dataset")]
    #[tabled(rename = "Dataset")]
    pub dataset: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MetricRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}
