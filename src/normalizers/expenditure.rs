// Bilateral military expenditure (India vs Pakistan), yearly and by decade.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::require_any;
use crate::error::NormalizeError;
use crate::record::RawRecord;
use crate::util::{mean, parse_number, parse_year, ratio};

const DATASET: &str = "expenditure";
pub const YEAR_COLUMN: &str = "Year";
pub const SIDE_A_COLUMN: &str = "India";
pub const SIDE_B_COLUMN: &str = "Pakistan";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenditureYear {
    pub year: i32,
    pub side_a: f64,
    pub side_b: f64,
    /// `side_a / side_b`, `0` when side B is zero.
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecadeAverage {
    pub decade: i32,
    pub label: String,
    pub years: usize,
    pub avg_side_a: f64,
    pub avg_side_b: f64,
    pub avg_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenditureSummary {
    pub side_a_label: String,
    pub side_b_label: String,
    pub time_span: String,
    pub current_ratio: Option<f64>,
    pub avg_ratio: f64,
    pub total_years: usize,
    pub latest_side_a: Option<f64>,
    pub latest_side_b: Option<f64>,
    pub peak_side_a_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenditureDataset {
    pub expenditure_trends: Vec<ExpenditureYear>,
    pub decade_analysis: Vec<DecadeAverage>,
    pub summary: ExpenditureSummary,
}

pub fn normalize(records: &[RawRecord]) -> Result<Option<ExpenditureDataset>, NormalizeError> {
    if records.is_empty() {
        return Ok(None);
    }
    require_any(records, DATASET, &[SIDE_A_COLUMN, SIDE_B_COLUMN])?;

    let mut expenditure_trends: Vec<ExpenditureYear> = records
        .iter()
        .filter_map(|r| {
            let year = r.present(YEAR_COLUMN).and_then(parse_year)?;
            let a = r.present(SIDE_A_COLUMN);
            let b = r.present(SIDE_B_COLUMN);
            if a.is_none() && b.is_none() {
                return None;
            }
            let side_a = a.map(parse_number).unwrap_or(0.0);
            let side_b = b.map(parse_number).unwrap_or(0.0);
            Some(ExpenditureYear {
                year,
                side_a,
                side_b,
                ratio: ratio(side_a, side_b),
            })
        })
        .filter(|y| y.side_a != 0.0 || y.side_b != 0.0)
        .collect();
    expenditure_trends.sort_by_key(|y| y.year);

    let mut decades: BTreeMap<i32, Vec<&ExpenditureYear>> = BTreeMap::new();
    for y in &expenditure_trends {
        decades.entry(y.year.div_euclid(10) * 10).or_default().push(y);
    }
    let decade_analysis: Vec<DecadeAverage> = decades
        .into_iter()
        .map(|(decade, group)| {
            let a: Vec<f64> = group.iter().map(|y| y.side_a).collect();
            let b: Vec<f64> = group.iter().map(|y| y.side_b).collect();
            let r: Vec<f64> = group.iter().map(|y| y.ratio).collect();
            DecadeAverage {
                decade,
                label: format!("{decade}s"),
                years: group.len(),
                avg_side_a: mean(&a),
                avg_side_b: mean(&b),
                avg_ratio: mean(&r),
            }
        })
        .collect();

    let ratios: Vec<f64> = expenditure_trends.iter().map(|y| y.ratio).collect();
    let time_span = match (expenditure_trends.first(), expenditure_trends.last()) {
        (Some(first), Some(last)) => format!("{}-{}", first.year, last.year),
        _ => "N/A".to_string(),
    };
    let latest = expenditure_trends.last();
    let summary = ExpenditureSummary {
        side_a_label: SIDE_A_COLUMN.to_string(),
        side_b_label: SIDE_B_COLUMN.to_string(),
        time_span,
        current_ratio: latest.map(|y| y.ratio),
        avg_ratio: mean(&ratios),
        total_years: expenditure_trends.len(),
        latest_side_a: latest.map(|y| y.side_a),
        latest_side_b: latest.map(|y| y.side_b),
        peak_side_a_year: expenditure_trends
            .iter()
            .fold(None::<&ExpenditureYear>, |best, y| match best {
                Some(b) if b.side_a >= y.side_a => Some(b),
                _ => Some(y),
            })
            .map(|y| y.year),
    };

    debug!(
        rows = records.len(),
        years = expenditure_trends.len(),
        decades = decade_analysis.len(),
        "normalized expenditure dataset"
    );

    Ok(Some(ExpenditureDataset {
        expenditure_trends,
        decade_analysis,
        summary,
    }))
}
