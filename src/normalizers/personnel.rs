// Army recruitment: one row per state/UT, one column per recruiting year.
use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{growth_series, is_footer, require_any, shares};
use crate::error::NormalizeError;
use crate::record::RawRecord;
use crate::types::{GrowthPoint, Share};
use crate::util::{mean, parse_number};

const DATASET: &str = "personnel";
pub const REGION_COLUMN: &str = "State/UTs";
pub const DEFAULT_YEAR_COLUMNS: [&str; 5] = [
    "RtgYr - 2017-18",
    "RtgYr - 2018-19",
    "RtgYr - 2019-20",
    "RtgYr - 2020-21",
    "RtgYr - 2021-22",
];

static YEAR_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^RtgYr\s*-\s*(\d{4})").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruitmentYear {
    pub year: i32,
    pub total_recruits: f64,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelSummary {
    pub total_recruits: f64,
    pub average_per_year: f64,
    pub peak_year: Option<i32>,
    pub total_regions: usize,
    pub top_region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelDataset {
    pub yearly_trends: Vec<RecruitmentYear>,
    pub regional_breakdown: Vec<Share>,
    pub growth_rates: Vec<GrowthPoint>,
    pub summary: PersonnelSummary,
}

/// Year columns present in the data, in year order. Falls back to the
/// known 2017-18 .. 2021-22 layout.
fn year_columns(records: &[RawRecord]) -> Vec<(i32, String)> {
    let mut found: BTreeSet<(i32, String)> = BTreeSet::new();
    for r in records {
        for c in r.columns() {
            if let Some(cap) = YEAR_COLUMN.captures(c) {
                if let Ok(year) = cap[1].parse::<i32>() {
                    found.insert((year, c.to_string()));
                }
            }
        }
    }
    if found.is_empty() {
        return DEFAULT_YEAR_COLUMNS
            .iter()
            .filter_map(|c| {
                let year = YEAR_COLUMN.captures(c)?[1].parse::<i32>().ok()?;
                Some((year, c.to_string()))
            })
            .collect();
    }
    found.into_iter().collect()
}

pub fn normalize(records: &[RawRecord]) -> Result<Option<PersonnelDataset>, NormalizeError> {
    if records.is_empty() {
        return Ok(None);
    }
    let columns = year_columns(records);
    let mut required: Vec<&'static str> = DEFAULT_YEAR_COLUMNS.to_vec();
    required.push(REGION_COLUMN);
    require_any(records, DATASET, &required)?;
    if !records
        .iter()
        .any(|r| columns.iter().any(|(_, c)| r.has_column(c)))
    {
        return Err(NormalizeError::Malformed {
            dataset: DATASET,
            reason: "no recruiting-year columns found".to_string(),
        });
    }

    let rows: Vec<&RawRecord> = records
        .iter()
        .filter(|r| !r.text(REGION_COLUMN).is_some_and(|region| is_footer(&region)))
        .collect();

    // Sentinel cells are skipped, so a year whose only cells are `NA`
    // sums to zero and is dropped below.
    let yearly_trends: Vec<RecruitmentYear> = columns
        .iter()
        .map(|(year, col)| {
            let present: Vec<f64> = rows
                .iter()
                .filter_map(|r| r.present(col))
                .map(parse_number)
                .collect();
            RecruitmentYear {
                year: *year,
                total_recruits: present.iter().sum(),
                record_count: present.len(),
            }
        })
        .filter(|y| y.total_recruits != 0.0)
        .collect();

    let regional_breakdown = shares(
        rows
            .iter()
            .filter_map(|r| {
                let region = r.text(REGION_COLUMN)?;
                let cells: Vec<f64> = columns
                    .iter()
                    .filter_map(|(_, col)| r.present(col))
                    .map(parse_number)
                    .collect();
                let total: f64 = cells.iter().sum();
                (total > 0.0).then_some((region, total, cells.len()))
            })
            .collect::<Vec<_>>(),
    );

    let points: Vec<(i32, f64)> = yearly_trends
        .iter()
        .map(|y| (y.year, y.total_recruits))
        .collect();
    let growth_rates = growth_series(&points);

    let totals: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let summary = PersonnelSummary {
        total_recruits: totals.iter().sum(),
        average_per_year: mean(&totals),
        peak_year: yearly_trends
            .iter()
            .fold(None::<&RecruitmentYear>, |best, y| match best {
                Some(b) if b.total_recruits >= y.total_recruits => Some(b),
                _ => Some(y),
            })
            .map(|y| y.year),
        total_regions: regional_breakdown.len(),
        top_region: regional_breakdown.first().map(|s| s.dimension.clone()),
    };

    debug!(
        rows = records.len(),
        years = yearly_trends.len(),
        regions = regional_breakdown.len(),
        "normalized personnel dataset"
    );

    Ok(Some(PersonnelDataset {
        yearly_trends,
        regional_breakdown,
        growth_rates,
        summary,
    }))
}
