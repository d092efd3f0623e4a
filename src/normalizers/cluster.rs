// Technology-cluster budget allocation: one row per cluster, with a
// budget (and optionally a reported share) per fiscal year.
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{growth_series, is_footer, shares};
use crate::error::NormalizeError;
use crate::record::RawRecord;
use crate::types::{GrowthPoint, Share};
use crate::util::{parse_number, percentage};

const DATASET: &str = "cluster budget";
pub const CATEGORY_COLUMNS: [&str; 4] =
    ["Cluster", "Category", "Technology Cluster", "Name of Cluster"];

static FISCAL_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\s*-\s*(\d{2,4})").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Budget,
    Share,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FiscalColumn {
    name: String,
    year: i32,
    label: String,
    kind: ColumnKind,
    /// Budget estimate (0) before revised estimate (1) before anything else.
    precedence: u8,
}

fn stage_precedence(lower_name: &str) -> u8 {
    let mut words = lower_name.split(|c: char| !c.is_ascii_alphanumeric());
    if words.clone().any(|w| w == "be") {
        0
    } else if words.any(|w| w == "re") {
        1
    } else {
        2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterYear {
    pub fiscal_year: String,
    pub year: i32,
    pub budget: Option<f64>,
    pub reported_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTrendYear {
    pub fiscal_year: String,
    pub year: i32,
    pub total_budget: f64,
    pub categories: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub latest_fiscal_year: Option<String>,
    pub latest_total_budget: f64,
    pub total_categories: usize,
    pub top_category: Option<String>,
    pub top_category_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDataset {
    /// Allocation in the most recent fiscal year, one share per cluster.
    pub latest_allocation: Vec<Share>,
    /// Share each cluster reported for that same year, when the source
    /// carries a percentage column.
    pub reported_percentages: BTreeMap<String, f64>,
    pub history: BTreeMap<String, Vec<ClusterYear>>,
    pub yearly_totals: Vec<ClusterTrendYear>,
    pub growth_rates: Vec<GrowthPoint>,
    pub summary: ClusterSummary,
}

fn fiscal_columns(records: &[RawRecord]) -> Vec<FiscalColumn> {
    let mut found: BTreeMap<String, FiscalColumn> = BTreeMap::new();
    for r in records {
        for name in r.columns() {
            if found.contains_key(name) {
                continue;
            }
            let Some(cap) = FISCAL_YEAR.captures(name) else {
                continue;
            };
            let Ok(year) = cap[1].parse::<i32>() else {
                continue;
            };
            let tail = &cap[2];
            let label = format!("{}-{}", year, &tail[tail.len() - 2..]);
            let lower = name.to_lowercase();
            let kind = if lower.contains('%') || lower.contains("percent") || lower.contains("share")
            {
                ColumnKind::Share
            } else {
                ColumnKind::Budget
            };
            found.insert(
                name.to_string(),
                FiscalColumn {
                    name: name.to_string(),
                    year,
                    label,
                    kind,
                    precedence: stage_precedence(&lower),
                },
            );
        }
    }
    let mut columns: Vec<FiscalColumn> = found.into_values().collect();
    columns.sort_by(|a, b| a.precedence.cmp(&b.precedence).then_with(|| a.name.cmp(&b.name)));
    columns
}

pub fn normalize(records: &[RawRecord]) -> Result<Option<ClusterDataset>, NormalizeError> {
    if records.is_empty() {
        return Ok(None);
    }
    let columns = fiscal_columns(records);
    if !columns.iter().any(|c| c.kind == ColumnKind::Budget) {
        return Err(NormalizeError::Malformed {
            dataset: DATASET,
            reason: "no fiscal-year budget columns found".to_string(),
        });
    }
    if !records
        .iter()
        .any(|r| CATEGORY_COLUMNS.iter().any(|c| r.has_column(c)))
    {
        return Err(NormalizeError::MissingColumns {
            dataset: DATASET,
            columns: CATEGORY_COLUMNS.to_vec(),
        });
    }

    let mut history: BTreeMap<String, Vec<ClusterYear>> = BTreeMap::new();
    for r in records {
        let Some(category) = r.first_text(&CATEGORY_COLUMNS) else {
            continue;
        };
        if is_footer(&category) {
            continue;
        }
        let mut per_year: BTreeMap<i32, ClusterYear> = BTreeMap::new();
        for col in &columns {
            let Some(value) = r.present(&col.name) else {
                continue;
            };
            let entry = per_year.entry(col.year).or_insert_with(|| ClusterYear {
                fiscal_year: col.label.clone(),
                year: col.year,
                budget: None,
                reported_percentage: None,
            });
            // Columns arrive in precedence order; the first value per year wins.
            let slot = match col.kind {
                ColumnKind::Budget => &mut entry.budget,
                ColumnKind::Share => &mut entry.reported_percentage,
            };
            if slot.is_some() {
                debug!(
                    category = %category,
                    column = %col.name,
                    fiscal_year = %col.label,
                    "fiscal year already filled by a preferred column"
                );
            } else {
                *slot = Some(parse_number(value));
            }
        }
        let years: Vec<ClusterYear> = per_year.into_values().collect();
        if !years.is_empty() {
            history.entry(category).or_default().extend(years);
        }
    }
    for years in history.values_mut() {
        years.sort_by_key(|y| y.year);
    }

    let mut totals: BTreeMap<i32, (String, f64, usize)> = BTreeMap::new();
    for years in history.values() {
        for y in years {
            if let Some(budget) = y.budget {
                let e = totals
                    .entry(y.year)
                    .or_insert_with(|| (y.fiscal_year.clone(), 0.0, 0));
                e.1 += budget;
                e.2 += 1;
            }
        }
    }
    let yearly_totals: Vec<ClusterTrendYear> = totals
        .into_iter()
        .filter(|(_, (_, total, _))| *total != 0.0)
        .map(|(year, (fiscal_year, total_budget, categories))| ClusterTrendYear {
            fiscal_year,
            year,
            total_budget,
            categories,
        })
        .collect();
    let points: Vec<(i32, f64)> = yearly_totals
        .iter()
        .map(|y| (y.year, y.total_budget))
        .collect();
    let growth_rates = growth_series(&points);

    let latest = yearly_totals.last();
    let (latest_allocation, reported_percentages) = match latest {
        Some(latest) => {
            let mut reported = BTreeMap::new();
            let entries: Vec<(String, f64, usize)> = history
                .iter()
                .filter_map(|(category, years)| {
                    let y = years.iter().rev().find(|y| y.year == latest.year)?;
                    if let Some(p) = y.reported_percentage {
                        reported.insert(category.clone(), p);
                    }
                    Some((category.clone(), y.budget?, 1))
                })
                .collect();
            (shares(entries), reported)
        }
        None => (Vec::new(), BTreeMap::new()),
    };

    let latest_total: f64 = latest_allocation.iter().map(|s| s.metric).sum();
    let summary = ClusterSummary {
        latest_fiscal_year: latest.map(|y| y.fiscal_year.clone()),
        latest_total_budget: latest_total,
        total_categories: history.len(),
        top_category: latest_allocation.first().map(|s| s.dimension.clone()),
        top_category_share: latest_allocation
            .first()
            .map(|s| percentage(s.metric, latest_total))
            .unwrap_or(0.0),
    };

    debug!(
        rows = records.len(),
        categories = history.len(),
        fiscal_years = yearly_totals.len(),
        "normalized cluster budget dataset"
    );

    Ok(Some(ClusterDataset {
        latest_allocation,
        reported_percentages,
        history,
        yearly_totals,
        growth_rates,
        summary,
    }))
}
