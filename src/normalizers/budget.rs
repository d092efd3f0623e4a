// Annual defence budget with the R&D (DRDO) share.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{growth_series, require_any};
use crate::error::NormalizeError;
use crate::record::RawRecord;
use crate::types::GrowthPoint;
use crate::util::{mean, parse_number, parse_year, percentage};

const DATASET: &str = "budget";
pub const YEAR_COLUMN: &str = "Year";
pub const BUDGET_COLUMN: &str = "Annual Defence Budget (in Cr)";
pub const RD_COLUMN: &str = "Defence R&D Budget (in Cr)";
pub const RD_SHARE_COLUMN: &str = "Percentage of DRDO Budget to Defence Outlay";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetYear {
    pub year: i32,
    pub total_budget: f64,
    pub rd_budget: f64,
    pub rd_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub total_budget: f64,
    pub average_growth_rate: f64,
    pub peak_budget_year: Option<i32>,
    pub latest_budget: Option<f64>,
    pub latest_year: Option<i32>,
    pub total_rd_budget: f64,
    pub average_rd_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDataset {
    pub allocations: Vec<BudgetYear>,
    pub trends: Vec<GrowthPoint>,
    pub summary: BudgetSummary,
}

#[derive(Debug, Default)]
struct YearAccumulator {
    total_budget: f64,
    rd_budget: f64,
    reported_shares: Vec<f64>,
    rows: usize,
}

impl YearAccumulator {
    /// A single row keeps its reported share; merged rows are recomputed
    /// from the summed budgets.
    fn rd_percentage(&self) -> f64 {
        match self.reported_shares.as_slice() {
            [share] if self.rows == 1 => *share,
            shares if self.rd_budget == 0.0 && !shares.is_empty() => mean(shares),
            _ => percentage(self.rd_budget, self.total_budget),
        }
    }
}

pub fn normalize(records: &[RawRecord]) -> Result<Option<BudgetDataset>, NormalizeError> {
    if records.is_empty() {
        return Ok(None);
    }
    require_any(records, DATASET, &[BUDGET_COLUMN])?;

    // Rows labelled "2020-21" and "2020" are the same budget year.
    let mut by_year: BTreeMap<i32, YearAccumulator> = BTreeMap::new();
    for r in records {
        let (Some(year), Some(budget)) = (
            r.present(YEAR_COLUMN).and_then(parse_year),
            r.present(BUDGET_COLUMN),
        ) else {
            continue;
        };
        let acc = by_year.entry(year).or_default();
        acc.total_budget += parse_number(budget);
        acc.rd_budget += r.present(RD_COLUMN).map(parse_number).unwrap_or(0.0);
        if let Some(share) = r.present(RD_SHARE_COLUMN) {
            acc.reported_shares.push(parse_number(share));
        }
        acc.rows += 1;
    }
    let allocations: Vec<BudgetYear> = by_year
        .into_iter()
        .filter(|(_, acc)| acc.total_budget != 0.0)
        .map(|(year, acc)| BudgetYear {
            year,
            total_budget: acc.total_budget,
            rd_budget: acc.rd_budget,
            rd_percentage: acc.rd_percentage(),
        })
        .collect();

    let points: Vec<(i32, f64)> = allocations
        .iter()
        .map(|b| (b.year, b.total_budget))
        .collect();
    let trends = growth_series(&points);

    let growth: Vec<f64> = trends.iter().map(|g| g.growth_rate).collect();
    let rd_shares: Vec<f64> = allocations.iter().map(|b| b.rd_percentage).collect();
    let summary = BudgetSummary {
        total_budget: allocations.iter().map(|b| b.total_budget).sum(),
        average_growth_rate: mean(&growth),
        peak_budget_year: allocations
            .iter()
            .fold(None::<&BudgetYear>, |best, b| match best {
                Some(p) if p.total_budget >= b.total_budget => Some(p),
                _ => Some(b),
            })
            .map(|b| b.year),
        latest_budget: allocations.last().map(|b| b.total_budget),
        latest_year: allocations.last().map(|b| b.year),
        total_rd_budget: allocations.iter().map(|b| b.rd_budget).sum(),
        average_rd_percentage: mean(&rd_shares),
    };

    debug!(rows = records.len(), years = allocations.len(), "normalized budget dataset");

    Ok(Some(BudgetDataset {
        allocations,
        trends,
        summary,
    }))
}
