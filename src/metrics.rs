// Headline figures for the command dashboard.
use serde::Serialize;

use crate::state::AnalyticalState;
use crate::types::MetricRow;
use crate::util::{format_int, format_number, or_na};

/// Key numbers across all datasets; each is zero (or `None`) when its
/// dataset is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_recruits: f64,
    pub total_export_value: f64,
    pub total_budget: f64,
    pub conflict_incidents: usize,
    pub safety_index: f64,
    pub total_reports: f64,
    pub total_defects: f64,
    pub total_incidents: f64,
    pub home_rank: Option<u32>,
    pub datasets_ready: usize,
}

impl DashboardMetrics {
    pub fn from_state(state: &AnalyticalState) -> Self {
        let safety = state.safety().map(|s| &s.summary);
        DashboardMetrics {
            total_recruits: state.personnel().map_or(0.0, |p| p.summary.total_recruits),
            total_export_value: state
                .exports()
                .map_or(0.0, |e| e.summary.total_export_value),
            total_budget: state.budget().map_or(0.0, |b| b.summary.total_budget),
            conflict_incidents: state.conflict().map_or(0, |c| c.summary.total_incidents),
            safety_index: safety.map_or(0.0, |s| s.safety_index),
            total_reports: safety.map_or(0.0, |s| s.total_reports),
            total_defects: safety.map_or(0.0, |s| s.total_defects),
            total_incidents: safety.map_or(0.0, |s| s.total_incidents),
            home_rank: state
                .global_comparison()
                .and_then(|g| g.summary.home_rank),
            datasets_ready: state.ready_count(),
        }
    }

    pub fn rows(&self) -> Vec<MetricRow> {
        let row = |metric: &str, value: String| MetricRow {
            metric: metric.to_string(),
            value,
        };
        vec![
            row("Total recruits", format_int(self.total_recruits.round() as i64)),
            row("Export value (Cr)", format_number(self.total_export_value, 2)),
            row("Defence budget (Cr)", format_number(self.total_budget, 2)),
            row("Conflict incidents", format_int(self.conflict_incidents as i64)),
            row("Safety index", format!("{}%", format_number(self.safety_index, 1))),
            row("Safety reports", format_int(self.total_reports.round() as i64)),
            row("Defects", format_int(self.total_defects.round() as i64)),
            row("Incidents", format_int(self.total_incidents.round() as i64)),
            row("Global rank", or_na(self.home_rank.map(|r| format!("#{r}")))),
            row("Datasets ready", format_int(self.datasets_ready as i64)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawDataset, RawRecord};
    use crate::state::aggregate_all;
    use std::collections::BTreeMap;

    #[test]
    fn empty_state_yields_zeroes() {
        let m = DashboardMetrics::from_state(&aggregate_all(&BTreeMap::new()));
        assert_eq!(m, DashboardMetrics::default());
        let rows = m.rows();
        assert_eq!(rows[0].value, "0");
        assert_eq!(rows[8].value, "N/A");
    }

    #[test]
    fn budget_total_flows_through() {
        let mut sources = BTreeMap::new();
        sources.insert(
            "defenseBudgetTrends".to_string(),
            RawDataset::new(
                "Defense Budget Trends.csv",
                vec![
                    [("Year", "2020"), ("Annual Defence Budget (in Cr)", "100")]
                        .into_iter()
                        .collect::<RawRecord>(),
                    [("Year", "2021"), ("Annual Defence Budget (in Cr)", "150")]
                        .into_iter()
                        .collect::<RawRecord>(),
                ],
            ),
        );
        let m = DashboardMetrics::from_state(&aggregate_all(&sources));
        assert_eq!(m.total_budget, 250.0);
        assert_eq!(m.datasets_ready, 1);
        assert_eq!(m.total_recruits, 0.0);
    }
}
