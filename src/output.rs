use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::state::{AnalyticalState, DatasetKind};
use crate::types::{top, GrowthPoint, Share, ShareRow, StatusRow, TrendRow};
use crate::util::format_number;

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value).context("serializing analytical state")?;
    std::fs::write(path, s).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Markdown table of the first `max_rows` rows, or `(no rows)`.
pub fn render_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_rows(rows, max_rows));
}

pub fn share_rows(series: &[Share], n: usize) -> Vec<ShareRow> {
    top(series, n).iter().map(ShareRow::from).collect()
}

/// Yearly values joined with the growth over the preceding year.
pub fn trend_rows(values: &[(i32, f64)], growth: &[GrowthPoint]) -> Vec<TrendRow> {
    values
        .iter()
        .map(|&(year, value)| TrendRow {
            year,
            value: format_number(value, 2),
            growth: growth
                .iter()
                .find(|g| g.year == year)
                .map_or_else(|| "-".to_string(), |g| format!("{}%", format_number(g.growth_rate, 2))),
        })
        .collect()
}

pub fn status_rows(state: &AnalyticalState) -> Vec<StatusRow> {
    DatasetKind::ALL
        .iter()
        .map(|&kind| StatusRow {
            dataset: kind.title().to_string(),
            status: state.outcome(kind).status(),
        })
        .collect()
}

/// Print one titled section the way every dashboard panel is laid out.
pub fn preview_section<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    preview_table_rows(rows, max_rows);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Outcome;
    use std::collections::BTreeMap;

    fn share(d: &str, metric: f64, pct: f64) -> Share {
        Share {
            dimension: d.to_string(),
            metric,
            count: 1,
            percentage: pct,
        }
    }

    #[test]
    fn top_rows_keep_full_series_percentages() {
        let series = vec![share("A", 50.0, 50.0), share("B", 30.0, 30.0), share("C", 20.0, 20.0)];
        let rows = share_rows(&series, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].share, "30.00%");
    }

    #[test]
    fn trend_rows_mark_first_year_without_growth() {
        let rows = trend_rows(
            &[(2020, 100.0), (2021, 150.0)],
            &[GrowthPoint {
                year: 2021,
                growth_rate: 50.0,
            }],
        );
        assert_eq!(rows[0].growth, "-");
        assert_eq!(rows[1].growth, "50.00%");
    }

    #[test]
    fn status_table_lists_every_dataset() {
        let mut datasets = BTreeMap::new();
        datasets.insert(DatasetKind::Budget, Outcome::Failed("bad".into()));
        let state = AnalyticalState::new(datasets, BTreeMap::new());
        let rows = status_rows(&state);
        assert_eq!(rows.len(), DatasetKind::ALL.len());
        assert!(rows.iter().any(|r| r.status == "Failed: bad"));
        assert!(rows.iter().any(|r| r.status == "Absent"));
    }

    #[test]
    fn empty_tables_render_placeholder() {
        assert_eq!(render_rows::<StatusRow>(&[], 5), "(no rows)");
    }

    #[test]
    fn json_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_json(&path, &serde_json::json!({"armyRecruits": null})).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("armyRecruits"));
    }
}
