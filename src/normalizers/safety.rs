// Coast guard safety reports: defect summaries and incident analyses
// mixed in one record stream, told apart by a report-type column.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{require_any, shares};
use crate::error::NormalizeError;
use crate::record::RawRecord;
use crate::types::Share;
use crate::util::{parse_number, parse_year, percentage};

const DATASET: &str = "safety reports";
pub const TYPE_COLUMNS: [&str; 3] = ["Report Type", "Record Type", "Type"];
pub const UNIT_COLUMNS: [&str; 4] = ["Unit", "Aircraft", "Aircraft Type", "Unit/Aircraft"];
pub const ITEM_COLUMNS: [&str; 4] = ["Defect", "Item", "Defective Item", "Component"];
pub const CAUSE_COLUMNS: [&str; 3] = ["Cause", "Cause Classification", "Cause of Incident"];
pub const DATE_COLUMNS: [&str; 2] = ["Date", "Year"];
pub const COUNT_COLUMN: &str = "Count";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportKind {
    Defect,
    Incident,
    Other,
}

fn classify(record: &RawRecord) -> ReportKind {
    let Some(kind) = record.first_text(&TYPE_COLUMNS) else {
        return ReportKind::Other;
    };
    let kind = kind.to_lowercase();
    if kind.contains("defect") {
        ReportKind::Defect
    } else if kind.contains("incident") {
        ReportKind::Incident
    } else {
        ReportKind::Other
    }
}

/// Rows may carry an explicit count (zero included); a missing or
/// sentinel count means the row is one report.
fn weight(record: &RawRecord) -> f64 {
    record
        .present(COUNT_COLUMN)
        .map(|v| parse_number(v).max(0.0))
        .unwrap_or(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectAnalysis {
    pub defect_by_unit: Vec<Share>,
    pub common_defects: Vec<Share>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentAnalysis {
    pub incident_by_unit: Vec<Share>,
    pub cause_classification: Vec<Share>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyYear {
    pub year: i32,
    pub defects: f64,
    pub incidents: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyMetrics {
    pub total_records: f64,
    pub defect_rate: f64,
    pub incident_rate: f64,
    pub safety_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetySummary {
    pub total_reports: f64,
    pub total_defects: f64,
    pub total_incidents: f64,
    pub safety_index: f64,
    pub top_defect_unit: Option<String>,
    pub top_cause: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyDataset {
    pub defect_analysis: DefectAnalysis,
    pub incident_analysis: IncidentAnalysis,
    pub yearly_trends: Vec<SafetyYear>,
    pub safety_metrics: SafetyMetrics,
    pub summary: SafetySummary,
}

/// Weighted frequency of the label found under `columns`.
fn frequency(records: &[&RawRecord], columns: &[&str]) -> Vec<Share> {
    let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for r in records {
        let Some(label) = r.first_text(columns) else {
            continue;
        };
        let w = weight(r);
        if w == 0.0 {
            continue;
        }
        let e = groups.entry(label).or_insert((0.0, 0));
        e.0 += w;
        e.1 += 1;
    }
    shares(groups.into_iter().map(|(k, (v, c))| (k, v, c)))
}

pub fn normalize(records: &[RawRecord]) -> Result<Option<SafetyDataset>, NormalizeError> {
    if records.is_empty() {
        return Ok(None);
    }
    require_any(records, DATASET, &TYPE_COLUMNS)?;

    let mut defects: Vec<&RawRecord> = Vec::new();
    let mut incidents: Vec<&RawRecord> = Vec::new();
    let mut total_records = 0.0;
    for r in records {
        total_records += weight(r);
        match classify(r) {
            ReportKind::Defect => defects.push(r),
            ReportKind::Incident => incidents.push(r),
            ReportKind::Other => {}
        }
    }

    let defect_analysis = DefectAnalysis {
        defect_by_unit: frequency(&defects, &UNIT_COLUMNS),
        common_defects: frequency(&defects, &ITEM_COLUMNS),
    };
    let incident_analysis = IncidentAnalysis {
        incident_by_unit: frequency(&incidents, &UNIT_COLUMNS),
        cause_classification: frequency(&incidents, &CAUSE_COLUMNS),
    };

    let mut by_year: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for r in records {
        let Some(year) = r.first_present(&DATE_COLUMNS).and_then(parse_year) else {
            continue;
        };
        match classify(r) {
            ReportKind::Defect => by_year.entry(year).or_default().0 += weight(r),
            ReportKind::Incident => by_year.entry(year).or_default().1 += weight(r),
            ReportKind::Other => {}
        }
    }
    let yearly_trends = by_year
        .into_iter()
        .map(|(year, (defects, incidents))| SafetyYear {
            year,
            defects,
            incidents,
        })
        .collect();

    let total_defects: f64 = defects.iter().map(|r| weight(r)).sum();
    let total_incidents: f64 = incidents.iter().map(|r| weight(r)).sum();
    let incident_rate = percentage(total_incidents, total_records);
    let safety_metrics = SafetyMetrics {
        total_records,
        defect_rate: percentage(total_defects, total_records),
        incident_rate,
        safety_index: (100.0 - incident_rate).max(0.0),
    };

    let summary = SafetySummary {
        total_reports: total_records,
        total_defects,
        total_incidents,
        safety_index: safety_metrics.safety_index,
        top_defect_unit: defect_analysis
            .defect_by_unit
            .first()
            .map(|s| s.dimension.clone()),
        top_cause: incident_analysis
            .cause_classification
            .first()
            .map(|s| s.dimension.clone()),
    };

    debug!(
        rows = records.len(),
        defects = defects.len(),
        incidents = incidents.len(),
        "normalized safety dataset"
    );

    Ok(Some(SafetyDataset {
        defect_analysis,
        incident_analysis,
        yearly_trends,
        safety_metrics,
        summary,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(kind: &str, unit: &str, extra: &[(&str, &str)]) -> RawRecord {
        let mut r: RawRecord = [("Report Type", kind), ("Unit", unit)].into_iter().collect();
        for (c, v) in extra {
            r.insert(*c, *v);
        }
        r
    }

    #[test]
    fn explicit_zero_count_reports_nothing() {
        let data = vec![
            report("Incident", "ALH 834", &[("Count", "0"), ("Cause", "Technical")]),
            report("Defect", "Dornier 751", &[("Count", "4")]),
        ];
        let out = normalize(&data).unwrap().unwrap();
        assert_eq!(out.summary.total_reports, 4.0);
        assert_eq!(out.summary.total_incidents, 0.0);
        assert_eq!(out.summary.total_defects, 4.0);
        assert_eq!(out.summary.safety_index, 100.0);
        assert!(out.incident_analysis.cause_classification.is_empty());
    }

    fn sample() -> Vec<RawRecord> {
        vec![
            report("Defect Summary", "Dornier 751", &[("Defect", "Hydraulic leak"), ("Date", "2021-03-04")]),
            report("Defect Summary", "Dornier 751", &[("Defect", "Avionics"), ("Date", "2021-05-10")]),
            report("Defect Summary", "ALH 834", &[("Defect", "Hydraulic leak"), ("Date", "2022-01-02")]),
            report("Incident Analysis", "ALH 834", &[("Cause", "Technical"), ("Date", "2022-07-19")]),
            report("Maintenance Log", "ALH 834", &[]),
        ]
    }

    #[test]
    fn partitions_by_report_type() {
        let out = normalize(&sample()).unwrap().unwrap();
        assert_eq!(out.summary.total_reports, 5.0);
        assert_eq!(out.summary.total_defects, 3.0);
        assert_eq!(out.summary.total_incidents, 1.0);
        assert_eq!(out.defect_analysis.defect_by_unit[0].dimension, "Dornier 751");
        assert_eq!(out.defect_analysis.common_defects[0].dimension, "Hydraulic leak");
        assert_eq!(out.incident_analysis.cause_classification[0].percentage, 100.0);
        assert_eq!(out.summary.top_cause.as_deref(), Some("Technical"));
    }

    #[test]
    fn safety_index_from_incident_rate() {
        let out = normalize(&sample()).unwrap().unwrap();
        assert_eq!(out.safety_metrics.incident_rate, 20.0);
        assert_eq!(out.safety_metrics.defect_rate, 60.0);
        assert_eq!(out.safety_metrics.safety_index, 80.0);
    }

    #[test]
    fn yearly_trend_counts_each_partition() {
        let out = normalize(&sample()).unwrap().unwrap();
        assert_eq!(out.yearly_trends.len(), 2);
        assert_eq!(out.yearly_trends[0].year, 2021);
        assert_eq!(out.yearly_trends[0].defects, 2.0);
        assert_eq!(out.yearly_trends[1].incidents, 1.0);
    }

    #[test]
    fn count_column_weights_rows() {
        let data = vec![
            report("Incident", "Dornier 751", &[("Count", "3")]),
            report("Defect", "Dornier 751", &[("Count", "NA")]),
        ];
        let out = normalize(&data).unwrap().unwrap();
        assert_eq!(out.summary.total_reports, 4.0);
        assert_eq!(out.safety_metrics.incident_rate, 75.0);
        assert_eq!(out.safety_metrics.safety_index, 25.0);
    }
}
