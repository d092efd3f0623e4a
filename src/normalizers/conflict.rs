// Conflict escalation events: per-year patterns and an event-type
// distribution.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{count_shares, require_any};
use crate::error::NormalizeError;
use crate::record::RawRecord;
use crate::types::Share;
use crate::util::{mean, parse_number, parse_year};

const DATASET: &str = "conflict";
pub const DATE_COLUMN: &str = "Date";
pub const EVENT_TYPE_COLUMN: &str = "Event Type";
pub const ESCALATION_COLUMN: &str = "Escalation Level";
pub const LOCATION_COLUMN: &str = "Location";
pub const DESCRIPTION_COLUMN: &str = "Event Description";
pub const TIMELINE_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEvent {
    pub date: String,
    pub year: i32,
    pub event_type: String,
    pub escalation_level: Option<f64>,
    pub location: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationYear {
    pub year: i32,
    pub total_incidents: usize,
    pub average_escalation: f64,
    pub event_type_breakdown: BTreeMap<String, usize>,
    pub location_breakdown: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSummary {
    pub total_incidents: usize,
    pub year_span: String,
    pub peak_year: Option<i32>,
    pub average_per_year: f64,
    pub highest_escalation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDataset {
    pub escalation_patterns: Vec<EscalationYear>,
    pub severity_trends: Vec<Share>,
    pub timeline: Vec<ConflictEvent>,
    pub summary: ConflictSummary,
}

pub fn normalize(records: &[RawRecord]) -> Result<Option<ConflictDataset>, NormalizeError> {
    if records.is_empty() {
        return Ok(None);
    }
    require_any(records, DATASET, &[EVENT_TYPE_COLUMN])?;

    let events: Vec<ConflictEvent> = records
        .iter()
        .filter_map(|r| {
            let date = r.text(DATE_COLUMN)?;
            let event_type = r.text(EVENT_TYPE_COLUMN)?;
            let year = r.present(DATE_COLUMN).and_then(parse_year)?;
            Some(ConflictEvent {
                date,
                year,
                event_type,
                escalation_level: r.present(ESCALATION_COLUMN).map(parse_number),
                location: r
                    .text(LOCATION_COLUMN)
                    .unwrap_or_else(|| "Unknown".to_string()),
                description: r.text(DESCRIPTION_COLUMN),
            })
        })
        .collect();

    let mut by_year: BTreeMap<i32, Vec<&ConflictEvent>> = BTreeMap::new();
    for e in &events {
        by_year.entry(e.year).or_default().push(e);
    }
    let escalation_patterns: Vec<EscalationYear> = by_year
        .into_iter()
        .map(|(year, group)| {
            let levels: Vec<f64> = group.iter().filter_map(|e| e.escalation_level).collect();
            let mut event_type_breakdown: BTreeMap<String, usize> = BTreeMap::new();
            let mut location_breakdown: BTreeMap<String, usize> = BTreeMap::new();
            for e in &group {
                *event_type_breakdown.entry(e.event_type.clone()).or_default() += 1;
                *location_breakdown.entry(e.location.clone()).or_default() += 1;
            }
            EscalationYear {
                year,
                total_incidents: group.len(),
                average_escalation: mean(&levels),
                event_type_breakdown,
                location_breakdown,
            }
        })
        .collect();

    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    for e in &events {
        *by_type.entry(e.event_type.clone()).or_default() += 1;
    }
    let severity_trends = count_shares(by_type);

    let per_year: Vec<f64> = escalation_patterns
        .iter()
        .map(|y| y.total_incidents as f64)
        .collect();
    let year_span = match (escalation_patterns.first(), escalation_patterns.last()) {
        (Some(first), Some(last)) => format!("{}-{}", first.year, last.year),
        _ => "N/A".to_string(),
    };
    let summary = ConflictSummary {
        total_incidents: events.len(),
        year_span,
        peak_year: escalation_patterns
            .iter()
            .fold(None::<&EscalationYear>, |best, y| match best {
                Some(b) if b.total_incidents >= y.total_incidents => Some(b),
                _ => Some(y),
            })
            .map(|y| y.year),
        average_per_year: mean(&per_year),
        highest_escalation: events
            .iter()
            .filter_map(|e| e.escalation_level)
            .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v)))),
    };

    debug!(
        rows = records.len(),
        events = events.len(),
        years = escalation_patterns.len(),
        "normalized conflict dataset"
    );

    let timeline = events.into_iter().take(TIMELINE_LIMIT).collect();
    Ok(Some(ConflictDataset {
        escalation_patterns,
        severity_trends,
        timeline,
        summary,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(date: &str, kind: &str, level: &str, location: Option<&str>) -> RawRecord {
        let mut r: RawRecord = [
            (DATE_COLUMN, date),
            (EVENT_TYPE_COLUMN, kind),
            (ESCALATION_COLUMN, level),
        ]
        .into_iter()
        .collect();
        if let Some(loc) = location {
            r.insert(LOCATION_COLUMN, loc);
        }
        r
    }

    #[test]
    fn groups_by_year_from_mixed_date_formats() {
        let data = vec![
            event("2016-09-29", "Surgical Strike", "4", Some("LoC")),
            event("14/02/2019", "Terror Attack", "5", Some("Pulwama")),
            event("26 Feb 2019", "Air Strike", "NA", None),
            event("unknown", "Skirmish", "2", None),
        ];
        let out = normalize(&data).unwrap().unwrap();
        assert_eq!(out.summary.total_incidents, 3);
        assert_eq!(out.escalation_patterns.len(), 2);
        let y2019 = &out.escalation_patterns[1];
        assert_eq!(y2019.year, 2019);
        assert_eq!(y2019.total_incidents, 2);
        // The NA escalation row counts as an incident but not toward the mean.
        assert_eq!(y2019.average_escalation, 5.0);
        assert_eq!(y2019.location_breakdown.get("Unknown"), Some(&1));
        assert_eq!(out.summary.year_span, "2016-2019");
        assert_eq!(out.summary.peak_year, Some(2019));
        assert_eq!(out.summary.highest_escalation, Some(5.0));
    }

    #[test]
    fn severity_distribution_percentages() {
        let data = vec![
            event("2019", "Ceasefire Violation", "1", None),
            event("2020", "Ceasefire Violation", "1", None),
            event("2020", "Infiltration", "2", None),
            event("2021", "Ceasefire Violation", "1", None),
        ];
        let out = normalize(&data).unwrap().unwrap();
        assert_eq!(out.severity_trends[0].dimension, "Ceasefire Violation");
        assert_eq!(out.severity_trends[0].percentage, 75.0);
        assert_eq!(out.severity_trends[1].percentage, 25.0);
    }

    #[test]
    fn no_dated_rows_gives_na_span() {
        let out = normalize(&[event("", "Skirmish", "1", None)]).unwrap().unwrap();
        assert_eq!(out.summary.year_span, "N/A");
        assert_eq!(out.summary.peak_year, None);
        assert!(out.severity_trends.is_empty());
    }
}
