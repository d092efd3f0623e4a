// The single untyped boundary of the crate: one loaded row, keyed by
// column name. Everything past the normalizers is strongly typed.
use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::util::is_sentinel;

/// A cell as it arrives from a loader or a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// `true` for empty cells and "not applicable" sentinels like `NA`.
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Number(n) => !n.is_finite(),
            RawValue::Text(s) => s.trim().is_empty() || is_sentinel(s),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s.trim()),
            RawValue::Number(_) => None,
        }
    }

    /// Display form used for grouping labels.
    pub fn label(&self) -> String {
        match self {
            RawValue::Text(s) => s.trim().to_string(),
            RawValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            RawValue::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(BTreeMap<String, RawValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.0.get(column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// The cell under `column`, unless it is missing, empty or a sentinel.
    pub fn present(&self, column: &str) -> Option<&RawValue> {
        self.0.get(column).filter(|v| !v.is_blank())
    }

    /// First present cell among a list of column aliases.
    pub fn first_present(&self, columns: &[&str]) -> Option<&RawValue> {
        columns.iter().find_map(|c| self.present(c))
    }

    /// Trimmed label for a present cell (numbers are rendered).
    pub fn text(&self, column: &str) -> Option<String> {
        self.present(column).map(RawValue::label)
    }

    pub fn first_text(&self, columns: &[&str]) -> Option<String> {
        self.first_present(columns).map(RawValue::label)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<RawValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RawRecord(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One loaded file: its rows plus where and when they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDataset {
    pub data: Vec<RawRecord>,
    pub filename: String,
    pub last_updated: DateTime<Local>,
    pub record_count: usize,
}

impl RawDataset {
    pub fn new(filename: impl Into<String>, data: Vec<RawRecord>) -> Self {
        RawDataset {
            record_count: data.len(),
            data,
            filename: filename.into(),
            last_updated: Local::now(),
        }
    }
}

/// Column names seen anywhere in a dataset. Rows are scanned in order and
/// each row yields its columns alphabetically, so a column first appears at
/// the position of the earliest row that carries it.
pub fn column_union(records: &[RawRecord]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for r in records {
        for c in r.columns() {
            if !out.iter().any(|seen| seen == c) {
                out.push(c.to_string());
            }
        }
    }
    out
}
