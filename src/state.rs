//! The analytical state: every normalized dataset of a session, built
//! once by [`aggregate_all`] and read-only afterwards.
use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::NormalizeError;
use crate::normalizers::budget::{self, BudgetDataset};
use crate::normalizers::cluster::{self, ClusterDataset};
use crate::normalizers::conflict::{self, ConflictDataset};
use crate::normalizers::expenditure::{self, ExpenditureDataset};
use crate::normalizers::exports::{self, ExportsDataset};
use crate::normalizers::forces::{self, ForcesDataset};
use crate::normalizers::personnel::{self, PersonnelDataset};
use crate::normalizers::safety::{self, SafetyDataset};
use crate::record::{column_union, RawDataset, RawRecord};

/// Source key of the optional country-level export dataset. It feeds the
/// exports normalizer instead of being stored on its own.
pub const EXPORT_COUNTRY_REFERENCE_KEY: &str = "defenceExportCountries";

/// Rows kept from a dataset no normalizer recognizes.
pub const PASSTHROUGH_SAMPLE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DatasetKind {
    Personnel,
    Exports,
    Budget,
    ClusterBudget,
    Conflict,
    GlobalComparison,
    Expenditure,
    Safety,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 8] = [
        DatasetKind::Personnel,
        DatasetKind::Exports,
        DatasetKind::Budget,
        DatasetKind::ClusterBudget,
        DatasetKind::Conflict,
        DatasetKind::GlobalComparison,
        DatasetKind::Expenditure,
        DatasetKind::Safety,
    ];

    /// Key of the dataset inside the analytical state.
    pub fn logical_key(self) -> &'static str {
        match self {
            DatasetKind::Personnel => "armyRecruits",
            DatasetKind::Exports => "defenseExports",
            DatasetKind::Budget => "budgetTrends",
            DatasetKind::ClusterBudget => "defenseClusterBudget",
            DatasetKind::Conflict => "conflictData",
            DatasetKind::GlobalComparison => "globalComparison",
            DatasetKind::Expenditure => "militaryExpenditure",
            DatasetKind::Safety => "icgReports",
        }
    }

    /// Loader keys (derived from file names) this dataset is read from.
    pub fn source_keys(self) -> &'static [&'static str] {
        match self {
            DatasetKind::Personnel => &["armyRecruits20172022"],
            DatasetKind::Exports => &["defenceExport20172025"],
            DatasetKind::Budget => &["defenseBudgetTrends"],
            DatasetKind::ClusterBudget => &["defenseClusterBudgetAllocation"],
            DatasetKind::Conflict => &["indoPakConflictEscalation"],
            DatasetKind::GlobalComparison => &["globalArmedForces"],
            DatasetKind::Expenditure => &["militaryExpenditureIndoPak19602023"],
            DatasetKind::Safety => &["icgReports", "icgSafetyReports"],
        }
    }

    pub fn from_source_key(key: &str) -> Option<DatasetKind> {
        DatasetKind::ALL
            .into_iter()
            .find(|k| k.source_keys().contains(&key))
    }

    pub fn title(self) -> &'static str {
        match self {
            DatasetKind::Personnel => "Personnel Recruitment",
            DatasetKind::Exports => "Defence Exports",
            DatasetKind::Budget => "Budget Trends",
            DatasetKind::ClusterBudget => "Cluster Budget Allocation",
            DatasetKind::Conflict => "Conflict Escalation",
            DatasetKind::GlobalComparison => "Global Force Comparison",
            DatasetKind::Expenditure => "Military Expenditure",
            DatasetKind::Safety => "ICG Safety Reports",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.logical_key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Normalized {
    Personnel(PersonnelDataset),
    Exports(ExportsDataset),
    Budget(BudgetDataset),
    ClusterBudget(ClusterDataset),
    Conflict(ConflictDataset),
    GlobalComparison(ForcesDataset),
    Expenditure(ExpenditureDataset),
    Safety(SafetyDataset),
}

/// What became of one logical dataset.
///
/// `Absent` and `Failed` both render as "no data"; the difference is kept
/// for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ready(Normalized),
    Absent,
    Failed(String),
}

static ABSENT: Outcome = Outcome::Absent;

impl Outcome {
    pub fn ready(&self) -> Option<&Normalized> {
        match self {
            Outcome::Ready(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }

    pub fn status(&self) -> String {
        match self {
            Outcome::Ready(_) => "Ready".to_string(),
            Outcome::Absent => "Absent".to_string(),
            Outcome::Failed(reason) => format!("Failed: {reason}"),
        }
    }

    fn from_result<T>(
        kind: DatasetKind,
        result: Result<Option<T>, NormalizeError>,
        wrap: fn(T) -> Normalized,
    ) -> Outcome {
        match result {
            Ok(Some(dataset)) => Outcome::Ready(wrap(dataset)),
            Ok(None) => Outcome::Absent,
            Err(e) => {
                warn!(dataset = %kind, error = %e, "normalization failed");
                Outcome::Failed(e.to_string())
            }
        }
    }
}

/// Only ready datasets serialize to a value; everything else is `null`.
impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Outcome::Ready(n) => n.serialize(serializer),
            _ => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Passthrough {
    pub raw_data: Vec<RawRecord>,
    pub record_count: usize,
    pub columns: Vec<String>,
}

impl Passthrough {
    pub fn from_records(records: &[RawRecord]) -> Self {
        Passthrough {
            raw_data: records.iter().take(PASSTHROUGH_SAMPLE).cloned().collect(),
            record_count: records.len(),
            columns: column_union(records),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyticalState {
    datasets: BTreeMap<DatasetKind, Outcome>,
    passthrough: BTreeMap<String, Passthrough>,
}

macro_rules! accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> Option<&$ty> {
            match self.outcome(DatasetKind::$variant).ready() {
                Some(Normalized::$variant(d)) => Some(d),
                _ => None,
            }
        }
    };
}

impl AnalyticalState {
    pub fn new(
        datasets: BTreeMap<DatasetKind, Outcome>,
        passthrough: BTreeMap<String, Passthrough>,
    ) -> Self {
        AnalyticalState {
            datasets,
            passthrough,
        }
    }

    /// The outcome for `kind`; a missing key reads as `Absent`.
    pub fn outcome(&self, kind: DatasetKind) -> &Outcome {
        self.datasets.get(&kind).unwrap_or(&ABSENT)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (DatasetKind, &Outcome)> {
        self.datasets.iter().map(|(k, o)| (*k, o))
    }

    pub fn kinds(&self) -> impl Iterator<Item = DatasetKind> + '_ {
        self.datasets.keys().copied()
    }

    pub fn passthrough(&self) -> &BTreeMap<String, Passthrough> {
        &self.passthrough
    }

    pub fn ready_count(&self) -> usize {
        self.datasets.values().filter(|o| o.is_ready()).count()
    }

    accessor!(personnel, Personnel, PersonnelDataset);
    accessor!(exports, Exports, ExportsDataset);
    accessor!(budget, Budget, BudgetDataset);
    accessor!(cluster_budget, ClusterBudget, ClusterDataset);
    accessor!(conflict, Conflict, ConflictDataset);
    accessor!(global_comparison, GlobalComparison, ForcesDataset);
    accessor!(expenditure, Expenditure, ExpenditureDataset);
    accessor!(safety, Safety, SafetyDataset);
}

impl Serialize for AnalyticalState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.datasets.len() + self.passthrough.len()))?;
        for (kind, outcome) in &self.datasets {
            map.serialize_entry(kind.logical_key(), outcome)?;
        }
        for (key, entry) in &self.passthrough {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

fn normalize_kind(
    kind: DatasetKind,
    records: &[RawRecord],
    sources: &BTreeMap<String, RawDataset>,
) -> Outcome {
    match kind {
        DatasetKind::Personnel => {
            Outcome::from_result(kind, personnel::normalize(records), Normalized::Personnel)
        }
        DatasetKind::Exports => {
            let reference = sources
                .get(EXPORT_COUNTRY_REFERENCE_KEY)
                .map(|d| d.data.as_slice());
            Outcome::from_result(kind, exports::normalize(records, reference), Normalized::Exports)
        }
        DatasetKind::Budget => {
            Outcome::from_result(kind, budget::normalize(records), Normalized::Budget)
        }
        DatasetKind::ClusterBudget => {
            Outcome::from_result(kind, cluster::normalize(records), Normalized::ClusterBudget)
        }
        DatasetKind::Conflict => {
            Outcome::from_result(kind, conflict::normalize(records), Normalized::Conflict)
        }
        DatasetKind::GlobalComparison => Outcome::from_result(
            kind,
            forces::normalize(records),
            Normalized::GlobalComparison,
        ),
        DatasetKind::Expenditure => {
            Outcome::from_result(kind, expenditure::normalize(records), Normalized::Expenditure)
        }
        DatasetKind::Safety => {
            Outcome::from_result(kind, safety::normalize(records), Normalized::Safety)
        }
    }
}

/// Normalize every loaded dataset into one analytical state.
///
/// Each logical dataset is processed on its own: a failure is recorded as
/// `Outcome::Failed` for that key and the rest carry on. Unknown source
/// keys are kept as a passthrough sample.
pub fn aggregate_all(sources: &BTreeMap<String, RawDataset>) -> AnalyticalState {
    let mut datasets = BTreeMap::new();
    for kind in DatasetKind::ALL {
        let outcome = match kind
            .source_keys()
            .iter()
            .find_map(|key| sources.get(*key))
        {
            Some(source) => normalize_kind(kind, &source.data, sources),
            None => Outcome::Absent,
        };
        datasets.insert(kind, outcome);
    }

    let passthrough: BTreeMap<String, Passthrough> = sources
        .iter()
        .filter(|(key, _)| {
            DatasetKind::from_source_key(key).is_none() && key.as_str() != EXPORT_COUNTRY_REFERENCE_KEY
        })
        .map(|(key, source)| (key.clone(), Passthrough::from_records(&source.data)))
        .collect();

    let state = AnalyticalState::new(datasets, passthrough);
    info!(
        ready = state.ready_count(),
        passthrough = state.passthrough.len(),
        "analytical state assembled"
    );
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(rows: Vec<RawRecord>) -> RawDataset {
        RawDataset::new("test.csv", rows)
    }

    #[test]
    fn failures_are_isolated_per_key() {
        let mut sources = BTreeMap::new();
        sources.insert(
            "defenseBudgetTrends".to_string(),
            source(vec![[("Year", "2020"), ("Annual Defence Budget (in Cr)", "100")]
                .into_iter()
                .collect()]),
        );
        sources.insert(
            "armyRecruits20172022".to_string(),
            source(vec![[("Unrelated", "x")].into_iter().collect()]),
        );
        let state = aggregate_all(&sources);
        assert!(state.budget().is_some());
        assert!(matches!(state.outcome(DatasetKind::Personnel), Outcome::Failed(_)));
        assert_eq!(state.outcome(DatasetKind::Conflict), &Outcome::Absent);
        assert!(state.personnel().is_none());
    }

    #[test]
    fn unknown_keys_become_passthrough() {
        let mut sources = BTreeMap::new();
        let rows: Vec<RawRecord> = (0..150)
            .map(|i| [("Year".to_string(), i.to_string()), ("Output".to_string(), "1".to_string())]
                .into_iter()
                .collect())
            .collect();
        sources.insert("defenceProduction20172024".to_string(), source(rows));
        sources.insert(
            EXPORT_COUNTRY_REFERENCE_KEY.to_string(),
            source(vec![[("Country", "Armenia"), ("Value", "1")].into_iter().collect()]),
        );
        let state = aggregate_all(&sources);
        let p = &state.passthrough()["defenceProduction20172024"];
        assert_eq!(p.record_count, 150);
        assert_eq!(p.raw_data.len(), PASSTHROUGH_SAMPLE);
        assert_eq!(p.columns, vec!["Output".to_string(), "Year".to_string()]);
        assert!(!state.passthrough().contains_key(EXPORT_COUNTRY_REFERENCE_KEY));
    }

    #[test]
    fn unavailable_datasets_serialize_as_null() {
        let state = aggregate_all(&BTreeMap::new());
        let json = serde_json::to_value(&state).unwrap();
        assert!(json["armyRecruits"].is_null());
        assert_eq!(json.as_object().unwrap().len(), DatasetKind::ALL.len());
    }

    #[test]
    fn source_keys_resolve_to_kinds() {
        assert_eq!(
            DatasetKind::from_source_key("icgSafetyReports"),
            Some(DatasetKind::Safety)
        );
        assert_eq!(DatasetKind::from_source_key("nope"), None);
    }
}
