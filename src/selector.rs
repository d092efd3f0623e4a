// Picks the part of the analytical state a question is about.
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::classify::classify;
use crate::state::{AnalyticalState, DatasetKind, Outcome, Passthrough};

/// A borrowed slice of the analytical state.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub datasets: BTreeMap<DatasetKind, &'a Outcome>,
    pub passthrough: BTreeMap<&'a str, &'a Passthrough>,
    /// `true` when nothing matched and the whole state was returned.
    pub everything: bool,
}

impl<'a> Selection<'a> {
    pub fn kinds(&self) -> impl Iterator<Item = DatasetKind> + '_ {
        self.datasets.keys().copied()
    }

    pub fn outcome(&self, kind: DatasetKind) -> Option<&'a Outcome> {
        self.datasets.get(&kind).copied()
    }

    /// JSON object keyed by logical dataset key; unavailable datasets are
    /// `null`.
    pub fn to_context(&self) -> Value {
        let mut map = Map::new();
        for (kind, outcome) in &self.datasets {
            map.insert(
                kind.logical_key().to_string(),
                serde_json::to_value(outcome).unwrap_or(Value::Null),
            );
        }
        for (key, entry) in &self.passthrough {
            map.insert(
                key.to_string(),
                serde_json::to_value(entry).unwrap_or(Value::Null),
            );
        }
        Value::Object(map)
    }
}

/// Union of the datasets whose keywords appear in `query`; the entire
/// state when none do.
pub fn select<'a>(query: &str, state: &'a AnalyticalState) -> Selection<'a> {
    let topics = classify(query);
    if topics.is_empty() {
        return Selection {
            datasets: state.outcomes().collect(),
            passthrough: state
                .passthrough()
                .iter()
                .map(|(k, v)| (k.as_str(), v))
                .collect(),
            everything: true,
        };
    }
    Selection {
        datasets: topics
            .into_iter()
            .map(|kind| (kind, state.outcome(kind)))
            .collect(),
        passthrough: BTreeMap::new(),
        everything: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawDataset, RawRecord};
    use crate::state::aggregate_all;

    fn state() -> AnalyticalState {
        let mut sources = BTreeMap::new();
        sources.insert(
            "defenseBudgetTrends".to_string(),
            RawDataset::new(
                "Defense Budget Trends.csv",
                vec![[("Year", "2020"), ("Annual Defence Budget (in Cr)", "100")]
                    .into_iter()
                    .collect::<RawRecord>()],
            ),
        );
        sources.insert(
            "defenceProduction20172024".to_string(),
            RawDataset::new("Defence Production 2017-2024.csv", vec![RawRecord::new()]),
        );
        aggregate_all(&sources)
    }

    #[test]
    fn matched_groups_are_unioned() {
        let s = state();
        let sel = select("army recruitment vs export sales", &s);
        assert_eq!(
            sel.kinds().collect::<Vec<_>>(),
            vec![DatasetKind::Personnel, DatasetKind::Exports]
        );
        assert!(!sel.everything);
        assert!(sel.passthrough.is_empty());
    }

    #[test]
    fn no_match_returns_whole_state() {
        let s = state();
        let sel = select("status report please", &s);
        assert!(sel.everything);
        assert_eq!(sel.datasets.len(), DatasetKind::ALL.len());
        assert!(sel.passthrough.contains_key("defenceProduction20172024"));
    }

    #[test]
    fn absent_datasets_are_null_in_context() {
        let s = state();
        let ctx = select("budget and recruits", &s).to_context();
        assert!(ctx["armyRecruits"].is_null());
        assert_eq!(ctx["budgetTrends"]["summary"]["totalBudget"], 100.0);
    }
}
