//! Keyword classification of free-text questions.
//!
//! The dataset selector and the offline narrative both route on the topics
//! returned here, so the keyword table lives in exactly one place.
use std::collections::BTreeSet;

use crate::state::DatasetKind;

/// Keyword groups, matched as lowercase substrings of the query.
const KEYWORDS: [(DatasetKind, &[&str]); 7] = [
    (DatasetKind::Personnel, &["recruit", "personnel", "army"]),
    (DatasetKind::Exports, &["export", "international", "sales"]),
    (
        DatasetKind::Budget,
        &["budget", "allocation", "spending", "financial"],
    ),
    (DatasetKind::Conflict, &["conflict", "pakistan", "escalation", "threat"]),
    (DatasetKind::GlobalComparison, &["global", "comparison", "ranking"]),
    (DatasetKind::Expenditure, &["expenditure", "spending", "indo-pak"]),
    (
        DatasetKind::Safety,
        &["safety", "defect", "incident", "icg", "aircraft"],
    ),
];

/// Only consulted once the query already matched the budget group.
const CLUSTER_KEYWORDS: [&str; 1] = ["cluster"];

/// Topics a query touches, as an unordered set of datasets.
pub fn classify(query: &str) -> BTreeSet<DatasetKind> {
    let query = query.to_lowercase();
    let mut topics: BTreeSet<DatasetKind> = KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| query.contains(w)))
        .map(|(kind, _)| *kind)
        .collect();
    if topics.contains(&DatasetKind::Budget) && CLUSTER_KEYWORDS.iter().any(|w| query.contains(w)) {
        topics.insert(DatasetKind::ClusterBudget);
    }
    topics
}

/// Order in which the offline narrative picks its template when a query
/// touches several topics.
pub const NARRATIVE_PRIORITY: [DatasetKind; 8] = [
    DatasetKind::Personnel,
    DatasetKind::Exports,
    DatasetKind::ClusterBudget,
    DatasetKind::Budget,
    DatasetKind::Expenditure,
    DatasetKind::Conflict,
    DatasetKind::GlobalComparison,
    DatasetKind::Safety,
];

/// The single topic a narrative is written about, `None` for a general brief.
pub fn primary_topic(query: &str) -> Option<DatasetKind> {
    let topics = classify(query);
    NARRATIVE_PRIORITY
        .into_iter()
        .find(|kind| topics.contains(kind))
}
