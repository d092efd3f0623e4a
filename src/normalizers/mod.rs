//! Per-dataset normalizers.
//!
//! Each normalizer turns the raw rows of one dataset into a typed,
//! aggregate-rich structure. They share a contract:
//!
//! - `Ok(None)` when there is nothing to normalize (empty input);
//! - `Err(NormalizeError)` when the rows do not look like the dataset at
//!   all (none of the required columns exist);
//! - otherwise a dataset whose series may be empty and whose summary
//!   degrades to zeros and `None`s.
//!
//! Grouping goes through ordered maps so normalizing the same rows twice
//! yields identical output.
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::NormalizeError;
use crate::record::RawRecord;
use crate::types::{GrowthPoint, Share};
use crate::util::{finite_or_zero, growth_rate, percentage};

pub mod budget;
pub mod cluster;
pub mod conflict;
pub mod expenditure;
pub mod exports;
pub mod forces;
pub mod personnel;
pub mod safety;

/// Footer rows of a tabular export ("Total", "Grand Total") repeat the
/// column sums and must not be aggregated as another group.
pub(crate) fn is_footer(label: &str) -> bool {
    let label = label.trim().trim_end_matches(':');
    label.eq_ignore_ascii_case("total") || label.eq_ignore_ascii_case("grand total")
}

/// Build a breakdown series from `(dimension, metric, count)` triples.
///
/// Two passes: the total is computed from every metric first, then each
/// entry is mapped to its final record with the percentage included.
/// Sorted by metric descending, ties broken by dimension.
pub(crate) fn shares<I>(items: I) -> Vec<Share>
where
    I: IntoIterator<Item = (String, f64, usize)>,
{
    let mut items: Vec<(String, f64, usize)> = items
        .into_iter()
        .map(|(d, m, c)| (d, finite_or_zero(m), c))
        .collect();
    let total: f64 = items.iter().map(|(_, m, _)| *m).sum();
    items.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    items
        .into_iter()
        .map(|(dimension, metric, count)| Share {
            dimension,
            metric,
            count,
            percentage: percentage(metric, total),
        })
        .collect()
}

/// Shares over row counts, e.g. "how many incidents per event type".
pub(crate) fn count_shares(counts: BTreeMap<String, usize>) -> Vec<Share> {
    shares(counts.into_iter().map(|(d, c)| (d, c as f64, c)))
}

/// Growth between adjacent points of an ascending trend series.
pub(crate) fn growth_series(points: &[(i32, f64)]) -> Vec<GrowthPoint> {
    points
        .windows(2)
        .map(|w| GrowthPoint {
            year: w[1].0,
            growth_rate: growth_rate(w[0].1, w[1].1),
        })
        .collect()
}

/// Fail when no row carries any of `columns`; that is a different
/// dataset, not an empty one.
pub(crate) fn require_any(
    records: &[RawRecord],
    dataset: &'static str,
    columns: &[&'static str],
) -> Result<(), NormalizeError> {
    let found = records
        .iter()
        .any(|r| columns.iter().any(|c| r.has_column(c)));
    if found {
        Ok(())
    } else {
        Err(NormalizeError::MissingColumns {
            dataset,
            columns: columns.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_labels_are_recognized() {
        assert!(is_footer("Total"));
        assert!(is_footer(" GRAND TOTAL: "));
        assert!(!is_footer("Total Export"));
        assert!(!is_footer("Punjab"));
    }

    #[test]
    fn shares_sum_to_one_hundred() {
        let s = shares(vec![
            ("b".to_string(), 30.0, 1),
            ("a".to_string(), 10.0, 1),
            ("c".to_string(), 60.0, 2),
        ]);
        let dims: Vec<&str> = s.iter().map(|x| x.dimension.as_str()).collect();
        assert_eq!(dims, vec!["c", "b", "a"]);
        let total: f64 = s.iter().map(|x| x.percentage).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_or_zero_shares_have_zero_percentages() {
        assert!(shares(Vec::new()).is_empty());
        let s = shares(vec![("x".to_string(), 0.0, 3)]);
        assert_eq!(s[0].percentage, 0.0);
    }

    #[test]
    fn ties_break_on_dimension() {
        let s = shares(vec![("z".to_string(), 5.0, 1), ("a".to_string(), 5.0, 1)]);
        assert_eq!(s[0].dimension, "a");
    }

    #[test]
    fn growth_series_guards_zero_previous() {
        let g = growth_series(&[(2019, 0.0), (2020, 100.0), (2021, 150.0)]);
        assert_eq!(g.len(), 2);
        assert_eq!(g[0].growth_rate, 0.0);
        assert_eq!(g[1].year, 2021);
        assert_eq!(g[1].growth_rate, 50.0);
        assert!(growth_series(&[(2020, 1.0)]).is_empty());
    }
}
