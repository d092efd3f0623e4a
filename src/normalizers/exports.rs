// Defence exports: yearly totals plus country and product breakdowns.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{growth_series, is_footer, require_any, shares};
use crate::error::NormalizeError;
use crate::record::RawRecord;
use crate::types::{top, GrowthPoint, Share};
use crate::util::{mean, parse_number, parse_year};

const DATASET: &str = "exports";
pub const YEAR_COLUMN: &str = "Year";
pub const TOTAL_COLUMN: &str = "Total Export (Rs Cr)";
pub const COUNTRY_COLUMN: &str = "Country";
pub const VALUE_COLUMNS: [&str; 2] = ["Export_Value", "Value"];
pub const PRODUCT_COLUMNS: [&str; 2] = ["Product", "Category"];
pub const DISPLAY_COUNTRIES: usize = 10;

/// Where the country breakdown came from.
///
/// The yearly export dataset carries no destination country. Rather than
/// inventing figures, the breakdown is taken from a separate country-level
/// dataset when one was loaded, and flagged `Missing` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CountrySource {
    Dataset,
    Reference,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportYear {
    pub year: i32,
    pub total_value: f64,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub total_export_value: f64,
    pub average_per_year: f64,
    pub top_country: Option<String>,
    pub total_countries: usize,
    pub latest_year: Option<i32>,
    pub latest_value: Option<f64>,
    pub country_source: CountrySource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportsDataset {
    pub export_trends: Vec<ExportYear>,
    pub growth_rates: Vec<GrowthPoint>,
    pub country_breakdown: Vec<Share>,
    pub product_categories: Vec<Share>,
    pub summary: ExportSummary,
}

impl ExportsDataset {
    pub fn top_countries(&self) -> &[Share] {
        top(&self.country_breakdown, DISPLAY_COUNTRIES)
    }
}

/// Sum `Export_Value|Value` per label taken from `label_columns`.
fn value_breakdown(records: &[RawRecord], label_columns: &[&str]) -> Vec<Share> {
    let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for r in records {
        let (Some(label), Some(value)) = (r.first_text(label_columns), r.first_present(&VALUE_COLUMNS))
        else {
            continue;
        };
        if is_footer(&label) {
            continue;
        }
        let e = groups.entry(label).or_insert((0.0, 0));
        e.0 += parse_number(value);
        e.1 += 1;
    }
    shares(groups.into_iter().map(|(k, (v, c))| (k, v, c)))
}

pub fn normalize(
    records: &[RawRecord],
    country_reference: Option<&[RawRecord]>,
) -> Result<Option<ExportsDataset>, NormalizeError> {
    if records.is_empty() {
        return Ok(None);
    }
    require_any(
        records,
        DATASET,
        &[TOTAL_COLUMN, COUNTRY_COLUMN, VALUE_COLUMNS[0], VALUE_COLUMNS[1]],
    )?;

    let mut by_year: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for r in records {
        let (Some(year), Some(value)) = (
            r.present(YEAR_COLUMN).and_then(parse_year),
            r.present(TOTAL_COLUMN),
        ) else {
            continue;
        };
        let e = by_year.entry(year).or_insert((0.0, 0));
        e.0 += parse_number(value);
        e.1 += 1;
    }
    let export_trends: Vec<ExportYear> = by_year
        .into_iter()
        .filter(|(_, (total, _))| *total != 0.0)
        .map(|(year, (total_value, record_count))| ExportYear {
            year,
            total_value,
            record_count,
        })
        .collect();

    let has_country = records.iter().any(|r| r.has_column(COUNTRY_COLUMN));
    let (country_breakdown, country_source) = if has_country {
        (value_breakdown(records, &[COUNTRY_COLUMN]), CountrySource::Dataset)
    } else {
        match country_reference.filter(|r| !r.is_empty()) {
            Some(reference) => (
                value_breakdown(reference, &[COUNTRY_COLUMN]),
                CountrySource::Reference,
            ),
            None => {
                warn!("export dataset has no country column and no country reference was loaded");
                (Vec::new(), CountrySource::Missing)
            }
        }
    };
    let product_categories = value_breakdown(records, &PRODUCT_COLUMNS);

    let points: Vec<(i32, f64)> = export_trends
        .iter()
        .map(|y| (y.year, y.total_value))
        .collect();
    let growth_rates = growth_series(&points);
    let totals: Vec<f64> = points.iter().map(|(_, v)| *v).collect();

    let summary = ExportSummary {
        total_export_value: totals.iter().sum(),
        average_per_year: mean(&totals),
        top_country: country_breakdown.first().map(|s| s.dimension.clone()),
        total_countries: country_breakdown.len(),
        latest_year: export_trends.last().map(|y| y.year),
        latest_value: export_trends.last().map(|y| y.total_value),
        country_source,
    };

    debug!(
        rows = records.len(),
        years = export_trends.len(),
        countries = country_breakdown.len(),
        "normalized exports dataset"
    );

    Ok(Some(ExportsDataset {
        export_trends,
        growth_rates,
        country_breakdown,
        product_categories,
        summary,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yearly(year: &str, total: &str) -> RawRecord {
        [(YEAR_COLUMN, year), (TOTAL_COLUMN, total)].into_iter().collect()
    }

    #[test]
    fn groups_years_and_computes_growth() {
        let data = vec![
            yearly("2017-18", "4,682"),
            yearly("2018-19", "10,745"),
            yearly("2018-19", "NA"),
            yearly("2019-20", "9,116"),
        ];
        let out = normalize(&data, None).unwrap().unwrap();
        let years: Vec<i32> = out.export_trends.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2017, 2018, 2019]);
        assert_eq!(out.export_trends[1].record_count, 1);
        assert_eq!(out.summary.total_export_value, 4682.0 + 10745.0 + 9116.0);
        assert_eq!(out.growth_rates.len(), 2);
        assert_eq!(out.summary.latest_year, Some(2019));
    }

    #[test]
    fn missing_country_field_is_flagged_not_fabricated() {
        let data = vec![yearly("2020", "100")];
        let out = normalize(&data, None).unwrap().unwrap();
        assert!(out.country_breakdown.is_empty());
        assert_eq!(out.summary.country_source, CountrySource::Missing);
        assert_eq!(out.summary.top_country, None);
    }

    #[test]
    fn country_reference_substitutes_for_missing_field() {
        let data = vec![yearly("2020", "100")];
        let reference: Vec<RawRecord> = vec![
            [("Country", "Armenia"), ("Value", "600")].into_iter().collect(),
            [("Country", "Philippines"), ("Value", "400")].into_iter().collect(),
        ];
        let out = normalize(&data, Some(&reference)).unwrap().unwrap();
        assert_eq!(out.summary.country_source, CountrySource::Reference);
        assert_eq!(out.country_breakdown[0].dimension, "Armenia");
        assert_eq!(out.country_breakdown[0].percentage, 60.0);
    }

    #[test]
    fn footer_rows_stay_out_of_breakdowns() {
        let data: Vec<RawRecord> = vec![
            [("Country", "Armenia"), ("Product", "Radar"), ("Value", "600")].into_iter().collect(),
            [("Country", "Philippines"), ("Product", "Missile"), ("Value", "400")].into_iter().collect(),
            [("Country", "Total"), ("Product", "Total"), ("Value", "1,000")].into_iter().collect(),
        ];
        let out = normalize(&data, None).unwrap().unwrap();
        assert_eq!(out.summary.total_countries, 2);
        assert_eq!(out.summary.top_country.as_deref(), Some("Armenia"));
        assert_eq!(out.country_breakdown[0].percentage, 60.0);
        assert_eq!(out.product_categories.len(), 2);
    }

    #[test]
    fn top_countries_truncates_after_percentages() {
        let data: Vec<RawRecord> = (0..12)
            .map(|i| {
                [
                    ("Country".to_string(), format!("C{i:02}")),
                    ("Export_Value".to_string(), "10".to_string()),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        let out = normalize(&data, None).unwrap().unwrap();
        assert_eq!(out.country_breakdown.len(), 12);
        assert_eq!(out.top_countries().len(), 10);
        let shown: f64 = out.top_countries().iter().map(|s| s.percentage).sum();
        assert!(shown < 100.0);
    }
}
