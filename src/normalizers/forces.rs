// Global armed forces comparison and the home country's position in it.
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{is_footer, require_any, shares};
use crate::error::NormalizeError;
use crate::record::RawRecord;
use crate::types::{top, Share};
use crate::util::{parse_number, percentage};

const DATASET: &str = "global comparison";
pub const COUNTRY_COLUMN: &str = "Country";
pub const ACTIVE_COLUMN: &str = "Active military";
pub const RESERVE_COLUMN: &str = "Reserve military";
pub const TOTAL_COLUMN: &str = "Total";
pub const RANK_COLUMN: &str = "SR.NO";
pub const HOME_COUNTRY: &str = "india";
pub const DISPLAY_COUNTRIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryForces {
    pub country: String,
    pub active_personnel: f64,
    pub reserve_personnel: f64,
    pub total_personnel: f64,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePosition {
    /// 1-based position in the list sorted by total personnel.
    pub position: usize,
    pub forces: CountryForces,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForcesSummary {
    pub total_countries: usize,
    pub home_rank: Option<u32>,
    pub home_position: Option<usize>,
    pub home_share: f64,
    pub top_active: Option<String>,
    pub top_total: Option<String>,
    pub global_personnel: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForcesDataset {
    pub country_rankings: Vec<CountryForces>,
    pub personnel_share: Vec<Share>,
    pub home_position: Option<HomePosition>,
    pub summary: ForcesSummary,
}

impl ForcesDataset {
    pub fn top_countries(&self) -> &[CountryForces] {
        &self.country_rankings[..self.country_rankings.len().min(DISPLAY_COUNTRIES)]
    }

    pub fn top_shares(&self) -> &[Share] {
        top(&self.personnel_share, DISPLAY_COUNTRIES)
    }
}

pub fn normalize(records: &[RawRecord]) -> Result<Option<ForcesDataset>, NormalizeError> {
    if records.is_empty() {
        return Ok(None);
    }
    require_any(records, DATASET, &[COUNTRY_COLUMN])?;

    let mut country_rankings: Vec<CountryForces> = records
        .iter()
        .filter_map(|r| {
            let country = r.text(COUNTRY_COLUMN).filter(|c| !is_footer(c))?;
            let active_personnel = r.present(ACTIVE_COLUMN).map(parse_number).unwrap_or(0.0);
            let reserve_personnel = r.present(RESERVE_COLUMN).map(parse_number).unwrap_or(0.0);
            let total_personnel = r
                .present(TOTAL_COLUMN)
                .map(parse_number)
                .unwrap_or(active_personnel + reserve_personnel);
            let rank = r
                .present(RANK_COLUMN)
                .map(parse_number)
                .filter(|n| *n >= 1.0)
                .map(|n| n as u32);
            Some(CountryForces {
                country,
                active_personnel,
                reserve_personnel,
                total_personnel,
                rank,
            })
        })
        .collect();
    country_rankings.sort_by(|a, b| {
        b.total_personnel
            .partial_cmp(&a.total_personnel)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.country.cmp(&b.country))
    });

    let home_position = country_rankings
        .iter()
        .position(|c| c.country.to_lowercase().contains(HOME_COUNTRY))
        .map(|idx| HomePosition {
            position: idx + 1,
            forces: country_rankings[idx].clone(),
        });

    let personnel_share = shares(
        country_rankings
            .iter()
            .map(|c| (c.country.clone(), c.total_personnel, 1)),
    );
    let global_personnel: f64 = country_rankings.iter().map(|c| c.total_personnel).sum();

    let summary = ForcesSummary {
        total_countries: country_rankings.len(),
        home_rank: home_position.as_ref().and_then(|h| h.forces.rank),
        home_position: home_position.as_ref().map(|h| h.position),
        home_share: home_position
            .as_ref()
            .map(|h| percentage(h.forces.total_personnel, global_personnel))
            .unwrap_or(0.0),
        top_active: country_rankings
            .iter()
            .fold(None::<&CountryForces>, |best, c| match best {
                Some(b) if b.active_personnel >= c.active_personnel => Some(b),
                _ => Some(c),
            })
            .map(|c| c.country.clone()),
        top_total: country_rankings.first().map(|c| c.country.clone()),
        global_personnel,
    };

    debug!(rows = records.len(), countries = country_rankings.len(), "normalized forces dataset");

    Ok(Some(ForcesDataset {
        country_rankings,
        personnel_share,
        home_position,
        summary,
    }))
}
