// Offline analyst: deterministic briefs built from summary fields.
//
// No I/O happens here; this is what the analyst client falls back to when
// the model backend is unreachable.
use crate::classify::primary_topic;
use crate::normalizers::exports::CountrySource;
use crate::state::{DatasetKind, Normalized};
use crate::selector::Selection;
use crate::util::{format_number, or_na};

pub const CLASSIFICATION_FOOTER: &str = "**CLASSIFICATION:** FOR OFFICIAL USE ONLY";
const PENDING: &str = "Data Processing";

fn num(value: Option<f64>, decimals: usize) -> String {
    value
        .filter(|v| v.is_finite())
        .map_or_else(|| "N/A".to_string(), |v| format_number(v, decimals))
}

fn dataset<'a>(selection: &Selection<'a>, kind: DatasetKind) -> Option<&'a Normalized> {
    selection.outcome(kind).and_then(|o| o.ready())
}

fn status(selection: &Selection<'_>, kind: DatasetKind) -> &'static str {
    if dataset(selection, kind).is_some() {
        "Available"
    } else {
        PENDING
    }
}

fn personnel_brief(selection: &Selection<'_>) -> String {
    let s = match dataset(selection, DatasetKind::Personnel) {
        Some(Normalized::Personnel(d)) => Some(&d.summary),
        _ => None,
    };
    format!(
        "**PERSONNEL INTELLIGENCE ASSESSMENT**\n\n\
         **Current Status:**\n\
         - Total recruits on record: {}\n\
         - Average intake per recruiting year: {}\n\
         - Peak recruiting year: {}\n\
         - Regions reporting: {} (leading region: {})\n\n\
         **Strategic Analysis:**\n\
         Recruitment figures are drawn from state-wise intake returns. Years without \
         any reported intake are excluded rather than counted as zero.\n\n\
         **RECOMMENDATION:** Sustain intake in the leading regions and review \
         under-represented states before the next recruiting cycle.",
        num(s.map(|s| s.total_recruits), 0),
        num(s.map(|s| s.average_per_year), 0),
        or_na(s.and_then(|s| s.peak_year)),
        or_na(s.map(|s| s.total_regions)),
        s.and_then(|s| s.top_region.clone())
            .unwrap_or_else(|| PENDING.to_string()),
    )
}

fn exports_brief(selection: &Selection<'_>) -> String {
    let s = match dataset(selection, DatasetKind::Exports) {
        Some(Normalized::Exports(d)) => Some(&d.summary),
        _ => None,
    };
    let coverage = match s.map(|s| s.country_source) {
        Some(CountrySource::Dataset) => "reported in the export dataset",
        Some(CountrySource::Reference) => "taken from the country reference dataset",
        Some(CountrySource::Missing) | None => "not available in the current data",
    };
    format!(
        "**DEFENSE EXPORT INTELLIGENCE SUMMARY**\n\n\
         **Performance Metrics:**\n\
         - Cumulative export value: Rs {} Cr\n\
         - Average per year: Rs {} Cr\n\
         - Latest year: {} (Rs {} Cr)\n\
         - Destination countries tracked: {} (top: {})\n\n\
         **Strategic Assessment:**\n\
         Country-level destinations are {}.\n\n\
         **RECOMMENDATION:** Deepen partnerships in established markets while \
         widening the destination base.",
        num(s.map(|s| s.total_export_value), 2),
        num(s.map(|s| s.average_per_year), 2),
        or_na(s.and_then(|s| s.latest_year)),
        num(s.and_then(|s| s.latest_value), 2),
        or_na(s.map(|s| s.total_countries)),
        s.and_then(|s| s.top_country.clone())
            .unwrap_or_else(|| PENDING.to_string()),
        coverage,
    )
}

fn budget_brief(selection: &Selection<'_>) -> String {
    let s = match dataset(selection, DatasetKind::Budget) {
        Some(Normalized::Budget(d)) => Some(&d.summary),
        _ => None,
    };
    format!(
        "**FINANCIAL INTELLIGENCE ANALYSIS**\n\n\
         **Budget Overview:**\n\
         - Latest budget: Rs {} Cr ({})\n\
         - Cumulative allocation across years: Rs {} Cr\n\
         - Average annual growth: {}%\n\
         - Peak budget year: {}\n\
         - Average R&D share: {}%\n\n\
         **Strategic Impact:**\n\
         Allocation trends balance operational readiness against capability \
         development.\n\n\
         **RECOMMENDATION:** Protect the R&D share while procurement cycles are \
         optimized.",
        num(s.and_then(|s| s.latest_budget), 2),
        or_na(s.and_then(|s| s.latest_year)),
        num(s.map(|s| s.total_budget), 2),
        num(s.map(|s| s.average_growth_rate), 2),
        or_na(s.and_then(|s| s.peak_budget_year)),
        num(s.map(|s| s.average_rd_percentage), 2),
    )
}

fn cluster_brief(selection: &Selection<'_>) -> String {
    let s = match dataset(selection, DatasetKind::ClusterBudget) {
        Some(Normalized::ClusterBudget(d)) => Some(&d.summary),
        _ => None,
    };
    format!(
        "**CLUSTER ALLOCATION ANALYSIS**\n\n\
         **Allocation Snapshot:**\n\
         - Latest fiscal year: {}\n\
         - Total across clusters: Rs {} Cr\n\
         - Clusters tracked: {}\n\
         - Largest cluster: {} ({}% of the year's allocation)\n\n\
         **Overall Budget Status:** {}\n\n\
         **RECOMMENDATION:** Rebalance toward under-funded clusters where \
         capability gaps are greatest.",
        s.and_then(|s| s.latest_fiscal_year.clone())
            .unwrap_or_else(|| "N/A".to_string()),
        num(s.map(|s| s.latest_total_budget), 2),
        or_na(s.map(|s| s.total_categories)),
        s.and_then(|s| s.top_category.clone())
            .unwrap_or_else(|| PENDING.to_string()),
        num(s.map(|s| s.top_category_share), 2),
        status(selection, DatasetKind::Budget),
    )
}

fn expenditure_brief(selection: &Selection<'_>) -> String {
    let s = match dataset(selection, DatasetKind::Expenditure) {
        Some(Normalized::Expenditure(d)) => Some(&d.summary),
        _ => None,
    };
    format!(
        "**COMPARATIVE EXPENDITURE ASSESSMENT**\n\n\
         **Key Figures:**\n\
         - Period covered: {}\n\
         - Current expenditure ratio: {}x\n\
         - Long-run average ratio: {}x\n\
         - Years on record: {}\n\
         - Peak year for {}: {}\n\n\
         **RECOMMENDATION:** Track the ratio alongside capability indicators \
         rather than spending alone.",
        s.map(|s| s.time_span.clone())
            .unwrap_or_else(|| "N/A".to_string()),
        num(s.and_then(|s| s.current_ratio), 2),
        num(s.map(|s| s.avg_ratio), 2),
        or_na(s.map(|s| s.total_years)),
        s.map(|s| s.side_a_label.clone())
            .unwrap_or_else(|| "side A".to_string()),
        or_na(s.and_then(|s| s.peak_side_a_year)),
    )
}

fn conflict_brief(selection: &Selection<'_>) -> String {
    let s = match dataset(selection, DatasetKind::Conflict) {
        Some(Normalized::Conflict(d)) => Some(&d.summary),
        _ => None,
    };
    format!(
        "**THREAT ASSESSMENT BRIEF**\n\n\
         **Incident Picture:**\n\
         - Incidents recorded: {}\n\
         - Period: {}\n\
         - Peak year: {}\n\
         - Average incidents per year: {}\n\
         - Highest escalation level observed: {}\n\n\
         **RECOMMENDATION:** Maintain heightened readiness in sectors with \
         recurring incidents.",
        or_na(s.map(|s| s.total_incidents)),
        s.map(|s| s.year_span.clone())
            .unwrap_or_else(|| "N/A".to_string()),
        or_na(s.and_then(|s| s.peak_year)),
        num(s.map(|s| s.average_per_year), 1),
        num(s.and_then(|s| s.highest_escalation), 1),
    )
}

fn global_brief(selection: &Selection<'_>) -> String {
    let s = match dataset(selection, DatasetKind::GlobalComparison) {
        Some(Normalized::GlobalComparison(d)) => Some(&d.summary),
        _ => None,
    };
    format!(
        "**GLOBAL FORCE POSTURE COMPARISON**\n\n\
         **Positioning:**\n\
         - Countries compared: {}\n\
         - India's listed rank: {}\n\
         - Position by total personnel: {}\n\
         - Share of compared personnel: {}%\n\
         - Largest active force: {}\n\n\
         **RECOMMENDATION:** Pair manpower strength with modernization to \
         sustain relative standing.",
        or_na(s.map(|s| s.total_countries)),
        or_na(s.and_then(|s| s.home_rank)),
        or_na(s.and_then(|s| s.home_position)),
        num(s.map(|s| s.home_share), 2),
        s.and_then(|s| s.top_active.clone())
            .unwrap_or_else(|| PENDING.to_string()),
    )
}

fn safety_brief(selection: &Selection<'_>) -> String {
    let s = match dataset(selection, DatasetKind::Safety) {
        Some(Normalized::Safety(d)) => Some(&d.summary),
        _ => None,
    };
    format!(
        "**OPERATIONAL SAFETY REVIEW**\n\n\
         **Safety Metrics:**\n\
         - Reports analysed: {}\n\
         - Defects logged: {}\n\
         - Incidents logged: {}\n\
         - Safety index: {}%\n\
         - Unit with most defects: {}\n\
         - Leading incident cause: {}\n\n\
         **RECOMMENDATION:** Prioritize maintenance on units with recurring \
         defects and address the leading incident cause.",
        num(s.map(|s| s.total_reports), 0),
        num(s.map(|s| s.total_defects), 0),
        num(s.map(|s| s.total_incidents), 0),
        num(s.map(|s| s.safety_index), 1),
        s.and_then(|s| s.top_defect_unit.clone())
            .unwrap_or_else(|| PENDING.to_string()),
        s.and_then(|s| s.top_cause.clone())
            .unwrap_or_else(|| PENDING.to_string()),
    )
}

fn comprehensive_brief(selection: &Selection<'_>) -> String {
    let recruits = match dataset(selection, DatasetKind::Personnel) {
        Some(Normalized::Personnel(d)) => Some(d.summary.total_recruits),
        _ => None,
    };
    let exports = match dataset(selection, DatasetKind::Exports) {
        Some(Normalized::Exports(d)) => Some(d.summary.total_export_value),
        _ => None,
    };
    let budget = match dataset(selection, DatasetKind::Budget) {
        Some(Normalized::Budget(d)) => d.summary.latest_budget,
        _ => None,
    };
    let incidents = match dataset(selection, DatasetKind::Conflict) {
        Some(Normalized::Conflict(d)) => Some(d.summary.total_incidents as f64),
        _ => None,
    };
    let rank = match dataset(selection, DatasetKind::GlobalComparison) {
        Some(Normalized::GlobalComparison(d)) => d.summary.home_rank,
        _ => None,
    };
    format!(
        "**COMPREHENSIVE DEFENSE INTELLIGENCE BRIEF**\n\n\
         **Situational Assessment:**\n\
         - Personnel: {} recruits on record\n\
         - Exports: Rs {} Cr cumulative\n\
         - Budget: Rs {} Cr latest allocation\n\
         - Security: {} incidents tracked\n\
         - Global standing: rank {}\n\
         - Safety reporting: {}\n\n\
         **Strategic Recommendations:**\n\
         1. Continue technology advancement initiatives\n\
         2. Strengthen international defense cooperation\n\
         3. Maintain personnel development programs\n\
         4. Optimize resource allocation for emerging threats",
        num(recruits, 0),
        num(exports, 2),
        num(budget, 2),
        num(incidents, 0),
        or_na(rank),
        status(selection, DatasetKind::Safety),
    )
}

/// Write a brief for `query` from whatever the selection holds.
pub fn generate(query: &str, selection: &Selection<'_>) -> String {
    let body = match primary_topic(query) {
        Some(DatasetKind::Personnel) => personnel_brief(selection),
        Some(DatasetKind::Exports) => exports_brief(selection),
        Some(DatasetKind::ClusterBudget) => cluster_brief(selection),
        Some(DatasetKind::Budget) => budget_brief(selection),
        Some(DatasetKind::Expenditure) => expenditure_brief(selection),
        Some(DatasetKind::Conflict) => conflict_brief(selection),
        Some(DatasetKind::GlobalComparison) => global_brief(selection),
        Some(DatasetKind::Safety) => safety_brief(selection),
        None => comprehensive_brief(selection),
    };
    format!("{body}\n\n{CLASSIFICATION_FOOTER}")
}
