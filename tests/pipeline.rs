// End-to-end: dataset files on disk through to selector and analyst replies.
use std::collections::BTreeMap;
use std::fs;
use std::net::TcpListener;
use std::path::Path;

use defense_intel::analyst::{Analyst, ReplySource};
use defense_intel::classify::classify;
use defense_intel::config::Settings;
use defense_intel::narrative::CLASSIFICATION_FOOTER;
use defense_intel::normalizers::{budget, personnel};
use defense_intel::types::Share;
use defense_intel::{aggregate_all, loader, select, AnalyticalState, DatasetKind, RawRecord};

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path();
    write(
        p,
        "Defense Budget Trends.csv",
        "Year,Annual Defence Budget (in Cr)\n2020,\"1,000\"\n2021,\"1,200\"\n",
    );
    write(
        p,
        "Army Recruits 2017-2022.csv",
        "State/UTs,RtgYr - 2017-18,RtgYr - 2018-19\n\
         Punjab,NA,500\n\
         Kerala,NA,NA\n",
    );
    write(
        p,
        "Defense Cluster Budget Allocation.csv",
        "Cluster,BE 2020-21 (Rs Cr),BE 2021-22 (Rs Cr)\n\
         Naval Systems,100,150\n\
         Missiles,200,250\n\
         Aeronautics,50,NA\n",
    );
    write(
        p,
        "Global Armed Forces.csv",
        "SR.NO,Country,Active military,Reserve military,Total\n\
         1,China,\"2,035,000\",\"510,000\",\"2,545,000\"\n\
         2,India,\"1,455,550\",\"1,155,000\",\"2,610,550\"\n\
         3,United States,\"1,328,000\",\"799,500\",\"2,127,500\"\n",
    );
    write(
        p,
        "Indo-Pak Conflict Escalation.csv",
        "Date,Event Type,Escalation Level,Location\n\
         2019-02-14,Attack,5,Pulwama\n\
         2019-02-26,Airstrike,4,Balakot\n\
         2020-06-01,Ceasefire Violation,2,LoC\n",
    );
    write(
        p,
        "Defence Production 2017-2024.csv",
        "Year,Value of Production\n2017,\"74,054\"\n",
    );
    dir
}

fn loaded_state() -> (tempfile::TempDir, AnalyticalState) {
    let dir = fixture_dir();
    let (sources, report) = loader::load_dir(dir.path()).unwrap();
    assert_eq!(report.failures().count(), 0);
    let state = aggregate_all(&sources);
    (dir, state)
}

fn assert_percentages(series: &[Share]) {
    if series.is_empty() {
        return;
    }
    let sum: f64 = series.iter().map(|s| s.percentage).sum();
    assert!((sum - 100.0).abs() < 1e-6, "percentages sum to {sum}");
}

#[test]
fn budget_trend_with_growth_and_total() {
    let (_dir, state) = loaded_state();
    let b = state.budget().unwrap();
    let years: Vec<(i32, f64)> = b.allocations.iter().map(|a| (a.year, a.total_budget)).collect();
    assert_eq!(years, vec![(2020, 1000.0), (2021, 1200.0)]);
    assert_eq!(b.trends.len(), 1);
    assert_eq!(b.trends[0].year, 2021);
    assert!((b.trends[0].growth_rate - 20.0).abs() < 1e-9);
    assert_eq!(b.summary.total_budget, 2200.0);
}

#[test]
fn sentinel_only_year_is_dropped_from_recruitment_trend() {
    let (_dir, state) = loaded_state();
    let p = state.personnel().unwrap();
    let years: Vec<(i32, f64)> = p
        .yearly_trends
        .iter()
        .map(|y| (y.year, y.total_recruits))
        .collect();
    assert_eq!(years, vec![(2018, 500.0)]);
    assert_eq!(p.summary.total_recruits, 500.0);
    assert_percentages(&p.regional_breakdown);
}

#[test]
fn cluster_query_selects_budget_and_cluster() {
    let (_dir, state) = loaded_state();
    let sel = select("show me budget cluster allocation", &state);
    let kinds: Vec<DatasetKind> = sel.kinds().collect();
    assert!(kinds.contains(&DatasetKind::Budget));
    assert!(kinds.contains(&DatasetKind::ClusterBudget));
    assert!(sel.outcome(DatasetKind::ClusterBudget).unwrap().is_ready());
}

#[test]
fn selection_is_the_union_of_matched_groups() {
    let (_dir, state) = loaded_state();
    for query in [
        "army recruitment",
        "conflict threat and global ranking",
        "spending on icg aircraft",
        "export sales vs budget",
    ] {
        let sel = select(query, &state);
        let got: Vec<DatasetKind> = sel.kinds().collect();
        let expected: Vec<DatasetKind> = classify(query).into_iter().collect();
        assert_eq!(got, expected, "{query}");
        assert!(!sel.everything);
    }

    let all = select("give me a status update", &state);
    assert!(all.everything);
    assert_eq!(all.datasets.len(), DatasetKind::ALL.len());
    assert_eq!(
        all.to_context(),
        serde_json::to_value(&state).unwrap(),
        "unmatched queries see the whole state"
    );
}

#[test]
fn backend_timeout_falls_back_to_interpolated_brief() {
    let (_dir, state) = loaded_state();
    // Accepts connections but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let analyst = Analyst::new(Settings {
        backend_url: format!("http://{addr}"),
        timeout_secs: 1,
        ..Settings::default()
    });

    let query = "budget outlook";
    let reply = analyst.respond(query, &select(query, &state));
    assert_eq!(reply.source, ReplySource::Fallback);
    assert!(reply.text.contains("Rs 1,200.00 Cr (2021)"));
    assert!(reply.text.contains("Average R&D share: 0.00%"));
    assert!(reply.text.ends_with(CLASSIFICATION_FOOTER));

    let query = "international sales";
    let reply = analyst.respond(query, &select(query, &state));
    assert!(reply.text.contains("N/A"));
    assert!(reply.text.ends_with(CLASSIFICATION_FOOTER));
    drop(listener);
}

#[test]
fn breakdowns_sum_to_one_hundred_percent() {
    let (_dir, state) = loaded_state();
    assert_percentages(&state.cluster_budget().unwrap().latest_allocation);
    assert_percentages(&state.global_comparison().unwrap().personnel_share);
    assert_percentages(&state.conflict().unwrap().severity_trends);
}

#[test]
fn home_country_is_ranked_by_total_personnel() {
    let (_dir, state) = loaded_state();
    let g = state.global_comparison().unwrap();
    assert_eq!(g.country_rankings[0].country, "India");
    assert_eq!(g.summary.home_position, Some(1));
}

#[test]
fn unknown_files_pass_through() {
    let (_dir, state) = loaded_state();
    let p = &state.passthrough()["defenceProduction20172024"];
    assert_eq!(p.record_count, 1);
    assert_eq!(p.columns.len(), 2);
}

#[test]
fn normalizing_twice_is_identical() {
    let rows: Vec<RawRecord> = vec![
        [("Year", "2019"), ("Annual Defence Budget (in Cr)", "900")]
            .into_iter()
            .collect(),
        [("Year", "2020"), ("Annual Defence Budget (in Cr)", "0")]
            .into_iter()
            .collect(),
        [("Year", "2021"), ("Annual Defence Budget (in Cr)", "500")]
            .into_iter()
            .collect(),
    ];
    let a = budget::normalize(&rows).unwrap();
    let b = budget::normalize(&rows).unwrap();
    assert_eq!(a, b);

    // A zero budget row is not a year of data; growth skips over it.
    let budget = a.unwrap();
    let years: Vec<i32> = budget.allocations.iter().map(|y| y.year).collect();
    assert_eq!(years, vec![2019, 2021]);
    assert!(budget.trends.iter().all(|g| g.growth_rate.is_finite()));

    let recruits: Vec<RawRecord> = vec![[("State/UTs", "Goa"), ("RtgYr - 2020-21", "10")]
        .into_iter()
        .collect()];
    assert_eq!(
        personnel::normalize(&recruits).unwrap(),
        personnel::normalize(&recruits).unwrap()
    );
}

#[test]
fn empty_sources_produce_an_all_absent_state() {
    let state = aggregate_all(&BTreeMap::new());
    assert_eq!(state.ready_count(), 0);
    for kind in DatasetKind::ALL {
        assert!(!state.outcome(kind).is_ready());
    }
}
