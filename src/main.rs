// Entry point and terminal menu.
//
// - Option [1] loads every dataset and builds the analytical state once.
// - Option [2] prints the command dashboard from that state.
// - Option [3] opens the analyst console; replies come from the model
//   backend or, when it is unreachable, from the offline narrative.
// - Option [4] writes the analytical state as JSON.
use std::io::{self, BufRead, Write};

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::Parser;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::EnvFilter;

use defense_intel::analyst::{Analyst, ReplySource};
use defense_intel::config::Settings;
use defense_intel::error::LoadError;
use defense_intel::metrics::DashboardMetrics;
use defense_intel::normalizers::exports::CountrySource;
use defense_intel::types::MetricRow;
use defense_intel::{aggregate_all, loader, output, select, util, AnalyticalState};

// Built once by option [1]; read-only afterwards.
static STATE: OnceCell<AnalyticalState> = OnceCell::new();

struct TranscriptEntry {
    at: DateTime<Local>,
    query: String,
    source: ReplySource,
}

/// One trimmed line, or `None` once the input is closed or unreadable.
fn read_answer<R: BufRead>(input: &mut R) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    let _ = io::stdout().flush();
    read_answer(&mut io::stdin().lock())
}

fn read_choice() -> Option<String> {
    prompt("Enter choice: ")
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N` or
/// closed the input.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(answer) = prompt("Back to Main Menu (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]. "Nothing loaded" is reported and can be retried.
fn handle_load(settings: &Settings) {
    if STATE.get().is_some() {
        println!("Datasets already loaded.\n");
        return;
    }
    println!("Loading datasets from {} ...", settings.dataset_dir.display());
    let (sources, report) = match loader::load_dir(&settings.dataset_dir) {
        Ok(loaded) => loaded,
        Err(e @ LoadError::NothingLoaded { .. }) => {
            eprintln!("{e}. Check the dataset directory and choose [1] to retry.\n");
            return;
        }
        Err(e) => {
            eprintln!("Failed to load datasets: {e}\n");
            return;
        }
    };

    println!(
        "Processing datasets... ({} files, {} rows loaded)",
        util::format_int(report.files.len()),
        util::format_int(report.total_rows())
    );
    if report.skipped_rows() > 0 {
        println!(
            "Note: {} rows skipped due to parse errors.",
            util::format_int(report.skipped_rows())
        );
    }
    for failed in report.failures() {
        println!(
            "Warning: {} could not be read ({}).",
            failed.filename,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }

    let state = STATE.get_or_init(|| aggregate_all(&sources));
    println!(
        "Analytical state ready: {} of {} datasets normalized.\n",
        state.ready_count(),
        defense_intel::DatasetKind::ALL.len()
    );
}

fn loaded_state() -> Option<&'static AnalyticalState> {
    let state = STATE.get();
    if state.is_none() {
        println!("Error: No data loaded. Please load the datasets first (option 1).\n");
    }
    state
}

/// Handle option [2]: headline metrics followed by one panel per dataset.
fn handle_dashboard(state: &AnalyticalState) {
    println!("COMMAND DASHBOARD");
    let metrics = DashboardMetrics::from_state(state);
    output::preview_section::<MetricRow>("Key Metrics", None, &metrics.rows(), usize::MAX);
    output::preview_section(
        "Dataset Status",
        None,
        &output::status_rows(state),
        usize::MAX,
    );

    if let Some(p) = state.personnel() {
        let values: Vec<(i32, f64)> = p
            .yearly_trends
            .iter()
            .map(|y| (y.year, y.total_recruits))
            .collect();
        output::preview_section(
            "Recruitment Trends",
            None,
            &output::trend_rows(&values, &p.growth_rates),
            usize::MAX,
        );
        output::preview_section(
            "Top Recruiting Regions",
            Some("Top 10 by recruits"),
            &output::share_rows(&p.regional_breakdown, 10),
            10,
        );
    }

    if let Some(e) = state.exports() {
        let values: Vec<(i32, f64)> = e
            .export_trends
            .iter()
            .map(|y| (y.year, y.total_value))
            .collect();
        output::preview_section(
            "Export Trends",
            Some("Rs Cr"),
            &output::trend_rows(&values, &e.growth_rates),
            usize::MAX,
        );
        match e.summary.country_source {
            CountrySource::Missing => {
                println!("Export destinations: no country-level data loaded.\n")
            }
            _ => output::preview_section(
                "Export Destinations",
                Some("Top 10 countries"),
                &output::share_rows(e.top_countries(), 10),
                10,
            ),
        }
    }

    if let Some(b) = state.budget() {
        let values: Vec<(i32, f64)> = b
            .allocations
            .iter()
            .map(|y| (y.year, y.total_budget))
            .collect();
        output::preview_section(
            "Budget Trends",
            Some("Rs Cr"),
            &output::trend_rows(&values, &b.trends),
            usize::MAX,
        );
    }

    if let Some(c) = state.cluster_budget() {
        let note = c
            .summary
            .latest_fiscal_year
            .as_deref()
            .map(|fy| format!("FY {fy}"));
        output::preview_section(
            "Cluster Allocation",
            note.as_deref(),
            &output::share_rows(&c.latest_allocation, 10),
            10,
        );
    }

    if let Some(c) = state.conflict() {
        output::preview_section(
            "Conflict Severity",
            Some(format!("Span {}", c.summary.year_span).as_str()),
            &output::share_rows(&c.severity_trends, 10),
            10,
        );
    }

    if let Some(g) = state.global_comparison() {
        output::preview_section(
            "Global Force Comparison",
            Some("Share of total personnel, top 10"),
            &output::share_rows(g.top_shares(), 10),
            10,
        );
    }

    if let Some(x) = state.expenditure() {
        let values: Vec<(i32, f64)> = x
            .expenditure_trends
            .iter()
            .map(|y| (y.year, y.ratio))
            .collect();
        output::preview_section(
            &format!(
                "{} / {} Expenditure Ratio",
                x.summary.side_a_label, x.summary.side_b_label
            ),
            Some(x.summary.time_span.as_str()),
            &output::trend_rows(&values, &[]),
            5,
        );
    }

    if let Some(s) = state.safety() {
        output::preview_section(
            "Defects by Unit",
            None,
            &output::share_rows(&s.defect_analysis.defect_by_unit, 10),
            10,
        );
        output::preview_section(
            "Incident Causes",
            None,
            &output::share_rows(&s.incident_analysis.cause_classification, 10),
            10,
        );
    }
}

/// Handle option [3]. An empty line or closed input returns to the menu.
fn handle_ask(state: &AnalyticalState, analyst: &Analyst, transcript: &mut Vec<TranscriptEntry>) {
    let status = if analyst.is_offline() {
        "offline mode"
    } else if analyst.check_status() {
        "model backend online"
    } else {
        "model backend unreachable, offline briefs"
    };
    println!("ANALYST CONSOLE ({status}). Empty line to return.\n");

    loop {
        let Some(query) = prompt("Query> ").filter(|q| !q.is_empty()) else {
            println!();
            return;
        };
        let selection = select(&query, state);
        let reply = analyst.respond(&query, &selection);
        let label = match reply.source {
            ReplySource::Model => "ANALYST",
            ReplySource::Fallback => "ANALYST (offline)",
        };
        let at = Local::now();
        println!("\n[{}] {label}\n{}\n", at.format("%H:%M:%S"), reply.text);
        transcript.push(TranscriptEntry {
            at,
            query,
            source: reply.source,
        });
    }
}

fn print_transcript(transcript: &[TranscriptEntry]) {
    if transcript.is_empty() {
        return;
    }
    println!("Session queries:");
    for entry in transcript {
        let tag = match entry.source {
            ReplySource::Model => "model",
            ReplySource::Fallback => "offline",
        };
        println!("  {} [{tag}] {}", entry.at.format("%H:%M:%S"), entry.query);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let settings = Settings::parse();
    info!(
        dataset_dir = %settings.dataset_dir.display(),
        backend = %settings.backend_url,
        model = %settings.model,
        offline = settings.offline,
        "starting"
    );
    let analyst = Analyst::new(settings.clone());
    let mut transcript: Vec<TranscriptEntry> = Vec::new();

    loop {
        println!("Defense Intelligence Console:");
        println!("[1] Load datasets");
        println!("[2] Command dashboard");
        println!("[3] Ask the analyst");
        println!("[4] Export analytical state");
        println!("[5] Exit\n");
        let Some(choice) = read_choice() else {
            println!();
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&settings),
            "2" => {
                let Some(state) = loaded_state() else { continue };
                println!();
                handle_dashboard(state);
                if !prompt_back_to_menu() {
                    break;
                }
            }
            "3" => {
                let Some(state) = loaded_state() else { continue };
                handle_ask(state, &analyst, &mut transcript);
            }
            "4" => {
                let Some(state) = loaded_state() else { continue };
                match output::write_json(&settings.export_path, state) {
                    Ok(()) => println!(
                        "Analytical state exported to {}\n",
                        settings.export_path.display()
                    ),
                    Err(e) => eprintln!("Write error: {e:#}\n"),
                }
            }
            "5" => break,
            _ => println!("Invalid choice. Please enter 1 to 5.\n"),
        }
    }

    print_transcript(&transcript);
    println!("Exiting the program.");
    Ok(())
}
