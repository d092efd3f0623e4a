// Reads the dataset directory into raw, untyped records.
//
// Every cell arrives as trimmed text; typing happens in the normalizers.
// A file that cannot be read becomes an empty dataset so the rest of the
// directory still loads.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Reader};
use csv::{ReaderBuilder, Trim};
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::record::{RawDataset, RawRecord};

const EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// Per-file outcome of a directory load.
#[derive(Debug, Clone, PartialEq)]
pub struct FileLoad {
    pub filename: String,
    pub key: String,
    pub rows: usize,
    pub skipped_rows: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub files: Vec<FileLoad>,
}

impl LoadReport {
    pub fn total_rows(&self) -> usize {
        self.files.iter().map(|f| f.rows).sum()
    }

    pub fn skipped_rows(&self) -> usize {
        self.files.iter().map(|f| f.skipped_rows).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileLoad> {
        self.files.iter().filter(|f| f.error.is_some())
    }
}

/// camelCase key for a dataset file name:
/// `"Army Recruits 2017-2022.csv"` becomes `armyRecruits20172022`.
pub fn data_key(filename: &str) -> String {
    let stem = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    };
    stem.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_ascii_lowercase();
            if i == 0 {
                return lower;
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn clean_header(h: &str) -> String {
    h.trim_start_matches('\u{feff}').trim().to_string()
}

/// Rows of a delimited file plus the number of rows that failed to parse.
pub fn load_csv(path: &Path) -> Result<(Vec<RawRecord>, usize), LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(clean_header)
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let rec = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unparseable row");
                skipped += 1;
                continue;
            }
        };
        if rec.iter().all(str::is_empty) {
            continue;
        }
        // Ragged rows: missing trailing cells are omitted, extras ignored.
        let row: RawRecord = headers
            .iter()
            .zip(rec.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok((rows, skipped))
}

/// Rows of the first worksheet; the first row supplies the headers.
pub fn load_spreadsheet(path: &Path) -> Result<Vec<RawRecord>, LoadError> {
    let sheet_err = |reason: String| LoadError::Spreadsheet {
        path: path.to_path_buf(),
        reason,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| sheet_err(e.to_string()))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(r) => r.map_err(|e| sheet_err(e.to_string()))?,
        None => return Ok(Vec::new()),
    };

    let mut cells = range.rows();
    let Some(header_row) = cells.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| clean_header(&c.to_string()))
        .collect();

    let rows = cells
        .filter(|row| row.iter().any(|c| !c.to_string().trim().is_empty()))
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .filter(|(_, h)| !h.is_empty())
                .map(|(i, h)| {
                    let value = row.get(i).map(|c| c.to_string()).unwrap_or_default();
                    (h.clone(), value.trim().to_string())
                })
                .collect::<RawRecord>()
        })
        .collect();
    Ok(rows)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn load_file(path: &Path) -> Result<(Vec<RawRecord>, usize), LoadError> {
    match extension(path).as_deref() {
        Some("csv") => load_csv(path),
        Some("xlsx") | Some("xls") => Ok((load_spreadsheet(path)?, 0)),
        _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Dataset files in `dir`, sorted by name.
fn dataset_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let known = extension(&path).is_some_and(|e| EXTENSIONS.contains(&e.as_str()));
        if path.is_file() && known {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every dataset in `dir`, keyed by [`data_key`].
///
/// Fails only when the directory is unreadable or no file yields a row.
pub fn load_dir(dir: &Path) -> Result<(BTreeMap<String, RawDataset>, LoadReport), LoadError> {
    let mut datasets = BTreeMap::new();
    let mut report = LoadReport::default();

    for path in dataset_files(dir)? {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = data_key(&filename);
        let (rows, skipped_rows, error) = match load_file(&path) {
            Ok((rows, skipped)) => (rows, skipped, None),
            Err(e) => {
                warn!(file = %filename, error = %e, "dataset failed to load; continuing with empty data");
                (Vec::new(), 0, Some(e.to_string()))
            }
        };
        debug!(file = %filename, key = %key, rows = rows.len(), "dataset read");
        report.files.push(FileLoad {
            filename: filename.clone(),
            key: key.clone(),
            rows: rows.len(),
            skipped_rows,
            error,
        });
        if datasets
            .insert(key.clone(), RawDataset::new(filename, rows))
            .is_some()
        {
            warn!(key = %key, "two files map to the same dataset key; keeping the later one");
        }
    }

    if report.total_rows() == 0 {
        return Err(LoadError::NothingLoaded {
            dir: dir.to_path_buf(),
        });
    }
    info!(
        files = report.files.len(),
        rows = report.total_rows(),
        failures = report.failures().count(),
        "datasets loaded"
    );
    Ok((datasets, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawValue;
    use std::io::Write;

    #[test]
    fn keys_are_camel_case() {
        assert_eq!(data_key("Army Recruits 2017-2022.csv"), "armyRecruits20172022");
        assert_eq!(
            data_key("Military Expenditure Indo-Pak 1960-2023.xlsx"),
            "militaryExpenditureIndoPak19602023"
        );
        assert_eq!(data_key("Defense Budget Trends.csv"), "defenseBudgetTrends");
        assert_eq!(data_key("ICG_Safety_Reports.csv"), "icgSafetyReports");
    }

    #[test]
    fn csv_cells_are_trimmed_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("budget.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, " Year , Annual Defence Budget (in Cr) ").unwrap();
        writeln!(f, "2020 ,\"1,000\"").unwrap();
        writeln!(f, ",").unwrap();
        writeln!(f, "2021").unwrap();
        drop(f);

        let (rows, skipped) = load_csv(&path).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Year"), Some(&RawValue::from("2020")));
        assert_eq!(
            rows[0].get("Annual Defence Budget (in Cr)"),
            Some(&RawValue::from("1,000"))
        );
        assert!(!rows[1].has_column("Annual Defence Budget (in Cr)"));
    }

    #[test]
    fn failing_file_becomes_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Defense Budget Trends.csv"), "Year,Budget\n2020,5\n").unwrap();
        fs::write(dir.path().join("Broken Sheet.xlsx"), "not a workbook").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let (datasets, report) = load_dir(dir.path()).unwrap();
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets["defenseBudgetTrends"].record_count, 1);
        assert_eq!(datasets["brokenSheet"].record_count, 0);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.total_rows(), 1);
    }

    #[test]
    fn empty_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty.csv"), "Year,Budget\n").unwrap();
        assert!(matches!(
            load_dir(dir.path()),
            Err(LoadError::NothingLoaded { .. })
        ));
    }
}
