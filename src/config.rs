use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1:latest";
pub const DEFAULT_TIMEOUT_SECS: u64 = 8;

/// Defense intelligence analytics - dataset normalization and analyst chat
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Settings {
    /// Directory holding the CSV/XLSX datasets
    #[arg(short, long, env = "INTEL_DATASET_DIR", default_value = "datasets")]
    pub dataset_dir: PathBuf,

    /// Base URL of the local inference server
    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Model name passed to the inference server
    #[arg(long, env = "OLLAMA_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Seconds to wait for a completion before answering offline
    #[arg(
        long,
        env = "INTEL_BACKEND_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..=9)
    )]
    pub timeout_secs: u64,

    /// Never contact the backend; always use offline briefs
    #[arg(long, env = "INTEL_OFFLINE", default_value_t = false)]
    pub offline: bool,

    /// Where option [4] writes the analytical state
    #[arg(long, default_value = "analytical_state.json")]
    pub export_path: PathBuf,
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.backend_url.trim_end_matches('/'))
    }

    pub fn tags_url(&self) -> String {
        format!("{}/api/tags", self.backend_url.trim_end_matches('/'))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            dataset_dir: PathBuf::from("datasets"),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            offline: false,
            export_path: PathBuf::from("analytical_state.json"),
        }
    }
}
