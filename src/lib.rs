//! Defense intelligence analytics: loads raw defence datasets, normalizes
//! them into one analytical state and answers free-text questions about it,
//! through a local model backend when one is reachable and an offline
//! narrative otherwise.
pub mod analyst;
pub mod classify;
pub mod config;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod narrative;
pub mod normalizers;
pub mod output;
pub mod record;
pub mod selector;
pub mod state;
pub mod types;
pub mod util;

pub use analyst::{Analyst, Reply, ReplySource};
pub use record::{RawDataset, RawRecord, RawValue};
pub use selector::{select, Selection};
pub use state::{aggregate_all, AnalyticalState, DatasetKind, Outcome};
