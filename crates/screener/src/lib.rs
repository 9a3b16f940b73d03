//! Reconciliation pipeline: orchestrator, filters, snapshot sink, and
//! the periodic refresh scheduler.

pub mod cache;
pub mod filters;
pub mod orchestrator;
pub mod row;
pub mod scheduler;
pub mod service;
pub mod snapshot;

pub use cache::DetailsCache;
pub use filters::{join_filter_reason, violated_filter_tags};
pub use orchestrator::Screener;
pub use row::{MatchStatus, OutputRow};
pub use scheduler::{run_periodic, RunGuard, RunState};
pub use service::{RefreshOutcome, ScreenerService};
pub use snapshot::{rows_to_csv, write_csv_file, Snapshot, SnapshotStore, CSV_COLUMNS};
