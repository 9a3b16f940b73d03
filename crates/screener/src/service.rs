//! Screener service: one object owning the orchestrator, snapshot
//! store, and run guard, shared by the CLI, scheduler, and HTTP API.

use crate::orchestrator::Screener;
use crate::scheduler::RunGuard;
use crate::snapshot::{rows_to_csv, write_csv_file, SnapshotStore};
use anyhow::Result;
use perp_screener_core::AppConfig;
use std::sync::Arc;

/// Result of a refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed { rows: usize },
    /// Another run was already in progress; nothing was done.
    Skipped,
}

pub struct ScreenerService {
    screener: Screener,
    store: SnapshotStore,
    guard: RunGuard,
    output_dir: String,
}

impl ScreenerService {
    /// Builds the service from configuration.
    ///
    /// # Errors
    /// Returns an error if the screener clients cannot be constructed.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let output_dir = config.screener.output_dir.clone();
        let screener = Screener::from_config(config)?;
        Ok(Self {
            screener,
            store: SnapshotStore::new(),
            guard: RunGuard::new(),
            output_dir,
        })
    }

    #[must_use]
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    #[must_use]
    pub fn guard(&self) -> &RunGuard {
        &self.guard
    }

    /// Runs one full refresh under the run guard.
    ///
    /// # Errors
    /// Returns an error if the run or the CSV write fails; the guard is
    /// released either way.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        if !self.guard.try_begin() {
            return Ok(RefreshOutcome::Skipped);
        }
        let result = self.run_and_snapshot().await;
        self.guard.finish();
        result.map(|rows| RefreshOutcome::Completed { rows })
    }

    /// Spawns a refresh in the background; false when a run is already
    /// in progress.
    pub fn try_trigger(self: &Arc<Self>) -> bool {
        if !self.guard.try_begin() {
            return false;
        }
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let result = service.run_and_snapshot().await;
            service.guard.finish();
            match result {
                Ok(rows) => tracing::info!(rows, "Triggered refresh complete"),
                Err(err) => tracing::error!(error = %err, "Triggered refresh failed"),
            }
        });
        true
    }

    async fn run_and_snapshot(&self) -> Result<usize> {
        let rows = self.screener.run().await?;
        let csv_text = rows_to_csv(&rows)?;

        let path = write_csv_file(&csv_text, &self.output_dir)?;
        tracing::info!(path = %path.display(), rows = rows.len(), "Wrote snapshot CSV");

        self.store.replace(csv_text, rows.len()).await;
        Ok(rows.len())
    }
}
