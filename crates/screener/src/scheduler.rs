//! Run overlap guard and the periodic refresh loop.

use crate::service::{RefreshOutcome, ScreenerService};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

/// Two-state run guard; transitions only Idle -> Running -> Idle.
///
/// A begin attempt while Running is rejected rather than queued.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

impl RunGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts the Idle -> Running transition; false when already
    /// Running.
    pub fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns to Idle. Called exactly once per successful `try_begin`,
    /// including after failed runs.
    pub fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        if self.running.load(Ordering::Acquire) {
            RunState::Running
        } else {
            RunState::Idle
        }
    }
}

/// Re-runs the full refresh on a fixed interval, forever.
///
/// The first tick fires immediately so a freshly started server
/// populates its snapshot without waiting a full interval. Ticks that
/// land while a run is still active are skipped, and failed runs are
/// retried from scratch on the next tick.
pub async fn run_periodic(service: Arc<ScreenerService>, interval: Duration) {
    tracing::info!(interval_secs = interval.as_secs(), "Starting refresh scheduler");
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match service.refresh().await {
            Ok(RefreshOutcome::Completed { rows }) => {
                tracing::info!(rows, "Scheduled refresh complete");
            }
            Ok(RefreshOutcome::Skipped) => {
                tracing::warn!("Skipping scheduled refresh, previous run still active");
            }
            Err(err) => {
                tracing::error!(error = %err, "Scheduled refresh failed");
            }
        }
    }
}
