//! Round-robin proxy pool for outbound CoinGecko calls.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordered pool of proxy endpoints with a shared round-robin cursor.
///
/// Built once at startup and injected wherever proxied clients are
/// constructed. The cursor is never reset mid-run.
#[derive(Debug, Default)]
pub struct ProxyRotator {
    pool: Vec<String>,
    cursor: AtomicUsize,
}

impl ProxyRotator {
    /// Creates a rotator over the given endpoints.
    #[must_use]
    pub fn new(pool: Vec<String>) -> Self {
        Self {
            pool,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Loads a newline-delimited proxy list from a file.
    ///
    /// A missing or unreadable file yields an empty pool (logged); blank
    /// lines are skipped.
    #[must_use]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let pool: Vec<String> = contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(ToString::to_string)
                    .collect();
                tracing::info!(path = %path.display(), count = pool.len(), "Loaded proxy list");
                Self::new(pool)
            }
            Err(err) => {
                tracing::info!(
                    path = %path.display(),
                    error = %err,
                    "No proxy list found, requests go direct"
                );
                Self::new(Vec::new())
            }
        }
    }

    /// Returns the next proxy in strict round-robin order, or None when
    /// the pool is empty.
    pub fn next(&self) -> Option<&str> {
        if self.pool.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(self.pool[index % self.pool.len()].as_str())
    }

    /// All configured endpoints in pool order.
    #[must_use]
    pub fn proxies(&self) -> &[String] {
        &self.pool
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
