//! Run-scoped cache of CoinGecko coin details.

use perp_screener_coingecko::CoinDetails;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Per-key single-flight cache.
///
/// The first requester for a coin id runs the fetch; concurrent
/// requesters for the same id await that in-flight result instead of
/// issuing their own call. Failed fetches are cached as None for the
/// rest of the run, so a flaky coin is not re-fetched per symbol.
#[derive(Debug, Default)]
pub struct DetailsCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Option<CoinDetails>>>>>,
}

impl DetailsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached details for `id`, fetching via `fetch` at most
    /// once per run.
    pub async fn get_or_fetch<F, Fut>(&self, id: &str, fetch: F) -> Option<CoinDetails>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<CoinDetails>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(id.to_string()).or_default().clone()
        };
        cell.get_or_init(fetch).await.clone()
    }

    /// Number of distinct coin ids seen so far.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
