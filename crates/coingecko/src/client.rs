//! HTTP client pool for the CoinGecko API.
//!
//! Holds one `reqwest` client per configured proxy (or a single direct
//! client) and picks uniformly at random per request, so load spreads
//! across egress IPs. Detail lookups are additionally paced through a
//! shared limiter because `/coins/{id}` is the most aggressively
//! throttled endpoint.

use crate::error::{CoinGeckoError, Result};
use crate::models::{
    CoinCandidate, CoinDetails, CoinListItem, MarketRow, RawCoinDetails, RawMarketRow,
    RawSearchResponse,
};
use crate::proxy::ProxyRotator;
use crate::retry::with_retry;
use governor::{Quota, RateLimiter};
use perp_screener_core::CoinGeckoConfig;
use rand::Rng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Default CoinGecko public API base URL.
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Minimum spacing between `/coins/{id}` calls across all workers.
const DETAIL_CALL_SPACING_MS: u64 = 300;

const COINS_LIST_RETRIES: u32 = 3;
const COINS_LIST_BASE_DELAY: Duration = Duration::from_millis(800);
const SEARCH_RETRIES: u32 = 3;
const SEARCH_BASE_DELAY: Duration = Duration::from_millis(600);
const DETAILS_RETRIES: u32 = 3;
const DETAILS_BASE_DELAY: Duration = Duration::from_millis(800);
const MARKETS_RETRIES: u32 = 6;
const MARKETS_BASE_DELAY: Duration = Duration::from_millis(1500);

const MARKETS_CHUNK_SIZE: usize = 100;
const MARKETS_CHUNK_PAUSE_MS: u64 = 300;

type GovernorLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Debug)]
pub struct CoinGeckoClient {
    clients: Vec<Client>,
    base_url: String,
    timeout: Duration,
    /// Shared across the pool; proxies spread IPs, not API keys.
    detail_pacer: Arc<GovernorLimiter>,
}

impl CoinGeckoClient {
    /// Creates a client against the production endpoint without proxies.
    #[must_use]
    pub fn new() -> Self {
        let quota = Quota::with_period(Duration::from_millis(DETAIL_CALL_SPACING_MS)).unwrap();
        Self {
            clients: vec![Client::new()],
            base_url: COINGECKO_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            detail_pacer: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Creates a client pool from configuration, one client per proxy.
    ///
    /// An empty rotator yields a single direct client.
    ///
    /// # Errors
    /// Returns [`CoinGeckoError::Configuration`] if a proxy URL is invalid
    /// or a client cannot be built.
    pub fn from_config(config: &CoinGeckoConfig, proxies: &ProxyRotator) -> Result<Self> {
        let mut clients = Vec::with_capacity(proxies.len().max(1));
        while clients.len() < proxies.len() {
            let Some(proxy_url) = proxies.next() else { break };
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|err| {
                CoinGeckoError::Configuration(format!("invalid proxy {proxy_url}: {err}"))
            })?;
            let client = Client::builder().proxy(proxy).build().map_err(|err| {
                CoinGeckoError::Configuration(format!("failed to build proxied client: {err}"))
            })?;
            clients.push(client);
        }
        if clients.is_empty() {
            clients.push(Client::new());
        }

        tracing::info!(
            clients = clients.len(),
            proxied = !proxies.is_empty(),
            "Built CoinGecko client pool"
        );

        let mut instance = Self::new();
        instance.clients = clients;
        instance.base_url = config.api_url.clone();
        instance.timeout = Duration::from_secs(config.timeout_secs);
        Ok(instance)
    }

    /// Sets a custom base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn pick_client(&self) -> &Client {
        if self.clients.len() == 1 {
            return &self.clients[0];
        }
        let index = rand::thread_rng().gen_range(0..self.clients.len());
        &self.clients[index]
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self
            .pick_client()
            .get(&url)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok());
            return Err(CoinGeckoError::rate_limit(retry_after_secs));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CoinGeckoError::api(status.as_u16(), message));
        }

        Ok(response.json::<T>().await?)
    }

    /// Fetches the full coin index without platform data.
    ///
    /// # Errors
    /// Returns an error once retries on transient failures are exhausted.
    pub async fn fetch_coins_list(&self) -> Result<Vec<CoinListItem>> {
        let items: Vec<CoinListItem> = with_retry(COINS_LIST_RETRIES, COINS_LIST_BASE_DELAY, || {
            self.get_json("/coins/list?include_platform=false")
        })
        .await?;

        tracing::debug!(count = items.len(), "Fetched coin index");
        Ok(items)
    }

    /// Searches coins by free-text query.
    ///
    /// Result symbols are normalized to lowercase.
    ///
    /// # Errors
    /// Returns an error once retries on transient failures are exhausted.
    pub async fn search_coins(&self, query: &str) -> Result<Vec<CoinCandidate>> {
        let url = format!("/search?query={}", urlencoding::encode(query));
        let response: RawSearchResponse =
            with_retry(SEARCH_RETRIES, SEARCH_BASE_DELAY, || self.get_json(&url)).await?;

        Ok(response.coins.into_iter().map(Into::into).collect())
    }

    /// Fetches per-coin details including market data and platform map.
    ///
    /// Calls are paced so the pool as a whole stays under the endpoint's
    /// throttle regardless of worker concurrency.
    ///
    /// # Errors
    /// Returns an error once retries on transient failures are exhausted.
    pub async fn fetch_coin_details(&self, id: &str) -> Result<CoinDetails> {
        let url = format!(
            "/coins/{}?localization=false&tickers=false&market_data=true&community_data=false&developer_data=false&sparkline=false",
            urlencoding::encode(id)
        );
        let raw: RawCoinDetails = with_retry(DETAILS_RETRIES, DETAILS_BASE_DELAY, || async {
            self.detail_pacer.until_ready().await;
            self.get_json(&url).await
        })
        .await?;

        Ok(raw.into())
    }

    /// Fetches bulk market rows for the given coin ids, chunked to stay
    /// within URL length limits.
    ///
    /// # Errors
    /// Returns an error once retries on transient failures are exhausted
    /// for any chunk.
    pub async fn fetch_markets_by_ids(&self, ids: &[String]) -> Result<Vec<MarketRow>> {
        let mut rows = Vec::with_capacity(ids.len());
        for (index, chunk) in ids.chunks(MARKETS_CHUNK_SIZE).enumerate() {
            if index > 0 {
                tokio::time::sleep(Duration::from_millis(MARKETS_CHUNK_PAUSE_MS)).await;
            }
            let url = format!(
                "/coins/markets?vs_currency=usd&ids={}&order=market_cap_desc&per_page={}&page=1&sparkline=false",
                chunk.join(","),
                chunk.len()
            );
            let raw: Vec<RawMarketRow> =
                with_retry(MARKETS_RETRIES, MARKETS_BASE_DELAY, || self.get_json(&url)).await?;
            rows.extend(raw.into_iter().map(MarketRow::from));
        }

        tracing::debug!(ids = ids.len(), rows = rows.len(), "Fetched market rows");
        Ok(rows)
    }
}

impl Default for CoinGeckoClient {
    fn default() -> Self {
        Self::new()
    }
}
