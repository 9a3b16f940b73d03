//! REST client for the Binance futures and spot APIs.
//!
//! One client covers both markets; each market keeps its own base URL so
//! tests can point either at a mock server independently.

use crate::models::{
    PerpSymbolInfo, RawFuturesExchangeInfo, RawFuturesSymbol, RawSpotExchangeInfo, RawTickerPrice,
    SpotSymbolInfo,
};
use anyhow::{anyhow, Result};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use perp_screener_core::BinanceConfig;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default Binance USDT-margined futures API base URL.
pub const FUTURES_API_URL: &str = "https://fapi.binance.com";
/// Default Binance spot API base URL.
pub const SPOT_API_URL: &str = "https://api.binance.com";

const REQUEST_TIMEOUT_SECS: u64 = 15;

type GovernorLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct BinanceClient {
    http: Client,
    futures_base_url: String,
    spot_base_url: String,
    /// Shared across both markets; Binance weights by IP, not endpoint.
    rate_limiter: Arc<GovernorLimiter>,
}

impl BinanceClient {
    /// Creates a client against the production endpoints, rate limited to
    /// 10 requests per second.
    #[must_use]
    pub fn new() -> Self {
        let quota = Quota::per_second(nonzero!(10u32));
        Self {
            http: Client::new(),
            futures_base_url: FUTURES_API_URL.to_string(),
            spot_base_url: SPOT_API_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Creates a client from configuration.
    #[must_use]
    pub fn from_config(config: &BinanceConfig) -> Self {
        Self::new()
            .with_futures_base_url(config.futures_api_url.clone())
            .with_spot_base_url(config.spot_api_url.clone())
    }

    /// Sets a custom futures base URL (useful for testing).
    #[must_use]
    pub fn with_futures_base_url(mut self, url: impl Into<String>) -> Self {
        self.futures_base_url = url.into();
        self
    }

    /// Sets a custom spot base URL (useful for testing).
    #[must_use]
    pub fn with_spot_base_url(mut self, url: impl Into<String>) -> Self {
        self.spot_base_url = url.into();
        self
    }

    #[must_use]
    pub fn futures_base_url(&self) -> &str {
        &self.futures_base_url
    }

    #[must_use]
    pub fn spot_base_url(&self) -> &str {
        &self.spot_base_url
    }

    /// Waits for rate limit and makes a GET request.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Binance API error {}: {}", status, text));
        }

        let body = response.json::<T>().await?;
        Ok(body)
    }

    /// Fetches all tradeable USDT-quoted perpetual contracts.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be
    /// parsed.
    pub async fn fetch_perp_symbols(&self) -> Result<Vec<PerpSymbolInfo>> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.futures_base_url);
        let info: RawFuturesExchangeInfo = self.get(url).await?;

        let symbols: Vec<PerpSymbolInfo> = info
            .symbols
            .into_iter()
            .filter(RawFuturesSymbol::is_usdt_perpetual)
            .map(Into::into)
            .collect();

        tracing::debug!(count = symbols.len(), "Fetched perpetual symbols");
        Ok(symbols)
    }

    /// Fetches last prices for all futures tickers.
    ///
    /// Entries with unparseable or non-finite prices are skipped.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be
    /// parsed.
    pub async fn fetch_perp_prices(&self) -> Result<HashMap<String, f64>> {
        let url = format!("{}/fapi/v1/ticker/price", self.futures_base_url);
        let tickers: Vec<RawTickerPrice> = self.get(url).await?;
        Ok(Self::parse_prices(tickers))
    }

    /// Fetches all spot trading pairs with their listing status.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be
    /// parsed.
    pub async fn fetch_spot_symbols(&self) -> Result<Vec<SpotSymbolInfo>> {
        let url = format!("{}/api/v3/exchangeInfo", self.spot_base_url);
        let info: RawSpotExchangeInfo = self.get(url).await?;

        let symbols: Vec<SpotSymbolInfo> = info.symbols.into_iter().map(Into::into).collect();

        tracing::debug!(count = symbols.len(), "Fetched spot symbols");
        Ok(symbols)
    }

    /// Fetches last prices for all spot tickers.
    ///
    /// Entries with unparseable or non-finite prices are skipped.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be
    /// parsed.
    pub async fn fetch_spot_prices(&self) -> Result<HashMap<String, f64>> {
        let url = format!("{}/api/v3/ticker/price", self.spot_base_url);
        let tickers: Vec<RawTickerPrice> = self.get(url).await?;
        Ok(Self::parse_prices(tickers))
    }

    fn parse_prices(tickers: Vec<RawTickerPrice>) -> HashMap<String, f64> {
        let mut prices = HashMap::with_capacity(tickers.len());
        for ticker in tickers {
            match ticker.price.parse::<f64>() {
                Ok(price) if price.is_finite() => {
                    prices.insert(ticker.symbol, price);
                }
                _ => {
                    tracing::debug!(
                        symbol = %ticker.symbol,
                        price = %ticker.price,
                        "Skipping unparseable ticker price"
                    );
                }
            }
        }
        prices
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}
