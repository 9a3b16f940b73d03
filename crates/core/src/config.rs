use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Default chain priority used for contract resolution when the config
/// does not override it. Ordered by liquidity relevance.
pub const DEFAULT_CHAINS_PRIORITY: [&str; 12] = [
    "ethereum",
    "binance-smart-chain",
    "arbitrum-one",
    "optimistic-ethereum",
    "solana",
    "polygon-pos",
    "base",
    "avalanche",
    "tron",
    "fantom",
    "linea",
    "opbnb",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub screener: ScreenerConfig,
    pub filters: FilterConfig,
    pub binance: BinanceConfig,
    pub coingecko: CoinGeckoConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    /// Maximum number of per-symbol work units in flight at once.
    pub concurrency: usize,
    /// Relative price deviation above which a match is rejected.
    pub price_tolerance: f64,
    /// Interval between progress log lines during a run.
    pub progress_interval_ms: u64,
    /// Interval between scheduled full re-runs.
    pub refresh_interval_secs: u64,
    /// Chain identifiers walked in order when resolving a contract address.
    pub chains_priority: Vec<String>,
    /// Directory CSV snapshots are written to.
    pub output_dir: String,
    /// Newline-delimited proxy list; missing file disables proxying.
    pub proxy_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_market_cap_usd: Option<f64>,
    pub max_market_cap_usd: Option<f64>,
    pub min_fdv_usd: Option<f64>,
    pub max_fdv_usd: Option<f64>,
    pub min_onboard_days: Option<i64>,
    pub max_onboard_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    pub futures_api_url: String,
    pub spot_api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub api_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            price_tolerance: 0.2,
            progress_interval_ms: 5000,
            refresh_interval_secs: 3600,
            chains_priority: DEFAULT_CHAINS_PRIORITY
                .iter()
                .map(ToString::to_string)
                .collect(),
            output_dir: "output".to_string(),
            proxy_file: "proxy.txt".to_string(),
        }
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            futures_api_url: "https://fapi.binance.com".to_string(),
            spot_api_url: "https://api.binance.com".to_string(),
        }
    }
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.coingecko.com/api/v3".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Validates configuration bounds.
    ///
    /// # Errors
    /// Returns an error describing the first out-of-bounds value. Invalid
    /// configuration is fatal at startup.
    pub fn validate(&self) -> Result<()> {
        let s = &self.screener;
        if s.concurrency < 1 || s.concurrency > 32 {
            bail!(
                "screener.concurrency must be in 1..=32, got {}",
                s.concurrency
            );
        }
        if !(s.price_tolerance > 0.0 && s.price_tolerance <= 1.0) {
            bail!(
                "screener.price_tolerance must be in (0, 1], got {}",
                s.price_tolerance
            );
        }
        if s.progress_interval_ms < 1 || s.progress_interval_ms > 600_000 {
            bail!(
                "screener.progress_interval_ms must be in 1..=600000, got {}",
                s.progress_interval_ms
            );
        }
        if s.refresh_interval_secs < 60 {
            bail!(
                "screener.refresh_interval_secs must be at least 60, got {}",
                s.refresh_interval_secs
            );
        }
        if s.chains_priority.is_empty() {
            bail!("screener.chains_priority must not be empty");
        }
        self.filters.validate()?;
        if self.coingecko.timeout_secs == 0 {
            bail!("coingecko.timeout_secs must be positive");
        }
        Ok(())
    }
}

impl FilterConfig {
    fn validate(&self) -> Result<()> {
        if let Some(v) = self.min_market_cap_usd {
            if !(v.is_finite() && v >= 0.0) {
                bail!("filters.min_market_cap_usd must be non-negative, got {v}");
            }
        }
        if let Some(v) = self.max_market_cap_usd {
            if !(v.is_finite() && v > 0.0) {
                bail!("filters.max_market_cap_usd must be positive, got {v}");
            }
        }
        if let Some(v) = self.min_fdv_usd {
            if !(v.is_finite() && v >= 0.0) {
                bail!("filters.min_fdv_usd must be non-negative, got {v}");
            }
        }
        if let Some(v) = self.max_fdv_usd {
            if !(v.is_finite() && v > 0.0) {
                bail!("filters.max_fdv_usd must be positive, got {v}");
            }
        }
        if let Some(v) = self.min_onboard_days {
            if v < 0 {
                bail!("filters.min_onboard_days must be non-negative, got {v}");
            }
        }
        if let Some(v) = self.max_onboard_days {
            if v < 1 {
                bail!("filters.max_onboard_days must be positive, got {v}");
            }
        }
        Ok(())
    }
}
