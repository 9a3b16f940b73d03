//! Typed response shapes for the CoinGecko API.

use serde::Deserialize;
use std::collections::BTreeMap;

/// An entry from the full coin list (`/coins/list`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoinListItem {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

/// A coin considered for matching against an exchange base asset.
///
/// List-index candidates carry no rank; search results do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinCandidate {
    pub id: String,
    /// Lowercase ticker symbol.
    pub symbol: String,
    pub name: String,
    pub market_cap_rank: Option<u32>,
}

impl From<CoinListItem> for CoinCandidate {
    fn from(item: CoinListItem) -> Self {
        Self {
            id: item.id,
            symbol: item.symbol,
            name: item.name,
            market_cap_rank: None,
        }
    }
}

/// Per-coin details used for price cross-referencing and contract lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinDetails {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub fdv_usd: Option<f64>,
    /// Chain identifier to contract address. Sorted key order, so the
    /// priority-miss fallback scan is deterministic.
    pub platforms: BTreeMap<String, Option<String>>,
}

/// Bulk market data row (`/coins/markets`).
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRow {
    pub id: String,
    pub symbol: String,
    pub current_price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub fdv_usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSearchResponse {
    #[serde(default)]
    pub coins: Vec<RawSearchCoin>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSearchCoin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub market_cap_rank: Option<u32>,
}

impl From<RawSearchCoin> for CoinCandidate {
    fn from(raw: RawSearchCoin) -> Self {
        Self {
            id: raw.id,
            symbol: raw.symbol.to_lowercase(),
            name: raw.name,
            market_cap_rank: raw.market_cap_rank,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawUsdQuote {
    pub usd: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawMarketData {
    #[serde(default)]
    pub current_price: RawUsdQuote,
    #[serde(default)]
    pub market_cap: RawUsdQuote,
    #[serde(default)]
    pub fully_diluted_valuation: RawUsdQuote,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCoinDetails {
    pub id: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub platforms: BTreeMap<String, Option<String>>,
    pub market_data: Option<RawMarketData>,
}

impl From<RawCoinDetails> for CoinDetails {
    fn from(raw: RawCoinDetails) -> Self {
        let market_data = raw.market_data.unwrap_or_default();
        Self {
            id: raw.id,
            symbol: raw.symbol.unwrap_or_default(),
            name: raw.name.unwrap_or_default(),
            current_price_usd: market_data.current_price.usd,
            market_cap_usd: market_data.market_cap.usd,
            fdv_usd: market_data.fully_diluted_valuation.usd,
            platforms: raw.platforms,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMarketRow {
    pub id: String,
    pub symbol: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub fully_diluted_valuation: Option<f64>,
}

impl From<RawMarketRow> for MarketRow {
    fn from(raw: RawMarketRow) -> Self {
        Self {
            id: raw.id,
            symbol: raw.symbol,
            current_price_usd: raw.current_price,
            market_cap_usd: raw.market_cap,
            fdv_usd: raw.fully_diluted_valuation,
        }
    }
}
