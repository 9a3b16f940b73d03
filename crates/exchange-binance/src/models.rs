//! Typed response shapes for the Binance futures and spot REST APIs.
//!
//! Raw structs mirror the wire format with optional fields; domain structs
//! carry only what the screener consumes.

use serde::Deserialize;

/// A tradeable USDT-quoted perpetual contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerpSymbolInfo {
    /// Exchange ticker, e.g. "1000PEPEUSDT".
    pub symbol: String,
    /// Base asset as listed, possibly multiplier-prefixed.
    pub base_asset: String,
    pub quote_asset: String,
    /// Listing timestamp in epoch milliseconds, 0 when unknown.
    pub onboard_date: i64,
}

/// A spot trading pair with its listing status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotSymbolInfo {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub status: String,
}

impl SpotSymbolInfo {
    /// True for pairs that can be traded against USDT right now.
    #[must_use]
    pub fn is_tradeable_usdt(&self) -> bool {
        self.status == "TRADING" && self.quote_asset == "USDT"
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFuturesExchangeInfo {
    #[serde(default)]
    pub symbols: Vec<RawFuturesSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawFuturesSymbol {
    pub symbol: String,
    pub base_asset: Option<String>,
    pub quote_asset: Option<String>,
    pub contract_type: Option<String>,
    pub status: Option<String>,
    pub onboard_date: Option<i64>,
}

impl RawFuturesSymbol {
    pub(crate) fn is_usdt_perpetual(&self) -> bool {
        self.contract_type.as_deref() == Some("PERPETUAL")
            && self.status.as_deref() == Some("TRADING")
            && self.quote_asset.as_deref() == Some("USDT")
    }
}

impl From<RawFuturesSymbol> for PerpSymbolInfo {
    fn from(raw: RawFuturesSymbol) -> Self {
        Self {
            base_asset: raw.base_asset.unwrap_or_default(),
            quote_asset: raw.quote_asset.unwrap_or_default(),
            onboard_date: raw.onboard_date.unwrap_or(0),
            symbol: raw.symbol,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSpotExchangeInfo {
    #[serde(default)]
    pub symbols: Vec<RawSpotSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSpotSymbol {
    pub symbol: String,
    pub base_asset: Option<String>,
    pub quote_asset: Option<String>,
    pub status: Option<String>,
}

impl From<RawSpotSymbol> for SpotSymbolInfo {
    fn from(raw: RawSpotSymbol) -> Self {
        Self {
            base_asset: raw.base_asset.unwrap_or_default(),
            quote_asset: raw.quote_asset.unwrap_or_default(),
            status: raw.status.unwrap_or_default(),
            symbol: raw.symbol,
        }
    }
}

/// Ticker prices arrive with the price as a decimal string.
#[derive(Debug, Deserialize)]
pub(crate) struct RawTickerPrice {
    pub symbol: String,
    pub price: String,
}
