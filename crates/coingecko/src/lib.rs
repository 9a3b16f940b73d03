//! CoinGecko integration: client pool, retry policy, and coin resolution.
//!
//! The client pool routes requests through rotating proxies when
//! configured, classifies failures for retry, and exposes the candidate
//! selection and chain resolution rules used to match exchange assets to
//! CoinGecko coins.

pub mod client;
pub mod error;
pub mod models;
pub mod proxy;
pub mod resolve;
pub mod retry;

pub use client::{CoinGeckoClient, COINGECKO_API_URL};
pub use error::{CoinGeckoError, Result};
pub use models::{CoinCandidate, CoinDetails, CoinListItem, MarketRow};
pub use proxy::ProxyRotator;
pub use resolve::{pick_best_coin_candidate, pick_chain_and_contract};
pub use retry::with_retry;
