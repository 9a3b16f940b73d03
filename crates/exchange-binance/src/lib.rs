pub mod client;
pub mod models;

pub use client::{BinanceClient, FUTURES_API_URL, SPOT_API_URL};
pub use models::{PerpSymbolInfo, SpotSymbolInfo};
