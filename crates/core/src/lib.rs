pub mod config;
pub mod config_loader;
pub mod matching;

pub use config::{
    AppConfig, BinanceConfig, CoinGeckoConfig, FilterConfig, ScreenerConfig, ServerConfig,
    DEFAULT_CHAINS_PRIORITY,
};
pub use config_loader::ConfigLoader;
pub use matching::{compute_price_diff_pct, parse_base_asset, ParsedBase};
