//! Reconciliation orchestrator: joins perp listings, spot listings, and
//! CoinGecko metadata into the enriched row set.

use crate::cache::DetailsCache;
use crate::filters::{join_filter_reason, violated_filter_tags};
use crate::row::{MatchStatus, OutputRow};
use anyhow::{Context, Result};
use perp_screener_binance::{BinanceClient, PerpSymbolInfo};
use perp_screener_coingecko::{
    pick_best_coin_candidate, pick_chain_and_contract, CoinCandidate, CoinGeckoClient,
    ProxyRotator,
};
use perp_screener_core::{compute_price_diff_pct, parse_base_asset, AppConfig, FilterConfig};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Run-level counters, shared across per-symbol workers.
#[derive(Debug, Default)]
struct RunCounters {
    processed: AtomicU64,
    matched: AtomicU64,
    price_too_far: AtomicU64,
    no_cg: AtomicU64,
    cap_flagged: AtomicU64,
    fdv_flagged: AtomicU64,
    onboard_flagged: AtomicU64,
}

/// Immutable per-run inputs shared by all workers.
struct RunContext {
    price_tolerance: f64,
    chains_priority: Vec<String>,
    filters: FilterConfig,
    perp_prices: HashMap<String, f64>,
    spot_usdt: HashSet<String>,
    spot_prices: HashMap<String, f64>,
    /// Lowercased symbol to candidates, insertion order preserved per key.
    candidates: HashMap<String, Vec<CoinCandidate>>,
    coingecko: Arc<CoinGeckoClient>,
    cache: DetailsCache,
    counters: RunCounters,
}

pub struct Screener {
    config: AppConfig,
    binance: Arc<BinanceClient>,
    coingecko: Arc<CoinGeckoClient>,
}

impl Screener {
    /// Builds the screener from configuration: loads the proxy list and
    /// constructs both exchange clients.
    ///
    /// # Errors
    /// Returns an error if the CoinGecko client pool cannot be built.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let rotator = ProxyRotator::load(&config.screener.proxy_file);
        let coingecko = CoinGeckoClient::from_config(&config.coingecko, &rotator)
            .context("Failed to build CoinGecko client pool")?;
        let binance = BinanceClient::from_config(&config.binance);

        Ok(Self {
            config,
            binance: Arc::new(binance),
            coingecko: Arc::new(coingecko),
        })
    }

    /// Runs one full reconciliation pass and returns the row set sorted
    /// by exchange symbol.
    ///
    /// Per-symbol failures are absorbed; only prologue fetches (exchange
    /// data, coin list) are run-fatal.
    ///
    /// # Errors
    /// Returns an error if exchange data or the CoinGecko coin list
    /// cannot be fetched.
    pub async fn run(&self) -> Result<Vec<OutputRow>> {
        let started = Instant::now();

        let (perp_symbols, perp_prices, spot_symbols, spot_prices) = tokio::try_join!(
            self.binance.fetch_perp_symbols(),
            self.binance.fetch_perp_prices(),
            self.binance.fetch_spot_symbols(),
            self.binance.fetch_spot_prices(),
        )
        .context("Failed to fetch exchange data")?;

        let spot_usdt: HashSet<String> = spot_symbols
            .iter()
            .filter(|s| s.is_tradeable_usdt())
            .map(|s| s.symbol.clone())
            .collect();

        let coin_list = self
            .coingecko
            .fetch_coins_list()
            .await
            .context("Failed to fetch CoinGecko coin list")?;

        let mut candidates: HashMap<String, Vec<CoinCandidate>> = HashMap::new();
        for item in coin_list {
            candidates
                .entry(item.symbol.to_lowercase())
                .or_default()
                .push(item.into());
        }

        let total = perp_symbols.len();
        tracing::info!(
            perps = total,
            spot_usdt = spot_usdt.len(),
            coin_symbols = candidates.len(),
            "Starting screener run"
        );

        let ctx = Arc::new(RunContext {
            price_tolerance: self.config.screener.price_tolerance,
            chains_priority: self.config.screener.chains_priority.clone(),
            filters: self.config.filters.clone(),
            perp_prices,
            spot_usdt,
            spot_prices,
            candidates,
            coingecko: Arc::clone(&self.coingecko),
            cache: DetailsCache::new(),
            counters: RunCounters::default(),
        });

        let progress = spawn_progress_logger(
            Arc::clone(&ctx),
            total as u64,
            Duration::from_millis(self.config.screener.progress_interval_ms),
        );

        let semaphore = Arc::new(Semaphore::new(self.config.screener.concurrency));
        let mut tasks = JoinSet::new();
        for perp in perp_symbols {
            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return None;
                };
                let row = build_row(&ctx, &perp).await;
                ctx.counters.processed.fetch_add(1, Ordering::Relaxed);
                row
            });
        }

        let mut rows = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "Symbol worker failed"),
            }
        }
        progress.abort();

        rows.sort_by(|a, b| a.exchange_symbol.cmp(&b.exchange_symbol));

        let counters = &ctx.counters;
        let details_fetched = ctx.cache.len().await;
        tracing::info!(
            total,
            rows = rows.len(),
            matched = counters.matched.load(Ordering::Relaxed),
            price_too_far = counters.price_too_far.load(Ordering::Relaxed),
            no_cg = counters.no_cg.load(Ordering::Relaxed),
            details_fetched,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Screener run complete"
        );

        Ok(rows)
    }
}

fn spawn_progress_logger(
    ctx: Arc<RunContext>,
    total: u64,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // interval fires immediately; swallow the first tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let c = &ctx.counters;
            tracing::info!(
                processed = c.processed.load(Ordering::Relaxed),
                total,
                matched = c.matched.load(Ordering::Relaxed),
                price_too_far = c.price_too_far.load(Ordering::Relaxed),
                no_cg = c.no_cg.load(Ordering::Relaxed),
                cap_flagged = c.cap_flagged.load(Ordering::Relaxed),
                fdv_flagged = c.fdv_flagged.load(Ordering::Relaxed),
                onboard_flagged = c.onboard_flagged.load(Ordering::Relaxed),
                "Screening progress"
            );
        }
    })
}

/// Whole days between onboarding and now, -1 when the timestamp is
/// unknown, clamped at 0 for timestamps in the future.
fn onboard_days(onboard_ms: i64, now_ms: i64) -> i64 {
    if onboard_ms <= 0 {
        return -1;
    }
    ((now_ms - onboard_ms) / MILLIS_PER_DAY).max(0)
}

async fn build_row(ctx: &RunContext, perp: &PerpSymbolInfo) -> Option<OutputRow> {
    let futures_price = match ctx.perp_prices.get(&perp.symbol) {
        Some(price) if price.is_finite() => *price,
        _ => {
            tracing::debug!(symbol = %perp.symbol, "Skipping symbol without usable futures price");
            return None;
        }
    };

    let parsed = parse_base_asset(&perp.base_asset);
    let unit_price = futures_price / parsed.multiplier as f64;
    let days = onboard_days(perp.onboard_date, chrono::Utc::now().timestamp_millis());

    let spot_pair = format!("{}USDT", parsed.base_normalized);
    let has_spot = ctx.spot_usdt.contains(&spot_pair);
    let (spot_symbol, spot_price_usd) = if has_spot {
        let price = ctx.spot_prices.get(&spot_pair).copied();
        (Some(spot_pair), price)
    } else {
        (None, None)
    };

    let best = ctx
        .candidates
        .get(&parsed.base_normalized.to_lowercase())
        .and_then(|group| pick_best_coin_candidate(&parsed.base_normalized, group));

    let details = match best {
        Some(candidate) => {
            let id = candidate.id.clone();
            let coingecko = Arc::clone(&ctx.coingecko);
            ctx.cache
                .get_or_fetch(&candidate.id, || async move {
                    match coingecko.fetch_coin_details(&id).await {
                        Ok(details) => Some(details),
                        Err(err) => {
                            tracing::warn!(coin_id = %id, error = %err, "CoinGecko detail fetch failed");
                            None
                        }
                    }
                })
                .await
        }
        None => None,
    };

    let mut row = OutputRow {
        exchange_symbol: perp.symbol.clone(),
        base_asset: perp.base_asset.clone(),
        multiplier: parsed.multiplier,
        futures_price_usd: futures_price,
        unit_price_from_futures_usd: unit_price,
        onboard_days: days,
        has_spot,
        spot_symbol,
        spot_price_usd,
        coingecko_id: None,
        coingecko_symbol: None,
        coingecko_name: None,
        coingecko_price_usd: None,
        price_diff_pct: None,
        market_cap_usd: None,
        fdv_usd: None,
        chain: None,
        contract: None,
        match_status: MatchStatus::CgNotFound,
        filter_reason: None,
    };

    if let Some(details) = details {
        let (chain, contract) = pick_chain_and_contract(&details.platforms, &ctx.chains_priority);
        row.chain = chain;
        row.contract = contract;
        row.market_cap_usd = details.market_cap_usd;
        row.fdv_usd = details.fdv_usd;
        row.coingecko_price_usd = details.current_price_usd;
        row.coingecko_id = Some(details.id);
        row.coingecko_symbol = Some(details.symbol);
        row.coingecko_name = Some(details.name);

        if let Some(cg_price) = row.coingecko_price_usd {
            let diff = compute_price_diff_pct(unit_price, cg_price);
            row.price_diff_pct = Some(diff);
            if diff <= ctx.price_tolerance {
                row.match_status = MatchStatus::Matched;
                ctx.counters.matched.fetch_add(1, Ordering::Relaxed);
            } else {
                row.match_status = MatchStatus::PriceTooFar;
                ctx.counters.price_too_far.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    if row.match_status == MatchStatus::CgNotFound {
        ctx.counters.no_cg.fetch_add(1, Ordering::Relaxed);
    }

    let tags = violated_filter_tags(&ctx.filters, days, row.market_cap_usd, row.fdv_usd);
    for tag in &tags {
        if tag.starts_with("onboard") {
            ctx.counters.onboard_flagged.fetch_add(1, Ordering::Relaxed);
        } else if tag.starts_with("mcap") {
            ctx.counters.cap_flagged.fetch_add(1, Ordering::Relaxed);
        } else {
            ctx.counters.fdv_flagged.fetch_add(1, Ordering::Relaxed);
        }
    }
    row.filter_reason = join_filter_reason(tags);

    Some(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ==================== Onboard Days Tests ====================

    #[test]
    fn test_onboard_days_unknown_timestamp() {
        assert_eq!(onboard_days(0, 1_700_000_000_000), -1);
        assert_eq!(onboard_days(-5, 1_700_000_000_000), -1);
    }

    #[test]
    fn test_onboard_days_whole_day_floor() {
        let now = 1_700_000_000_000;
        assert_eq!(onboard_days(now - 5 * MILLIS_PER_DAY, now), 5);
        assert_eq!(onboard_days(now - 5 * MILLIS_PER_DAY - 1000, now), 5);
        assert_eq!(onboard_days(now - MILLIS_PER_DAY + 1, now), 0);
    }

    #[test]
    fn test_onboard_days_future_timestamp_clamped() {
        let now = 1_700_000_000_000;
        assert_eq!(onboard_days(now + 3 * MILLIS_PER_DAY, now), 0);
    }

    // ==================== Run Tests ====================

    async fn mount_exchange_data(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/fapi/v1/exchangeInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbols": [
                    {
                        "symbol": "1000PEPEUSDT",
                        "baseAsset": "1000PEPE",
                        "quoteAsset": "USDT",
                        "contractType": "PERPETUAL",
                        "status": "TRADING"
                    },
                    {
                        "symbol": "BTCUSDT",
                        "baseAsset": "BTC",
                        "quoteAsset": "USDT",
                        "contractType": "PERPETUAL",
                        "status": "TRADING",
                        "onboardDate": 1_569_398_400_000i64
                    }
                ]
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/fapi/v1/ticker/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"symbol": "1000PEPEUSDT", "price": "0.0123"},
                {"symbol": "BTCUSDT", "price": "97000.0"}
            ])))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v3/exchangeInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbols": [
                    {"symbol": "PEPEUSDT", "baseAsset": "PEPE", "quoteAsset": "USDT", "status": "TRADING"},
                    {"symbol": "BTCUSDT", "baseAsset": "BTC", "quoteAsset": "USDT", "status": "TRADING"}
                ]
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"symbol": "PEPEUSDT", "price": "0.0000122"},
                {"symbol": "BTCUSDT", "price": "96950.0"}
            ])))
            .mount(server)
            .await;
    }

    fn test_config(server: &MockServer) -> AppConfig {
        let mut config = AppConfig::default();
        config.binance.futures_api_url = server.uri();
        config.binance.spot_api_url = server.uri();
        config.coingecko.api_url = server.uri();
        config.screener.proxy_file = "definitely/not/a/proxy.txt".to_string();
        config
    }

    fn coin_details_body(id: &str, symbol: &str, price: f64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "symbol": symbol,
            "name": id,
            "platforms": {"ethereum": "0xabc"},
            "market_data": {
                "current_price": {"usd": price},
                "market_cap": {"usd": 1_000_000_000.0},
                "fully_diluted_valuation": {"usd": 1_100_000_000.0}
            }
        })
    }

    #[tokio::test]
    async fn test_run_enriches_and_sorts_rows() {
        let server = MockServer::start().await;
        mount_exchange_data(&server).await;

        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "pepe", "symbol": "pepe", "name": "Pepe"},
                {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"}
            ])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/coins/pepe"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(coin_details_body("pepe", "pepe", 0.0000123)),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/coins/bitcoin"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(coin_details_body("bitcoin", "btc", 97000.0)),
            )
            .mount(&server)
            .await;

        let screener = Screener::from_config(test_config(&server)).unwrap();
        let rows = screener.run().await.unwrap();

        assert_eq!(rows.len(), 2);
        // Sorted by exchange symbol: digits before letters.
        assert_eq!(rows[0].exchange_symbol, "1000PEPEUSDT");
        assert_eq!(rows[1].exchange_symbol, "BTCUSDT");

        let pepe = &rows[0];
        assert_eq!(pepe.multiplier, 1000);
        assert!((pepe.unit_price_from_futures_usd - 0.0000123).abs() < 1e-12);
        assert_eq!(pepe.onboard_days, -1);
        assert!(pepe.has_spot);
        assert_eq!(pepe.spot_symbol.as_deref(), Some("PEPEUSDT"));
        assert_eq!(pepe.coingecko_id.as_deref(), Some("pepe"));
        assert_eq!(pepe.chain.as_deref(), Some("ethereum"));
        assert_eq!(pepe.match_status, MatchStatus::Matched);

        let btc = &rows[1];
        assert!(btc.onboard_days > 2000);
        assert_eq!(btc.match_status, MatchStatus::Matched);
        assert!(btc.price_diff_pct.unwrap() < 0.01);
    }

    #[tokio::test]
    async fn test_detail_failure_still_emits_row_with_filters() {
        let server = MockServer::start().await;
        mount_exchange_data(&server).await;

        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "pepe", "symbol": "pepe", "name": "Pepe"},
                {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"}
            ])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/coins/bitcoin"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(coin_details_body("bitcoin", "btc", 97000.0)),
            )
            .mount(&server)
            .await;

        // pepe details 404: absorbed per symbol, row still emitted.
        Mock::given(method("GET"))
            .and(path("/coins/pepe"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let mut config = test_config(&server);
        config.filters.min_market_cap_usd = Some(2_000_000_000.0);

        let screener = Screener::from_config(config).unwrap();
        let rows = screener.run().await.unwrap();

        assert_eq!(rows.len(), 2);
        let pepe = &rows[0];
        assert_eq!(pepe.match_status, MatchStatus::CgNotFound);
        assert!(pepe.coingecko_id.is_none());
        assert!(pepe.market_cap_usd.is_none());
        // Null market cap violates the configured minimum.
        assert_eq!(pepe.filter_reason.as_deref(), Some("mcap<2000000000"));

        let btc = &rows[1];
        assert_eq!(btc.filter_reason.as_deref(), Some("mcap<2000000000"));
    }

    #[tokio::test]
    async fn test_shared_coin_fetched_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fapi/v1/exchangeInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbols": [
                    {
                        "symbol": "BTCUSDT",
                        "baseAsset": "BTC",
                        "quoteAsset": "USDT",
                        "contractType": "PERPETUAL",
                        "status": "TRADING"
                    },
                    {
                        "symbol": "1000BTCUSDT",
                        "baseAsset": "1000BTC",
                        "quoteAsset": "USDT",
                        "contractType": "PERPETUAL",
                        "status": "TRADING"
                    }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/ticker/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"symbol": "BTCUSDT", "price": "97000.0"},
                {"symbol": "1000BTCUSDT", "price": "97000000.0"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/exchangeInfo"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"symbols": []})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"}
            ])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/coins/bitcoin"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(coin_details_body("bitcoin", "btc", 97000.0)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let screener = Screener::from_config(test_config(&server)).unwrap();
        let rows = screener.run().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .all(|r| r.coingecko_id.as_deref() == Some("bitcoin")));
    }

    #[tokio::test]
    async fn test_price_beyond_tolerance_flagged() {
        let server = MockServer::start().await;
        mount_exchange_data(&server).await;

        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "pepe", "symbol": "pepe", "name": "Pepe"},
                {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"}
            ])))
            .mount(&server)
            .await;

        // CoinGecko price double the unit price: deviation 0.5 > 0.2.
        Mock::given(method("GET"))
            .and(path("/coins/pepe"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(coin_details_body("pepe", "pepe", 0.0000246)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/coins/bitcoin"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(coin_details_body("bitcoin", "btc", 97000.0)),
            )
            .mount(&server)
            .await;

        let screener = Screener::from_config(test_config(&server)).unwrap();
        let rows = screener.run().await.unwrap();

        let pepe = &rows[0];
        assert_eq!(pepe.match_status, MatchStatus::PriceTooFar);
        assert!(pepe.price_diff_pct.unwrap() > 0.2);
        assert_eq!(pepe.coingecko_price_usd, Some(0.0000246));
    }

    #[tokio::test]
    async fn test_run_fails_when_exchange_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fapi/v1/exchangeInfo"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let screener = Screener::from_config(test_config(&server)).unwrap();
        let result = screener.run().await;
        assert!(result.is_err());
    }
}
