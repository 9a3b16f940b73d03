//! Snapshot sink: CSV serialization, file output, and the in-memory
//! latest-snapshot store served over HTTP.

use crate::row::OutputRow;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::Writer;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Fixed CSV column order.
pub const CSV_COLUMNS: [&str; 20] = [
    "binance_symbol",
    "base_asset",
    "multiplier",
    "futures_price_usd",
    "unit_price_from_futures_usd",
    "perp_onboard_days",
    "has_spot_usdt",
    "spot_symbol",
    "spot_price_usd",
    "coingecko_id",
    "coingecko_symbol",
    "coingecko_name",
    "coingecko_price_usd",
    "price_diff_pct",
    "market_cap_usd",
    "fdv_usd",
    "chain",
    "contract",
    "match_status",
    "filter_reason",
];

/// Serializes rows to CSV text with the fixed header.
///
/// Null fields serialize as empty strings, floats via default formatting,
/// booleans as `true`/`false`.
///
/// # Errors
/// Returns an error if CSV serialization fails.
pub fn rows_to_csv(rows: &[OutputRow]) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());

    writer
        .write_record(CSV_COLUMNS)
        .context("Failed to write CSV header")?;

    for row in rows {
        writer
            .write_record(&[
                row.exchange_symbol.clone(),
                row.base_asset.clone(),
                row.multiplier.to_string(),
                row.futures_price_usd.to_string(),
                row.unit_price_from_futures_usd.to_string(),
                row.onboard_days.to_string(),
                row.has_spot.to_string(),
                opt_str(row.spot_symbol.as_deref()),
                opt_f64(row.spot_price_usd),
                opt_str(row.coingecko_id.as_deref()),
                opt_str(row.coingecko_symbol.as_deref()),
                opt_str(row.coingecko_name.as_deref()),
                opt_f64(row.coingecko_price_usd),
                opt_f64(row.price_diff_pct),
                opt_f64(row.market_cap_usd),
                opt_f64(row.fdv_usd),
                opt_str(row.chain.as_deref()),
                opt_str(row.contract.as_deref()),
                row.match_status.as_str().to_string(),
                opt_str(row.filter_reason.as_deref()),
            ])
            .with_context(|| format!("Failed to write CSV row for {}", row.exchange_symbol))?;
    }

    let bytes = writer
        .into_inner()
        .context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

fn opt_str(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn opt_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes CSV text to a timestamped file under `output_dir`, creating
/// the directory if absent. Returns the written path.
///
/// # Errors
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn write_csv_file(csv_text: &str, output_dir: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {output_dir}"))?;

    let filename = format!(
        "perp_screener_{}.csv",
        Utc::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let path = Path::new(output_dir).join(filename);

    std::fs::write(&path, csv_text)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;

    Ok(path)
}

/// One completed run's output.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub csv_text: String,
    pub row_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Holds the latest snapshot; each run replaces it wholesale.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    latest: RwLock<Option<Snapshot>>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, csv_text: String, row_count: usize) {
        let snapshot = Snapshot {
            csv_text,
            row_count,
            updated_at: Utc::now(),
        };
        *self.latest.write().await = Some(snapshot);
    }

    pub async fn latest(&self) -> Option<Snapshot> {
        self.latest.read().await.clone()
    }

    pub async fn exists(&self) -> bool {
        self.latest.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::MatchStatus;

    fn matched_row() -> OutputRow {
        OutputRow {
            exchange_symbol: "1000PEPEUSDT".to_string(),
            base_asset: "1000PEPE".to_string(),
            multiplier: 1000,
            futures_price_usd: 0.0123,
            unit_price_from_futures_usd: 0.0000123,
            onboard_days: 120,
            has_spot: true,
            spot_symbol: Some("PEPEUSDT".to_string()),
            spot_price_usd: Some(0.0000122),
            coingecko_id: Some("pepe".to_string()),
            coingecko_symbol: Some("pepe".to_string()),
            coingecko_name: Some("Pepe".to_string()),
            coingecko_price_usd: Some(0.0000121),
            price_diff_pct: Some(0.016),
            market_cap_usd: Some(5.1e9),
            fdv_usd: Some(5.2e9),
            chain: Some("ethereum".to_string()),
            contract: Some("0x6982".to_string()),
            match_status: MatchStatus::Matched,
            filter_reason: None,
        }
    }

    fn unmatched_row() -> OutputRow {
        OutputRow {
            exchange_symbol: "OBSCUREUSDT".to_string(),
            base_asset: "OBSCURE".to_string(),
            multiplier: 1,
            futures_price_usd: 2.5,
            unit_price_from_futures_usd: 2.5,
            onboard_days: -1,
            has_spot: false,
            spot_symbol: None,
            spot_price_usd: None,
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
            filter_reason: Some("mcap<1000000".to_string()),
        }
    }

    // ==================== CSV Serialization Tests ====================

    #[test]
    fn test_header_row_order() {
        let csv = rows_to_csv(&[]).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(
            header,
            "binance_symbol,base_asset,multiplier,futures_price_usd,\
             unit_price_from_futures_usd,perp_onboard_days,has_spot_usdt,\
             spot_symbol,spot_price_usd,coingecko_id,coingecko_symbol,\
             coingecko_name,coingecko_price_usd,price_diff_pct,\
             market_cap_usd,fdv_usd,chain,contract,match_status,filter_reason"
        );
    }

    #[test]
    fn test_matched_row_serialization() {
        let csv = rows_to_csv(&[matched_row()]).unwrap();
        let line = csv.lines().nth(1).unwrap();
        assert!(line.starts_with("1000PEPEUSDT,1000PEPE,1000,"));
        assert!(line.contains(",true,PEPEUSDT,"));
        assert!(line.contains(",matched,"));
        assert!(line.ends_with("matched,"));
    }

    #[test]
    fn test_null_fields_serialize_empty() {
        let csv = rows_to_csv(&[unmatched_row()]).unwrap();
        let line = csv.lines().nth(1).unwrap();
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), CSV_COLUMNS.len());
        // spot_symbol through contract are all empty.
        assert_eq!(fields[7], "");
        assert_eq!(fields[9], "");
        assert_eq!(fields[16], "");
        assert_eq!(fields[17], "");
        assert_eq!(fields[18], "cg_not_found");
        assert_eq!(fields[19], "mcap<1000000");
    }

    #[test]
    fn test_write_csv_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("nested").join("output");
        let csv = rows_to_csv(&[matched_row()]).unwrap();

        let path = write_csv_file(&csv, output_dir.to_str().unwrap()).unwrap();

        assert!(path.exists());
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("binance_symbol,"));
        assert!(contents.contains("1000PEPEUSDT"));
    }

    // ==================== Snapshot Store Tests ====================

    #[tokio::test]
    async fn test_store_starts_empty() {
        let store = SnapshotStore::new();
        assert!(!store.exists().await);
        assert!(store.latest().await.is_none());
    }

    #[tokio::test]
    async fn test_replace_swaps_snapshot_wholesale() {
        let store = SnapshotStore::new();

        store.replace("header\nrow1\n".to_string(), 1).await;
        let first = store.latest().await.unwrap();
        assert_eq!(first.row_count, 1);

        store.replace("header\nrow1\nrow2\n".to_string(), 2).await;
        let second = store.latest().await.unwrap();
        assert_eq!(second.row_count, 2);
        assert!(second.updated_at >= first.updated_at);
        assert!(second.csv_text.contains("row2"));
    }
}
