//! Candidate selection and chain/contract resolution.

use crate::models::CoinCandidate;
use std::collections::BTreeMap;

/// Picks the best CoinGecko candidate for an exchange base symbol.
///
/// Candidates whose symbol matches `base_symbol` case-insensitively are
/// preferred; with no exact match the full list is considered. Within the
/// pool the smallest market cap rank wins, unranked candidates lose to
/// any ranked one, and rank ties resolve to the earliest candidate in
/// input order. Returns None only for an empty pool.
#[must_use]
pub fn pick_best_coin_candidate<'a>(
    base_symbol: &str,
    candidates: &'a [CoinCandidate],
) -> Option<&'a CoinCandidate> {
    let exact: Vec<&CoinCandidate> = candidates
        .iter()
        .filter(|c| c.symbol.eq_ignore_ascii_case(base_symbol))
        .collect();

    let pool: Vec<&CoinCandidate> = if exact.is_empty() {
        candidates.iter().collect()
    } else {
        exact
    };

    pool.into_iter()
        .enumerate()
        .min_by_key(|(index, c)| (c.market_cap_rank.unwrap_or(u32::MAX), *index))
        .map(|(_, c)| c)
}

/// Resolves the preferred chain and contract address from a platforms map.
///
/// Walks `priority` in order and returns the first chain with a non-empty
/// trimmed address. When no priority chain matches, falls back to the
/// first non-empty entry in map iteration order. An empty map yields
/// `(None, None)`.
#[must_use]
pub fn pick_chain_and_contract(
    platforms: &BTreeMap<String, Option<String>>,
    priority: &[String],
) -> (Option<String>, Option<String>) {
    for chain in priority {
        if let Some(Some(address)) = platforms.get(chain) {
            let trimmed = address.trim();
            if !trimmed.is_empty() {
                return (Some(chain.clone()), Some(trimmed.to_string()));
            }
        }
    }

    for (chain, address) in platforms {
        if let Some(address) = address {
            let trimmed = address.trim();
            if !trimmed.is_empty() {
                return (Some(chain.clone()), Some(trimmed.to_string()));
            }
        }
    }

    (None, None)
}
