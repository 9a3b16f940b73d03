//! Row-level filter evaluation.
//!
//! Filters never drop rows; they annotate them with the tags of every
//! threshold they violate so consumers can decide what to hide.

use perp_screener_core::FilterConfig;

/// Returns the tags of all violated filters, in evaluation order:
/// min onboard, max onboard, min mcap, max mcap, min fdv, max fdv.
///
/// Onboard filters only apply when `onboard_days` is known (≥ 0). A null
/// market cap or FDV violates both the min and max filter for that field
/// when configured.
#[must_use]
pub fn violated_filter_tags(
    filters: &FilterConfig,
    onboard_days: i64,
    market_cap_usd: Option<f64>,
    fdv_usd: Option<f64>,
) -> Vec<String> {
    let mut tags = Vec::new();

    if onboard_days >= 0 {
        if let Some(min) = filters.min_onboard_days {
            if onboard_days < min {
                tags.push(format!("onboard<{min}"));
            }
        }
        if let Some(max) = filters.max_onboard_days {
            if onboard_days > max {
                tags.push(format!("onboard>{max}"));
            }
        }
    }

    if let Some(min) = filters.min_market_cap_usd {
        if market_cap_usd.map_or(true, |v| v < min) {
            tags.push(format!("mcap<{min}"));
        }
    }
    if let Some(max) = filters.max_market_cap_usd {
        if market_cap_usd.map_or(true, |v| v > max) {
            tags.push(format!("mcap>{max}"));
        }
    }

    if let Some(min) = filters.min_fdv_usd {
        if fdv_usd.map_or(true, |v| v < min) {
            tags.push(format!("fdv<{min}"));
        }
    }
    if let Some(max) = filters.max_fdv_usd {
        if fdv_usd.map_or(true, |v| v > max) {
            tags.push(format!("fdv>{max}"));
        }
    }

    tags
}

/// Joins tags into the `filter_reason` field; empty tag sets become None.
#[must_use]
pub fn join_filter_reason(tags: Vec<String>) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(
        min_mcap: Option<f64>,
        max_mcap: Option<f64>,
        min_fdv: Option<f64>,
        max_fdv: Option<f64>,
        min_onboard: Option<i64>,
        max_onboard: Option<i64>,
    ) -> FilterConfig {
        FilterConfig {
            min_market_cap_usd: min_mcap,
            max_market_cap_usd: max_mcap,
            min_fdv_usd: min_fdv,
            max_fdv_usd: max_fdv,
            min_onboard_days: min_onboard,
            max_onboard_days: max_onboard,
        }
    }

    #[test]
    fn test_no_filters_configured_yields_no_tags() {
        let tags = violated_filter_tags(&FilterConfig::default(), 10, Some(1e9), Some(2e9));
        assert!(tags.is_empty());
        assert_eq!(join_filter_reason(tags), None);
    }

    #[test]
    fn test_passing_row_yields_no_tags() {
        let f = filters(Some(1e6), Some(1e12), None, None, Some(5), Some(5000));
        let tags = violated_filter_tags(&f, 30, Some(1e9), None);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_tags_accumulate_in_evaluation_order() {
        let f = filters(Some(1e9), None, Some(2e9), None, Some(30), None);
        let tags = violated_filter_tags(&f, 7, Some(1e6), Some(1e6));
        assert_eq!(tags, vec!["onboard<30", "mcap<1000000000", "fdv<2000000000"]);
        assert_eq!(
            join_filter_reason(tags).unwrap(),
            "onboard<30;mcap<1000000000;fdv<2000000000"
        );
    }

    #[test]
    fn test_null_mcap_violates_both_bounds() {
        let f = filters(Some(1e6), Some(1e12), None, None, None, None);
        let tags = violated_filter_tags(&f, -1, None, None);
        assert_eq!(tags, vec!["mcap<1000000", "mcap>1000000000000"]);
    }

    #[test]
    fn test_null_fdv_violates_both_bounds() {
        let f = filters(None, None, Some(5e8), Some(5e10), None, None);
        let tags = violated_filter_tags(&f, -1, None, None);
        assert_eq!(tags, vec!["fdv<500000000", "fdv>50000000000"]);
    }

    #[test]
    fn test_onboard_filters_skipped_when_unknown() {
        let f = filters(None, None, None, None, Some(30), Some(365));
        let tags = violated_filter_tags(&f, -1, None, None);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_max_onboard_violation() {
        let f = filters(None, None, None, None, None, Some(365));
        let tags = violated_filter_tags(&f, 400, None, None);
        assert_eq!(tags, vec!["onboard>365"]);
    }
}
