//! Symbol-matching primitives: base-asset normalization and relative
//! price deviation.

/// Result of splitting a possibly multiplier-prefixed base asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBase {
    pub base_normalized: String,
    pub multiplier: u64,
}

/// Splits a leveraged-token base asset into its normalized base and
/// multiplier.
///
/// A leading run of ASCII digits followed by an uppercase-letter-led
/// remainder yields the digit run as multiplier and the remainder as the
/// base ("1000PEPE" becomes PEPE x1000). Anything else passes through
/// unchanged with multiplier 1. Total function, never fails.
#[must_use]
pub fn parse_base_asset(base_asset: &str) -> ParsedBase {
    let digits_end = base_asset
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(base_asset.len());

    if digits_end > 0 && digits_end < base_asset.len() {
        let rest = &base_asset[digits_end..];
        if rest.starts_with(|c: char| c.is_ascii_uppercase()) {
            if let Ok(multiplier) = base_asset[..digits_end].parse::<u64>() {
                return ParsedBase {
                    base_normalized: rest.to_string(),
                    multiplier,
                };
            }
        }
    }

    ParsedBase {
        base_normalized: base_asset.to_string(),
        multiplier: 1,
    }
}

/// Relative price deviation `|a - b| / |b|`.
///
/// Returns positive infinity when either input is non-finite or `b` is
/// zero, so degenerate quotes never satisfy a tolerance check.
#[must_use]
pub fn compute_price_diff_pct(a: f64, b: f64) -> f64 {
    if !a.is_finite() || !b.is_finite() || b == 0.0 {
        return f64::INFINITY;
    }
    (a - b).abs() / b.abs()
}
