//! Gap detection and the exchange-symbol boundary conversion.

use crate::domain::shared::Symbol;

/// Returns every interval-aligned timestamp strictly between `start_ms` and
/// `end_ms` (exclusive of both ends) that is not yet covered, i.e. the set
/// of candle boundaries a history-patch request must backfill.
///
/// `interval_ms` must be positive; a non-positive interval yields an empty
/// result rather than looping forever.
#[must_use]
pub fn missing_range(start_ms: i64, end_ms: i64, interval_ms: i64) -> Vec<i64> {
    if interval_ms <= 0 || end_ms <= start_ms {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut ts = start_ms + interval_ms;
    while ts < end_ms {
        out.push(ts);
        ts += interval_ms;
    }
    out
}

/// Converts a bare internal [`Symbol`] (e.g. `"BTC"`) to the exchange's
/// prefixed trading-pair form (e.g. `"tBTCUSD"`), and back.
///
/// The exchange wire format is the only place this prefix/suffix convention
/// exists; everywhere else in the domain a bare ticker is used.
#[must_use]
pub fn symbol_to_exchange_pair(symbol: &Symbol, quote: &str) -> String {
    format!("t{}{}", symbol.as_str(), quote.to_uppercase())
}

/// Parses an exchange trading-pair string (e.g. `"tBTCUSD"`) back to the
/// bare internal [`Symbol`] and quote currency, stripping the leading `t`
/// and the trailing quote suffix.
///
/// # Errors
///
/// Returns `None` if `pair` is shorter than the quote suffix plus the `t`
/// prefix, or doesn't carry the expected prefix.
#[must_use]
pub fn convert_symbol_str(pair: &str, quote: &str) -> Option<Symbol> {
    let rest = pair.strip_prefix('t')?;
    let base = rest.strip_suffix(&quote.to_uppercase())?;
    if base.is_empty() {
        return None;
    }
    Some(Symbol::new(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_missing_range_fills_interior_boundaries() {
        assert_eq!(missing_range(1000, 1020, 5), vec![1005, 1010, 1015]);
    }

    #[test]
    fn missing_range_adjacent_start_end_is_empty() {
        assert_eq!(missing_range(1000, 1005, 5), Vec::<i64>::new());
    }

    #[test]
    fn missing_range_end_before_start_is_empty() {
        assert_eq!(missing_range(1020, 1000, 5), Vec::<i64>::new());
    }

    #[test]
    fn missing_range_non_positive_interval_is_empty() {
        assert_eq!(missing_range(1000, 1020, 0), Vec::<i64>::new());
        assert_eq!(missing_range(1000, 1020, -5), Vec::<i64>::new());
    }

    #[test]
    fn symbol_to_exchange_pair_roundtrip() {
        let symbol = Symbol::new("BTC");
        let pair = symbol_to_exchange_pair(&symbol, "usd");
        assert_eq!(pair, "tBTCUSD");
        assert_eq!(convert_symbol_str(&pair, "usd"), Some(symbol));
    }

    #[test]
    fn convert_symbol_str_rejects_missing_prefix() {
        assert_eq!(convert_symbol_str("BTCUSD", "usd"), None);
    }

    #[test]
    fn convert_symbol_str_rejects_empty_base() {
        assert_eq!(convert_symbol_str("tUSD", "usd"), None);
    }
}
