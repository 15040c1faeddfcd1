//! Candle (OHLCV) value type and the per-timestamp candle-row.

use std::collections::BTreeMap;

use crate::domain::shared::Symbol;

/// Open/high/low/close/volume for one asset over one fixed-duration interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlcv {
    /// Opening price.
    pub open: f64,
    /// Highest price in the interval.
    pub high: f64,
    /// Lowest price in the interval.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
}

/// A single candle: OHLCV for one asset at one integer-millisecond,
/// interval-aligned timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    /// Timestamp in milliseconds, aligned to the configured candle interval.
    pub timestamp_ms: i64,
    /// OHLCV fields.
    pub ohlcv: Ohlcv,
}

/// The mapping from asset symbol to its OHLCV tuple at one timestamp.
///
/// `BTreeMap` keeps iteration deterministic (asset-name order), which the
/// simulator's row-index-ascending determinism requirement depends on when a
/// candle-row is flattened into a price-matrix row.
pub type CandleRow = BTreeMap<Symbol, Ohlcv>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_row_orders_by_symbol() {
        let mut row: CandleRow = CandleRow::new();
        row.insert(
            Symbol::new("ETH"),
            Ohlcv {
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
            },
        );
        row.insert(
            Symbol::new("BTC"),
            Ohlcv {
                open: 2.0,
                high: 2.0,
                low: 2.0,
                close: 2.0,
                volume: 2.0,
            },
        );
        let keys: Vec<_> = row.keys().map(Symbol::as_str).collect();
        assert_eq!(keys, vec!["BTC", "ETH"]);
    }
}
