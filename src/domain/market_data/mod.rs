//! Market data ingestion primitives: candles, the bounded cache, and the
//! gap-detection/symbol-conversion sync helpers.

mod candle;
mod candle_cache;
mod sync;

pub use candle::{Candle, CandleRow, Ohlcv};
pub use candle_cache::{CandleCache, RacePreventionList, DEFAULT_CACHE_CAP, RACE_PREVENTION_CAP};
pub use sync::{convert_symbol_str, missing_range, symbol_to_exchange_pair};
