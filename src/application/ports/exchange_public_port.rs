//! Public exchange WebSocket port (market-data stream).

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::market_data::Ohlcv;
use crate::domain::shared::Symbol;

/// A single backfilled candle, scoped to one asset (§4.3).
#[derive(Debug, Clone)]
pub struct HistoricalCandle {
    /// Candle-aligned timestamp, in milliseconds.
    pub timestamp_ms: i64,
    /// Asset the candle is for.
    pub symbol: Symbol,
    /// OHLCV fields.
    pub ohlcv: Ohlcv,
}

/// A public-channel event as delivered by the exchange stream (§6).
#[derive(Debug, Clone)]
pub enum PublicEvent {
    /// Stream connected; subscriptions may now be sent.
    Connected,
    /// A completed (or in-progress) candle for `symbol` at `timestamp_ms`.
    NewCandle {
        /// Candle-aligned timestamp, in milliseconds.
        timestamp_ms: i64,
        /// Asset the candle is for.
        symbol: Symbol,
        /// OHLCV fields.
        ohlcv: Ohlcv,
    },
    /// Subscription to `symbol` confirmed.
    Subscribed {
        /// Asset that is now subscribed.
        symbol: Symbol,
    },
    /// Subscription to `symbol` dropped.
    Unsubscribed {
        /// Asset whose subscription dropped.
        symbol: Symbol,
    },
    /// Stream-level error for `symbol`, if scoped to one.
    Error {
        /// Asset the error applies to, if any.
        symbol: Option<Symbol>,
        /// Error message from the exchange.
        message: String,
    },
    /// Generic status update from the exchange.
    StatusUpdate {
        /// Free-form status payload.
        message: String,
    },
}

/// Errors raised by the public exchange port.
#[derive(Debug, Error)]
pub enum ExchangePublicError {
    /// The connection dropped or failed to establish.
    #[error("public exchange connection error: {0}")]
    Connection(String),

    /// A subscribe request failed.
    #[error("subscribe failed for {symbol}: {message}")]
    SubscribeFailed {
        /// Asset the subscription was for.
        symbol: Symbol,
        /// Exchange-provided reason.
        message: String,
    },
}

/// Driven port for the public (market-data) exchange WebSocket channel.
#[async_trait]
pub trait ExchangePublicPort: Send + Sync {
    /// Subscribe to candle updates for `symbol` at the configured interval.
    async fn subscribe_candles(&self, symbol: &Symbol) -> Result<(), ExchangePublicError>;

    /// Receive the next public-channel event, blocking until one arrives.
    async fn next_event(&self) -> Result<PublicEvent, ExchangePublicError>;

    /// Backfill historic candles over `[start_ms, end_ms]` for every
    /// configured asset (§4.3 sync-detector history patch).
    async fn request_history(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<HistoricalCandle>, ExchangePublicError>;
}
