//! REST-based exchange port: order submission and history/metadata lookups.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::shared::{ExchangeOrderId, GroupId, Side, Symbol};

/// Parameters for a single order submission (§6).
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Asset to trade.
    pub asset: Symbol,
    /// Limit price.
    pub price: Decimal,
    /// Signed amount: the sign must already encode buy/sell per `side`.
    pub amount: Decimal,
    /// Client-assigned group id linking this order to its counterpart.
    pub gid: GroupId,
}

/// An entry from the exchange's order-history endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeOrderRecord {
    /// Exchange-assigned order id.
    pub id: ExchangeOrderId,
    /// Group id, if the exchange reports it.
    pub gid: Option<GroupId>,
    /// Asset traded.
    pub symbol: Symbol,
    /// True if the order is in a terminal, filled state.
    pub executed: bool,
    /// Average fill price, if filled.
    pub price_avg: Option<Decimal>,
    /// Filled amount, if filled.
    pub amount_filled: Option<Decimal>,
}

/// Errors raised by the REST exchange port.
///
/// Network/decode failures surface here (§6B); the adapter never retries
/// automatically — any retry happens at the next tick via normal decision
/// logic.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The request could not be sent or the response could not be parsed.
    #[error("exchange request failed: {0}")]
    Transport(String),

    /// The exchange rejected the request.
    #[error("exchange rejected order: {0}")]
    Rejected(String),
}

/// Driven port for the exchange's REST surface.
#[async_trait]
pub trait ExchangeRestPort: Send + Sync {
    /// Submit an order.
    async fn order(&self, side: Side, request: OrderRequest) -> Result<(), ExchangeError>;

    /// Fetch the full order history known to the exchange.
    async fn get_order_history(&self) -> Result<Vec<ExchangeOrderRecord>, ExchangeError>;

    /// Fetch the minimum order size for every known symbol.
    async fn get_min_order_sizes(&self) -> Result<HashMap<Symbol, Decimal>, ExchangeError>;

    /// Fetch the latest remote candle timestamp, offset back by
    /// `minus_delta` milliseconds.
    async fn get_latest_remote_candle_timestamp(
        &self,
        minus_delta_ms: i64,
    ) -> Result<i64, ExchangeError>;
}
