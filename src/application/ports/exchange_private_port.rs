//! Private exchange WebSocket port (account/order stream).

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::shared::{ExchangeOrderId, GroupId, Symbol};

/// Raw order-confirmed event (§6: order acknowledged, not yet settled).
#[derive(Debug, Clone)]
pub struct OrderConfirmedEvent {
    /// Exchange-assigned order id.
    pub id: ExchangeOrderId,
    /// Client-assigned group id.
    pub gid: GroupId,
    /// Asset traded.
    pub symbol: Symbol,
    /// Signed original order amount: positive for buy, negative for sell.
    pub amount_orig: Decimal,
}

/// Raw order-closed event (§6: order fully or partially settled/cancelled).
#[derive(Debug, Clone)]
pub struct OrderClosedEvent {
    /// Exchange-assigned order id.
    pub id: ExchangeOrderId,
    /// Client-assigned group id.
    pub gid: GroupId,
    /// Asset traded.
    pub symbol: Symbol,
    /// Signed original order amount: positive for buy, negative for sell.
    pub amount_orig: Decimal,
    /// Signed filled amount.
    pub amount_filled: Decimal,
    /// Average fill price.
    pub price_avg: Decimal,
    /// Exchange-side settlement timestamp, in milliseconds.
    pub mts_update: i64,
}

/// One currency's wallet balance (§4.6A).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalletEntry {
    /// Total balance.
    pub balance: Decimal,
    /// Balance available for new orders, if reported separately.
    pub balance_available: Option<Decimal>,
}

/// A private-channel event as delivered by the exchange stream.
#[derive(Debug, Clone)]
pub enum PrivateEvent {
    /// Full wallet snapshot, keyed by currency.
    WalletSnapshot(Vec<(Symbol, WalletEntry)>),
    /// Single-currency wallet update.
    WalletUpdate {
        /// Currency updated.
        currency: Symbol,
        /// New entry for that currency.
        entry: WalletEntry,
    },
    /// An order was acknowledged by the exchange.
    OrderConfirmed(OrderConfirmedEvent),
    /// An order settled (filled or cancelled).
    OrderClosed(OrderClosedEvent),
}

/// Errors raised by the private exchange port.
#[derive(Debug, Error)]
pub enum ExchangePrivateError {
    /// The connection dropped or failed to establish.
    #[error("private exchange connection error: {0}")]
    Connection(String),
}

/// Driven port for the private (account/order) exchange WebSocket channel.
#[async_trait]
pub trait ExchangePrivatePort: Send + Sync {
    /// Receive the next private-channel event, blocking until one arrives.
    async fn next_event(&self) -> Result<PrivateEvent, ExchangePrivateError>;
}
