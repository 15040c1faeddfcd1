//! Persistent backend adapter port (§4.4A).
//!
//! The real database is an external collaborator; this crate ships only the
//! trait and an in-memory stand-in ([`crate::infrastructure::persistence::InMemoryBackend`]).

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::market_data::CandleRow;
use crate::domain::order_execution::{ClosedOrder, OpenOrder};
use crate::domain::shared::Money;

/// Which bucket an order mutation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBucket {
    /// The open-orders bucket.
    Open,
    /// The closed-orders bucket.
    Closed,
}

/// Snapshot of trader state as reconstructed from the backend at startup.
#[derive(Debug, Clone, Default)]
pub struct PersistedTraderState {
    /// Open orders known to the backend.
    pub open_orders: Vec<OpenOrder>,
    /// Closed orders known to the backend.
    pub closed_orders: Vec<ClosedOrder>,
    /// Last-persisted budget, if any.
    pub budget: Option<Money>,
}

/// Candle-row history, indexed by timestamp.
pub type HistoryRows = BTreeMap<i64, CandleRow>;

/// Status fields reported to the backend on update.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    /// Current budget, if changed.
    pub budget: Option<Money>,
}

/// Which end of the persisted history to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPosition {
    /// The most recently persisted timestamp.
    Latest,
    /// The earliest persisted timestamp.
    Earliest,
}

/// Errors raised by the backend port.
///
/// Per §7, persistence failures are non-fatal: call sites log and continue,
/// treating the in-memory order book as authoritative.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached or returned an unexpected response.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Driven port for the persistent backend store.
#[async_trait]
pub trait BackendPort: Send + Sync {
    /// Reconstruct trader state (open/closed orders, budget) from the
    /// backend, e.g. on process startup.
    async fn db_sync_trader_state(&self) -> Result<PersistedTraderState, BackendError>;

    /// Mirror an order-book mutation to the backend.
    async fn order_new(&self, order: &OpenOrder, bucket: OrderBucket) -> Result<(), BackendError>;

    /// Mirror an order-book edit to the backend.
    async fn order_edit(&self, order: &OpenOrder) -> Result<(), BackendError>;

    /// Mirror an order-book deletion to the backend.
    async fn order_del(&self, order: &OpenOrder, bucket: OrderBucket) -> Result<(), BackendError>;

    /// Persist candle history rows.
    async fn db_add_history(&self, rows: HistoryRows) -> Result<(), BackendError>;

    /// Persist a status update (e.g. the current budget).
    async fn update_status(&self, status: StatusUpdate) -> Result<(), BackendError>;

    /// Fetch a locally-persisted candle timestamp.
    async fn get_local_candle_timestamp(
        &self,
        position: TimestampPosition,
    ) -> Result<Option<i64>, BackendError>;
}
