//! In-memory stand-in for the persistent backend (§4.4A).
//!
//! The real database lives outside this crate. This adapter never fails:
//! every method returns `Ok`, matching the "in-memory order book is
//! authoritative, backend persistence is best-effort" invariant from §7.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::application::ports::{
    BackendError, BackendPort, HistoryRows, OrderBucket, PersistedTraderState, StatusUpdate,
    TimestampPosition,
};
use crate::domain::order_execution::{ClosedOrder, OpenOrder};
use crate::domain::shared::Money;

/// A [`BackendPort`] backed by process memory, for tests, simulation runs,
/// and local development without a real database.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    open: RwLock<Vec<OpenOrder>>,
    closed: RwLock<Vec<ClosedOrder>>,
    budget: RwLock<Option<Money>>,
    history: RwLock<BTreeMap<i64, crate::domain::market_data::CandleRow>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackendPort for InMemoryBackend {
    async fn db_sync_trader_state(&self) -> Result<PersistedTraderState, BackendError> {
        Ok(PersistedTraderState {
            open_orders: self.open.read().clone(),
            closed_orders: self.closed.read().clone(),
            budget: *self.budget.read(),
        })
    }

    async fn order_new(&self, order: &OpenOrder, bucket: OrderBucket) -> Result<(), BackendError> {
        match bucket {
            OrderBucket::Open => self.open.write().push(order.clone()),
            OrderBucket::Closed => {}
        }
        Ok(())
    }

    async fn order_edit(&self, order: &OpenOrder) -> Result<(), BackendError> {
        let mut open = self.open.write();
        if let Some(slot) = open.iter_mut().find(|o| o.buy_order_id == order.buy_order_id) {
            *slot = order.clone();
        }
        Ok(())
    }

    async fn order_del(&self, order: &OpenOrder, bucket: OrderBucket) -> Result<(), BackendError> {
        match bucket {
            OrderBucket::Open => {
                self.open.write().retain(|o| o.asset != order.asset);
            }
            OrderBucket::Closed => {}
        }
        Ok(())
    }

    async fn db_add_history(&self, rows: HistoryRows) -> Result<(), BackendError> {
        self.history.write().extend(rows);
        Ok(())
    }

    async fn update_status(&self, status: StatusUpdate) -> Result<(), BackendError> {
        if let Some(budget) = status.budget {
            *self.budget.write() = Some(budget);
        }
        Ok(())
    }

    async fn get_local_candle_timestamp(
        &self,
        position: TimestampPosition,
    ) -> Result<Option<i64>, BackendError> {
        let history = self.history.read();
        Ok(match position {
            TimestampPosition::Latest => history.keys().next_back().copied(),
            TimestampPosition::Earliest => history.keys().next().copied(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::{ExchangeOrderId, GroupId, Symbol, Timestamp};
    use rust_decimal_macros::dec;

    fn sample_order(asset: &str) -> OpenOrder {
        OpenOrder {
            asset: Symbol::new(asset),
            buy_order_id: ExchangeOrderId::new("1"),
            gid: GroupId::generate(),
            sell_order_id: None,
            price_buy: Money::new(dec!(100)),
            price_profit: Money::new(dec!(110)),
            buy_volume_fiat: Money::new(dec!(100)),
            buy_volume_crypto: 1.0,
            fee_buy_fiat: Money::new(dec!(0.2)),
            timestamp_buy: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn order_new_then_sync_round_trips() {
        let backend = InMemoryBackend::new();
        backend.order_new(&sample_order("BTC"), OrderBucket::Open).await.unwrap();
        let state = backend.db_sync_trader_state().await.unwrap();
        assert_eq!(state.open_orders.len(), 1);
    }

    #[tokio::test]
    async fn order_del_removes_by_asset_not_buy_order_id() {
        let backend = InMemoryBackend::new();
        let order = sample_order("BTC");
        backend.order_new(&order, OrderBucket::Open).await.unwrap();
        backend.order_del(&order, OrderBucket::Open).await.unwrap();
        let state = backend.db_sync_trader_state().await.unwrap();
        assert!(state.open_orders.is_empty());
    }

    #[tokio::test]
    async fn update_status_persists_budget() {
        let backend = InMemoryBackend::new();
        backend
            .update_status(StatusUpdate { budget: Some(Money::new(dec!(500))) })
            .await
            .unwrap();
        let state = backend.db_sync_trader_state().await.unwrap();
        assert_eq!(state.budget, Some(Money::new(dec!(500))));
    }

    #[tokio::test]
    async fn get_local_candle_timestamp_reports_latest_and_earliest() {
        let backend = InMemoryBackend::new();
        backend.db_add_history(BTreeMap::from([(10, BTreeMap::new()), (20, BTreeMap::new())])).await.unwrap();
        assert_eq!(
            backend.get_local_candle_timestamp(TimestampPosition::Latest).await.unwrap(),
            Some(20)
        );
        assert_eq!(
            backend.get_local_candle_timestamp(TimestampPosition::Earliest).await.unwrap(),
            Some(10)
        );
    }
}
