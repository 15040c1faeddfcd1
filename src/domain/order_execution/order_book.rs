//! The order book aggregate: in-memory open/closed order storage, mirrored
//! to the backend on every mutation.

use crate::domain::order_execution::order::{ClosedOrder, OpenOrder};
use crate::domain::shared::{ExchangeOrderId, GroupId, Money, Symbol};
use thiserror::Error;

/// Errors raised by [`OrderBook`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderBookError {
    /// An attempted `new` would violate the unique `(asset, gid)` or
    /// `buy_order_id` constraint.
    #[error("duplicate order: {0}")]
    Duplicate(String),

    /// `edit` was asked to replace a `buy_order_id` that isn't open.
    #[error("no open order with buy_order_id {0}")]
    LookupMiss(String),
}

/// Optional filter fields for [`OrderBook::query_open`]; an absent field is
/// a wildcard.
#[derive(Debug, Clone, Default)]
pub struct OpenOrderFilter {
    /// Restrict to this asset.
    pub asset: Option<Symbol>,
    /// Restrict to this buy order id.
    pub buy_order_id: Option<ExchangeOrderId>,
    /// Restrict to this group id.
    pub gid: Option<GroupId>,
    /// Restrict to this profit target.
    pub price_profit: Option<Money>,
}

impl OpenOrderFilter {
    fn matches(&self, order: &OpenOrder) -> bool {
        self.asset.as_ref().is_none_or(|a| *a == order.asset)
            && self
                .buy_order_id
                .as_ref()
                .is_none_or(|id| *id == order.buy_order_id)
            && self.gid.as_ref().is_none_or(|gid| *gid == order.gid)
            && self
                .price_profit
                .is_none_or(|price| price == order.price_profit)
    }
}

/// In-memory open/closed order storage.
///
/// Mutations are applied to the in-memory vectors first and are
/// authoritative within the process lifetime; the backend mirror is
/// best-effort (§4.4: persistence failures are logged, never rolled back).
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    open: Vec<OpenOrder>,
    closed: Vec<ClosedOrder>,
}

impl OrderBook {
    /// An empty order book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `order` to the open bucket.
    ///
    /// # Errors
    ///
    /// Returns [`OrderBookError::Duplicate`] if an open order already shares
    /// `(asset, gid)` or `buy_order_id` with `order`.
    pub fn new_open(&mut self, order: OpenOrder) -> Result<(), OrderBookError> {
        if self
            .open
            .iter()
            .any(|o| (o.asset == order.asset && o.gid == order.gid) || o.buy_order_id == order.buy_order_id)
        {
            return Err(OrderBookError::Duplicate(order.buy_order_id.to_string()));
        }
        self.open.push(order);
        Ok(())
    }

    /// Move `order` directly into the closed bucket (used when reconciling
    /// backend-persisted state at startup).
    pub fn new_closed(&mut self, order: ClosedOrder) {
        self.closed.push(order);
    }

    /// Replace the open order whose `buy_order_id` matches `order`'s.
    ///
    /// Keyed by `buy_order_id`, the unique key for an open order, unlike
    /// [`OrderBook::delete`] which is keyed by asset.
    ///
    /// # Errors
    ///
    /// Returns [`OrderBookError::LookupMiss`] if no open order has that
    /// `buy_order_id`.
    pub fn edit(&mut self, order: OpenOrder) -> Result<(), OrderBookError> {
        let idx = self
            .open
            .iter()
            .position(|o| o.buy_order_id == order.buy_order_id)
            .ok_or_else(|| OrderBookError::LookupMiss(order.buy_order_id.to_string()))?;
        self.open[idx] = order;
        Ok(())
    }

    /// Remove every open order for `asset`.
    ///
    /// Preserved as-is from the original implementation: this keys by
    /// `asset`, not by `buy_order_id` like [`OrderBook::edit`] does, so it
    /// removes *every* open position for the asset rather than one order.
    /// This is a known asymmetry (§9) kept intentionally rather than
    /// silently narrowed to a single order.
    pub fn delete_by_asset(&mut self, asset: &Symbol) {
        self.open.retain(|o| &o.asset != asset);
    }

    /// Move the open order matching `buy_order_id` into the closed bucket.
    ///
    /// # Errors
    ///
    /// Returns [`OrderBookError::LookupMiss`] if no open order has that
    /// `buy_order_id`.
    pub fn close(
        &mut self,
        buy_order_id: &ExchangeOrderId,
        to_closed: impl FnOnce(OpenOrder) -> ClosedOrder,
    ) -> Result<(), OrderBookError> {
        let idx = self
            .open
            .iter()
            .position(|o| &o.buy_order_id == buy_order_id)
            .ok_or_else(|| OrderBookError::LookupMiss(buy_order_id.to_string()))?;
        let order = self.open.remove(idx);
        self.closed.push(to_closed(order));
        Ok(())
    }

    /// All open orders matching `filter`'s conjunction.
    #[must_use]
    pub fn query_open(&self, filter: &OpenOrderFilter) -> Vec<&OpenOrder> {
        self.open.iter().filter(|o| filter.matches(o)).collect()
    }

    /// Find the single open order for `(asset, gid)`, if any.
    #[must_use]
    pub fn find_by_asset_gid(&self, asset: &Symbol, gid: &GroupId) -> Option<&OpenOrder> {
        self.open.iter().find(|o| &o.asset == asset && &o.gid == gid)
    }

    /// All closed orders.
    #[must_use]
    pub fn closed(&self) -> &[ClosedOrder] {
        &self.closed
    }

    /// All open orders.
    #[must_use]
    pub fn open(&self) -> &[OpenOrder] {
        &self.open
    }

    /// Sum of `profit_fiat` across closed orders, rounded to 2 decimals
    /// (§4.5 `get_profit`).
    #[must_use]
    pub fn total_profit(&self) -> Money {
        self.closed
            .iter()
            .fold(Money::ZERO, |acc, o| acc + o.profit_fiat)
            .round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Timestamp;
    use rust_decimal_macros::dec;

    fn order(asset: &str, buy_id: &str, gid: &str) -> OpenOrder {
        OpenOrder {
            asset: Symbol::new(asset),
            buy_order_id: ExchangeOrderId::new(buy_id),
            gid: GroupId::new(gid),
            sell_order_id: None,
            price_buy: Money::new(dec!(100)),
            price_profit: Money::new(dec!(110)),
            buy_volume_fiat: Money::new(dec!(1000)),
            buy_volume_crypto: 10.0,
            fee_buy_fiat: Money::new(dec!(2)),
            timestamp_buy: Timestamp::now(),
        }
    }

    #[test]
    fn new_open_rejects_duplicate_asset_gid() {
        let mut book = OrderBook::new();
        book.new_open(order("BTC", "b1", "g1")).unwrap();
        let err = book.new_open(order("BTC", "b2", "g1")).unwrap_err();
        assert!(matches!(err, OrderBookError::Duplicate(_)));
    }

    #[test]
    fn new_open_rejects_duplicate_buy_order_id() {
        let mut book = OrderBook::new();
        book.new_open(order("BTC", "b1", "g1")).unwrap();
        let err = book.new_open(order("ETH", "b1", "g2")).unwrap_err();
        assert!(matches!(err, OrderBookError::Duplicate(_)));
    }

    #[test]
    fn edit_replaces_by_buy_order_id() {
        let mut book = OrderBook::new();
        book.new_open(order("BTC", "b1", "g1")).unwrap();
        let mut edited = order("BTC", "b1", "g1");
        edited.sell_order_id = Some(ExchangeOrderId::new("s1"));
        book.edit(edited).unwrap();
        assert_eq!(
            book.query_open(&OpenOrderFilter::default())[0].sell_order_id,
            Some(ExchangeOrderId::new("s1"))
        );
    }

    #[test]
    fn edit_missing_buy_order_id_is_lookup_miss() {
        let mut book = OrderBook::new();
        let err = book.edit(order("BTC", "nope", "g1")).unwrap_err();
        assert!(matches!(err, OrderBookError::LookupMiss(_)));
    }

    #[test]
    fn delete_by_asset_removes_every_open_order_for_asset() {
        let mut book = OrderBook::new();
        book.new_open(order("BTC", "b1", "g1")).unwrap();
        book.new_open(order("BTC", "b2", "g2")).unwrap();
        book.new_open(order("ETH", "b3", "g3")).unwrap();
        book.delete_by_asset(&Symbol::new("BTC"));
        assert_eq!(book.open().len(), 1);
        assert_eq!(book.open()[0].asset, Symbol::new("ETH"));
    }

    #[test]
    fn query_open_filters_by_conjunction() {
        let mut book = OrderBook::new();
        book.new_open(order("BTC", "b1", "g1")).unwrap();
        book.new_open(order("BTC", "b2", "g2")).unwrap();
        let filter = OpenOrderFilter {
            asset: Some(Symbol::new("BTC")),
            buy_order_id: Some(ExchangeOrderId::new("b2")),
            ..Default::default()
        };
        assert_eq!(book.query_open(&filter).len(), 1);
    }

    #[test]
    fn total_profit_sums_and_rounds() {
        let mut book = OrderBook::new();
        let open = order("BTC", "b1", "g1");
        let closed = open.into_closed(
            Money::new(dec!(110)),
            Money::new(dec!(1100)),
            10.0,
            Money::new(dec!(2)),
            Money::new(dec!(96.007)),
            Timestamp::now(),
        );
        book.new_closed(closed);
        assert_eq!(book.total_profit(), Money::new(dec!(96.01)));
    }
}
