//! Open and closed order records.

use crate::domain::shared::{DomainError, ExchangeOrderId, GroupId, Money, Symbol, Timestamp};

/// A buy that has settled and is waiting for its paired sell to fill.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    /// Traded asset.
    pub asset: Symbol,
    /// Exchange-assigned id of the settled buy.
    pub buy_order_id: ExchangeOrderId,
    /// Client-assigned group id linking this buy to its eventual sell.
    pub gid: GroupId,
    /// Exchange-assigned id of the sell, once submitted.
    pub sell_order_id: Option<ExchangeOrderId>,
    /// Fill price of the buy.
    pub price_buy: Money,
    /// Target price at which the paired sell is placed.
    pub price_profit: Money,
    /// Fiat notional spent on the buy.
    pub buy_volume_fiat: Money,
    /// Crypto volume received from the buy, after fees.
    pub buy_volume_crypto: f64,
    /// Fee paid on the buy, in fiat.
    pub fee_buy_fiat: Money,
    /// When the buy settled.
    pub timestamp_buy: Timestamp,
}

impl OpenOrder {
    /// Validate the profit-above-entry invariant (§3, §8 property 2).
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvariantViolation`] if `price_profit` does not
    /// strictly exceed `price_buy`.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        if self.price_profit <= self.price_buy {
            return Err(DomainError::InvariantViolation {
                aggregate: "OpenOrder".to_string(),
                invariant: "price_profit > price_buy".to_string(),
                state: format!(
                    "price_buy={}, price_profit={}",
                    self.price_buy, self.price_profit
                ),
            });
        }
        Ok(())
    }

    /// Move this order into its closed form once the paired sell settles.
    #[must_use]
    pub fn into_closed(
        self,
        price_sell: Money,
        sell_volume_fiat: Money,
        sell_volume_crypto: f64,
        fee_sell_fiat: Money,
        profit_fiat: Money,
        timestamp_sell: Timestamp,
    ) -> ClosedOrder {
        ClosedOrder {
            open: self,
            price_sell,
            sell_volume_fiat,
            sell_volume_crypto,
            fee_sell_fiat,
            profit_fiat,
            timestamp_sell,
        }
    }
}

/// A fully-settled buy/sell pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedOrder {
    /// The buy-side fields, unchanged from the originating [`OpenOrder`].
    pub open: OpenOrder,
    /// Fill price of the sell.
    pub price_sell: Money,
    /// Fiat proceeds of the sell, before fees.
    pub sell_volume_fiat: Money,
    /// Crypto volume sold.
    pub sell_volume_crypto: f64,
    /// Fee paid on the sell, in fiat.
    pub fee_sell_fiat: Money,
    /// Realized profit in fiat (proceeds minus cost minus fees).
    pub profit_fiat: Money,
    /// When the sell settled.
    pub timestamp_sell: Timestamp,
}

impl ClosedOrder {
    /// Traded asset, delegated from the buy side.
    #[must_use]
    pub fn asset(&self) -> &Symbol {
        &self.open.asset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_open() -> OpenOrder {
        OpenOrder {
            asset: Symbol::new("BTC"),
            buy_order_id: ExchangeOrderId::new("ex-1"),
            gid: GroupId::new("gid-1"),
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
    fn check_invariants_passes_when_profit_above_buy() {
        assert!(sample_open().check_invariants().is_ok());
    }

    #[test]
    fn check_invariants_fails_when_profit_not_above_buy() {
        let mut order = sample_open();
        order.price_profit = order.price_buy;
        assert!(order.check_invariants().is_err());
    }

    #[test]
    fn into_closed_preserves_buy_fields() {
        let open = sample_open();
        let asset = open.asset.clone();
        let closed = open.into_closed(
            Money::new(dec!(110)),
            Money::new(dec!(1100)),
            10.0,
            Money::new(dec!(2)),
            Money::new(dec!(96)),
            Timestamp::now(),
        );
        assert_eq!(closed.asset(), &asset);
        assert_eq!(closed.profit_fiat, Money::new(dec!(96)));
    }
}
