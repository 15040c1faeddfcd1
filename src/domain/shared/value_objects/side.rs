//! Order side (buy/sell).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the book an order or fee calculation applies to.
///
/// Fee calculation is keyed on this: buys pay the taker fee, sells pay the
/// maker fee (see [`crate::domain::shared::fees::calc_fee`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// A buy (entry) order.
    Buy,
    /// A sell (exit) order.
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}
