//! Shared Domain Types
//!
//! Value objects, errors, and arithmetic primitives shared across the
//! trader, order book, and simulator.

pub mod errors;
pub mod fees;
pub mod value_objects;

pub use errors::DomainError;
pub use fees::{calc_fee, pct_change, FeeBreakdown};
pub use value_objects::{ExchangeOrderId, GroupId, Money, Side, Symbol, Timestamp};
