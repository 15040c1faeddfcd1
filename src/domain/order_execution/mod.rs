//! Order lifecycle: open/closed records and the order-book aggregate.

mod order;
mod order_book;

pub use order::{ClosedOrder, OpenOrder};
pub use order_book::{OpenOrderFilter, OrderBook, OrderBookError};
