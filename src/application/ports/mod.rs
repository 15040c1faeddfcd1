//! Application Ports (Driven)
//!
//! Interfaces for interacting with external systems: the exchange's public
//! and private WebSocket channels, its REST surface, and the persistent
//! backend store.

mod backend_port;
mod exchange_private_port;
mod exchange_public_port;
mod exchange_rest_port;

pub use backend_port::{
    BackendError, BackendPort, HistoryRows, OrderBucket, PersistedTraderState,
    StatusUpdate, TimestampPosition,
};
pub use exchange_private_port::{
    ExchangePrivateError, ExchangePrivatePort, OrderClosedEvent, OrderConfirmedEvent,
    PrivateEvent, WalletEntry,
};
pub use exchange_public_port::{
    ExchangePublicError, ExchangePublicPort, HistoricalCandle, PublicEvent,
};
pub use exchange_rest_port::{
    ExchangeError, ExchangeOrderRecord, ExchangeRestPort, OrderRequest,
};
