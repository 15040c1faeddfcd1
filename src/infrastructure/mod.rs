//! Driven adapters: persistence, the exchange REST client, the exchange
//! websocket streams, and the operational HTTP surface.

pub mod exchange;
pub mod http;
pub mod persistence;
pub mod websocket;
