//! Reconnecting WebSocket clients for the exchange's public (market-data)
//! and private (account/order) streams.

mod codec;
mod manager;
mod reconnect;
mod types;

pub use manager::{PrivateWebSocketClient, PublicWebSocketClient};
pub use reconnect::ReconnectPolicy;
pub use types::{WebSocketConfig, WebSocketState};
