//! WebSocket connection configuration and state.

use std::time::Duration;

/// WebSocket connection configuration, shared by the public and private
/// stream clients.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Public (market-data) stream URL.
    pub public_url: String,
    /// Private (account/order) stream URL.
    pub private_url: String,
    /// Quote currency every symbol trades against (§4.3).
    pub quote: String,
    /// REST base URL for the history-backfill request (§4.3 sync patch).
    pub history_base_url: String,
    /// API key for private-stream authentication.
    pub api_key: String,
    /// API secret for private-stream authentication.
    pub api_secret: String,

    /// Initial backoff duration for reconnection.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth.
    pub backoff_multiplier: f64,
    /// Maximum reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,
}

impl WebSocketConfig {
    /// Create a configuration with sensible reconnect defaults.
    #[must_use]
    pub fn new(
        public_url: impl Into<String>,
        private_url: impl Into<String>,
        quote: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            public_url: public_url.into(),
            private_url: private_url.into(),
            quote: quote.into(),
            history_base_url: String::new(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            max_reconnect_attempts: 10,
        }
    }
}

/// Current state of a WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebSocketState {
    /// Not connected.
    Disconnected,
    /// Attempting to connect.
    Connecting,
    /// Connected and ready to send/receive.
    Connected,
    /// Connection is being closed.
    Closing,
}

impl WebSocketState {
    /// True once the connection can carry subscribe/order traffic.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Connected)
    }
}
