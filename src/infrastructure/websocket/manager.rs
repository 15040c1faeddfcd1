//! Reconnecting WebSocket clients for the exchange's public and private
//! streams, implementing [`ExchangePublicPort`] and [`ExchangePrivatePort`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::codec::{parse_private_message, parse_public_message};
use super::reconnect::ReconnectPolicy;
use super::types::{WebSocketConfig, WebSocketState};
use crate::application::ports::{
    ExchangePrivateError, ExchangePrivatePort, ExchangePublicError, ExchangePublicPort,
    HistoricalCandle, PrivateEvent, PublicEvent,
};
use crate::domain::market_data::symbol_to_exchange_pair;
use crate::domain::shared::Symbol;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};

/// Channel capacity for buffered public-channel events.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Reconnecting client for the public (market-data) stream.
pub struct PublicWebSocketClient {
    config: WebSocketConfig,
    state: Arc<RwLock<WebSocketState>>,
    subscribed: Arc<RwLock<HashSet<Symbol>>>,
    event_rx: Mutex<mpsc::Receiver<Result<PublicEvent, ExchangePublicError>>>,
    outbound_tx: mpsc::UnboundedSender<Message>,
    http: reqwest::Client,
}

impl PublicWebSocketClient {
    /// Construct the client and spawn its background reconnect loop.
    #[must_use]
    pub fn connect(config: WebSocketConfig) -> Self {
        let state = Arc::new(RwLock::new(WebSocketState::Disconnected));
        let subscribed = Arc::new(RwLock::new(HashSet::new()));
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_public_stream(
            config.clone(),
            Arc::clone(&state),
            Arc::clone(&subscribed),
            event_tx,
            outbound_rx,
        ));

        Self {
            http: reqwest::Client::new(),
            config,
            state,
            subscribed,
            event_rx: Mutex::new(event_rx),
            outbound_tx,
        }
    }
}

#[async_trait]
impl ExchangePublicPort for PublicWebSocketClient {
    async fn subscribe_candles(&self, symbol: &Symbol) -> Result<(), ExchangePublicError> {
        self.subscribed.write().insert(symbol.clone());
        let pair = symbol_to_exchange_pair(symbol, &self.config.quote);
        let msg = serde_json::json!({"event": "subscribe", "channel": "candles", "symbol": pair});
        self.outbound_tx
            .send(Message::Text(msg.to_string().into()))
            .map_err(|e| ExchangePublicError::Connection(e.to_string()))
    }

    async fn next_event(&self) -> Result<PublicEvent, ExchangePublicError> {
        self.event_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| ExchangePublicError::Connection("event channel closed".to_string()))?
    }

    async fn request_history(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<HistoricalCandle>, ExchangePublicError> {
        let url = format!(
            "{}/candles/hist?start={start_ms}&end={end_ms}",
            self.config.history_base_url
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangePublicError::Connection(e.to_string()))?;
        #[derive(serde::Deserialize)]
        struct Row {
            timestamp_ms: i64,
            symbol: String,
            open: f64,
            high: f64,
            low: f64,
            close: f64,
            volume: f64,
        }
        let rows: Vec<Row> = response
            .json()
            .await
            .map_err(|e| ExchangePublicError::Connection(e.to_string()))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let symbol = crate::domain::market_data::convert_symbol_str(&row.symbol, &self.config.quote)?;
                Some(HistoricalCandle {
                    timestamp_ms: row.timestamp_ms,
                    symbol,
                    ohlcv: crate::domain::market_data::Ohlcv {
                        open: row.open,
                        high: row.high,
                        low: row.low,
                        close: row.close,
                        volume: row.volume,
                    },
                })
            })
            .collect())
    }
}

/// Background reconnect loop for the public stream. Replays the current
/// subscription set on every reconnect.
async fn run_public_stream(
    config: WebSocketConfig,
    state: Arc<RwLock<WebSocketState>>,
    subscribed: Arc<RwLock<HashSet<Symbol>>>,
    event_tx: mpsc::Sender<Result<PublicEvent, ExchangePublicError>>,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
) {
    let mut policy = ReconnectPolicy::new(&config);
    let breaker = CircuitBreaker::new("exchange-public-ws", CircuitBreakerConfig::websocket());

    loop {
        if !breaker.is_call_permitted() {
            tracing::warn!("public stream circuit breaker open, backing off");
        } else {
            *state.write() = WebSocketState::Connecting;
            match connect_async(&config.public_url).await {
                Ok((stream, _)) => {
                    breaker.record_success();
                    policy.reset();
                    *state.write() = WebSocketState::Connected;
                    let _ = event_tx.send(Ok(PublicEvent::Connected)).await;

                    let (mut write, mut read) = stream.split();
                    let resubscribe: Vec<Symbol> = subscribed.read().iter().cloned().collect();
                    for symbol in &resubscribe {
                        let pair = symbol_to_exchange_pair(symbol, &config.quote);
                        let msg = serde_json::json!({"event": "subscribe", "channel": "candles", "symbol": pair});
                        let _ = write.send(Message::Text(msg.to_string().into())).await;
                    }

                    loop {
                        tokio::select! {
                            incoming = read.next() => {
                                match incoming {
                                    Some(Ok(Message::Text(text))) => {
                                        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                                            match parse_public_message(&value, &config.quote) {
                                                Ok(Some(event)) => { let _ = event_tx.send(Ok(event)).await; }
                                                Ok(None) => {}
                                                Err(e) => { let _ = event_tx.send(Err(e)).await; }
                                            }
                                        }
                                    }
                                    Some(Ok(_)) => {}
                                    Some(Err(e)) => {
                                        breaker.record_failure();
                                        let _ = event_tx
                                            .send(Err(ExchangePublicError::Connection(e.to_string())))
                                            .await;
                                        break;
                                    }
                                    None => break,
                                }
                            }
                            Some(outbound) = outbound_rx.recv() => {
                                let _ = write.send(outbound).await;
                            }
                        }
                    }
                }
                Err(e) => {
                    breaker.record_failure();
                    let _ = event_tx
                        .send(Err(ExchangePublicError::Connection(e.to_string())))
                        .await;
                }
            }
        }

        *state.write() = WebSocketState::Disconnected;
        let Some(delay) = policy.next_backoff() else {
            tracing::error!("public stream reconnect attempts exhausted");
            return;
        };
        tokio::time::sleep(delay).await;
    }
}

/// Reconnecting client for the private (account/order) stream.
pub struct PrivateWebSocketClient {
    event_rx: Mutex<mpsc::Receiver<Result<PrivateEvent, ExchangePrivateError>>>,
}

impl PrivateWebSocketClient {
    /// Construct the client and spawn its background reconnect loop.
    #[must_use]
    pub fn connect(config: WebSocketConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(run_private_stream(config, event_tx));
        Self { event_rx: Mutex::new(event_rx) }
    }
}

#[async_trait]
impl ExchangePrivatePort for PrivateWebSocketClient {
    async fn next_event(&self) -> Result<PrivateEvent, ExchangePrivateError> {
        self.event_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| ExchangePrivateError::Connection("event channel closed".to_string()))?
    }
}

async fn run_private_stream(
    config: WebSocketConfig,
    event_tx: mpsc::Sender<Result<PrivateEvent, ExchangePrivateError>>,
) {
    let mut policy = ReconnectPolicy::new(&config);
    let breaker = CircuitBreaker::new("exchange-private-ws", CircuitBreakerConfig::websocket());

    loop {
        if breaker.is_call_permitted() {
            match connect_async(&config.private_url).await {
                Ok((stream, _)) => {
                    breaker.record_success();
                    policy.reset();
                    let (mut write, mut read) = stream.split();
                    let auth = serde_json::json!({
                        "event": "auth", "apiKey": config.api_key, "apiSecret": config.api_secret,
                    });
                    let _ = write.send(Message::Text(auth.to_string().into())).await;

                    while let Some(incoming) = read.next().await {
                        match incoming {
                            Ok(Message::Text(text)) => {
                                if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                                    match parse_private_message(&value, &config.quote) {
                                        Ok(Some(event)) => { let _ = event_tx.send(Ok(event)).await; }
                                        Ok(None) => {}
                                        Err(e) => { let _ = event_tx.send(Err(e)).await; }
                                    }
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                breaker.record_failure();
                                let _ = event_tx
                                    .send(Err(ExchangePrivateError::Connection(e.to_string())))
                                    .await;
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    breaker.record_failure();
                    let _ = event_tx
                        .send(Err(ExchangePrivateError::Connection(e.to_string())))
                        .await;
                }
            }
        }

        let Some(delay) = policy.next_backoff() else {
            tracing::error!("private stream reconnect attempts exhausted");
            return;
        };
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_config_defaults_are_sane() {
        let config = WebSocketConfig::new("wss://public", "wss://private", "usd", "key", "secret");
        assert_eq!(config.max_reconnect_attempts, 10);
    }
}
