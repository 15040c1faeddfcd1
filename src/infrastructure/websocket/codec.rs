//! Parses the exchange's JSON stream messages into port-level events.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::application::ports::{
    ExchangePrivateError, ExchangePublicError, OrderClosedEvent, OrderConfirmedEvent, PrivateEvent,
    PublicEvent, WalletEntry,
};
use crate::domain::market_data::convert_symbol_str;
use crate::domain::shared::{ExchangeOrderId, GroupId, Symbol};

#[derive(Debug, Deserialize)]
struct WalletWire {
    currency: String,
    balance: Decimal,
    balance_available: Option<Decimal>,
}

impl WalletWire {
    fn into_entry(self) -> Option<(Symbol, WalletEntry)> {
        Some((
            Symbol::new(self.currency),
            WalletEntry { balance: self.balance, balance_available: self.balance_available },
        ))
    }
}

/// Parses one public-channel message into a [`PublicEvent`].
///
/// Returns `Ok(None)` for message shapes this channel doesn't act on (e.g.
/// heartbeats), rather than treating every unrecognized message as an error.
///
/// # Errors
///
/// Returns [`ExchangePublicError::SubscribeFailed`] for an `event: "error"`
/// message scoped to a subscribe request.
pub fn parse_public_message(value: &Value, quote: &str) -> Result<Option<PublicEvent>, ExchangePublicError> {
    let event = value.get("event").and_then(Value::as_str);
    match event {
        Some("subscribed") => {
            let pair = value.get("symbol").and_then(Value::as_str).unwrap_or_default();
            let symbol = convert_symbol_str(pair, quote)
                .ok_or_else(|| ExchangePublicError::Connection(format!("bad symbol {pair}")))?;
            Ok(Some(PublicEvent::Subscribed { symbol }))
        }
        Some("unsubscribed") => {
            let pair = value.get("symbol").and_then(Value::as_str).unwrap_or_default();
            let symbol = convert_symbol_str(pair, quote)
                .ok_or_else(|| ExchangePublicError::Connection(format!("bad symbol {pair}")))?;
            Ok(Some(PublicEvent::Unsubscribed { symbol }))
        }
        Some("error") => {
            let message = value.get("msg").and_then(Value::as_str).unwrap_or("unknown error").to_string();
            let symbol = value
                .get("symbol")
                .and_then(Value::as_str)
                .and_then(|pair| convert_symbol_str(pair, quote));
            Ok(Some(PublicEvent::Error { symbol, message }))
        }
        Some("info") => {
            let message = value.get("msg").and_then(Value::as_str).unwrap_or_default().to_string();
            Ok(Some(PublicEvent::StatusUpdate { message }))
        }
        Some("candle") => {
            let pair = value.get("symbol").and_then(Value::as_str).unwrap_or_default();
            let Some(symbol) = convert_symbol_str(pair, quote) else {
                return Ok(None);
            };
            let ohlcv = parse_ohlcv(value);
            let timestamp_ms = value.get("mts").and_then(Value::as_i64).unwrap_or_default();
            Ok(Some(PublicEvent::NewCandle { timestamp_ms, symbol, ohlcv }))
        }
        _ => Ok(None),
    }
}

fn parse_ohlcv(value: &Value) -> crate::domain::market_data::Ohlcv {
    crate::domain::market_data::Ohlcv {
        open: value.get("open").and_then(Value::as_f64).unwrap_or_default(),
        high: value.get("high").and_then(Value::as_f64).unwrap_or_default(),
        low: value.get("low").and_then(Value::as_f64).unwrap_or_default(),
        close: value.get("close").and_then(Value::as_f64).unwrap_or_default(),
        volume: value.get("volume").and_then(Value::as_f64).unwrap_or_default(),
    }
}

/// Parses one private-channel message into a [`PrivateEvent`].
///
/// # Errors
///
/// Returns [`ExchangePrivateError::Connection`] if a recognized event shape
/// carries a malformed field (e.g. an unparseable symbol).
pub fn parse_private_message(value: &Value, quote: &str) -> Result<Option<PrivateEvent>, ExchangePrivateError> {
    let event = value.get("event").and_then(Value::as_str);
    match event {
        Some("wallet_snapshot") => {
            let wallets: Vec<WalletWire> = value
                .get("wallets")
                .cloned()
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| ExchangePrivateError::Connection(e.to_string()))?
                .unwrap_or_default();
            let entries = wallets.into_iter().filter_map(WalletWire::into_entry).collect();
            Ok(Some(PrivateEvent::WalletSnapshot(entries)))
        }
        Some("wallet_update") => {
            let wire: WalletWire = serde_json::from_value(value.clone())
                .map_err(|e| ExchangePrivateError::Connection(e.to_string()))?;
            let (currency, entry) = wire
                .into_entry()
                .ok_or_else(|| ExchangePrivateError::Connection("bad wallet update".to_string()))?;
            Ok(Some(PrivateEvent::WalletUpdate { currency, entry }))
        }
        Some("order_new") => {
            let symbol = parse_symbol(value, quote)?;
            Ok(Some(PrivateEvent::OrderConfirmed(OrderConfirmedEvent {
                id: ExchangeOrderId::new(field_str(value, "id")),
                gid: GroupId::new(field_str(value, "gid")),
                symbol,
                amount_orig: field_decimal(value, "amount_orig"),
            })))
        }
        Some("order_closed") => {
            let symbol = parse_symbol(value, quote)?;
            Ok(Some(PrivateEvent::OrderClosed(OrderClosedEvent {
                id: ExchangeOrderId::new(field_str(value, "id")),
                gid: GroupId::new(field_str(value, "gid")),
                symbol,
                amount_orig: field_decimal(value, "amount_orig"),
                amount_filled: field_decimal(value, "amount_filled"),
                price_avg: field_decimal(value, "price_avg"),
                mts_update: value.get("mts_update").and_then(Value::as_i64).unwrap_or_default(),
            })))
        }
        _ => Ok(None),
    }
}

fn parse_symbol(value: &Value, quote: &str) -> Result<Symbol, ExchangePrivateError> {
    let pair = value.get("symbol").and_then(Value::as_str).unwrap_or_default();
    convert_symbol_str(pair, quote).ok_or_else(|| ExchangePrivateError::Connection(format!("bad symbol {pair}")))
}

fn field_str(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn field_decimal(value: &Value, key: &str) -> Decimal {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .or_else(|| value.get(key).and_then(Value::as_f64).and_then(Decimal::from_f64_retain))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_subscribed_event() {
        let value = json!({"event": "subscribed", "symbol": "tBTCUSD"});
        let event = parse_public_message(&value, "usd").unwrap().unwrap();
        assert!(matches!(event, PublicEvent::Subscribed { symbol } if symbol.as_str() == "BTC"));
    }

    #[test]
    fn parses_candle_event() {
        let value = json!({
            "event": "candle", "symbol": "tETHUSD", "mts": 1000,
            "open": 10.0, "high": 12.0, "low": 9.0, "close": 11.0, "volume": 5.0,
        });
        let event = parse_public_message(&value, "usd").unwrap().unwrap();
        match event {
            PublicEvent::NewCandle { timestamp_ms, symbol, ohlcv } => {
                assert_eq!(timestamp_ms, 1000);
                assert_eq!(symbol.as_str(), "ETH");
                assert!((ohlcv.close - 11.0).abs() < 1e-9);
            }
            _ => panic!("expected NewCandle"),
        }
    }

    #[test]
    fn unrecognized_event_returns_none() {
        let value = json!({"event": "heartbeat"});
        assert!(parse_public_message(&value, "usd").unwrap().is_none());
    }

    #[test]
    fn parses_wallet_snapshot() {
        let value = json!({"event": "wallet_snapshot", "wallets": [
            {"currency": "USD", "balance": "1000.00", "balance_available": "950.00"}
        ]});
        let event = parse_private_message(&value, "usd").unwrap().unwrap();
        match event {
            PrivateEvent::WalletSnapshot(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0.as_str(), "USD");
            }
            _ => panic!("expected WalletSnapshot"),
        }
    }

    #[test]
    fn parses_order_closed() {
        let value = json!({
            "event": "order_closed", "id": "42", "gid": "g1", "symbol": "tBTCUSD",
            "amount_orig": "0.5", "amount_filled": "0.5", "price_avg": "100.0", "mts_update": 5000,
        });
        let event = parse_private_message(&value, "usd").unwrap().unwrap();
        assert!(matches!(event, PrivateEvent::OrderClosed(e) if e.mts_update == 5000));
    }
}
