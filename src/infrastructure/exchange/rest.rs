//! `reqwest`-based implementation of [`ExchangeRestPort`] (§6B).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::{ExchangeError, ExchangeOrderRecord, ExchangeRestPort, OrderRequest};
use crate::domain::market_data::convert_symbol_str;
use crate::domain::shared::{ExchangeOrderId, GroupId, Side, Symbol};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};

/// Quote currency every request is denominated against, e.g. `"USD"`.
#[derive(Debug, Clone)]
pub struct HttpExchangeRestClient {
    client: Client,
    base_url: String,
    quote: String,
    breaker: CircuitBreaker,
}

impl HttpExchangeRestClient {
    /// Build a client against `base_url`, trading in `quote`.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Transport`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: impl Into<String>, quote: impl Into<String>) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            quote: quote.into(),
            breaker: CircuitBreaker::new("exchange-rest", CircuitBreakerConfig::rest()),
        })
    }

    fn pair(&self, asset: &Symbol) -> String {
        crate::domain::market_data::symbol_to_exchange_pair(asset, &self.quote)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ExchangeError> {
        if !self.breaker.is_call_permitted() {
            return Err(ExchangeError::Transport("circuit breaker open".to_string()));
        }
        let url = format!("{}{path}", self.base_url);
        let result = self.client.get(&url).send().await;
        self.record(result).await
    }

    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ExchangeError> {
        if !self.breaker.is_call_permitted() {
            return Err(ExchangeError::Transport("circuit breaker open".to_string()));
        }
        let url = format!("{}{path}", self.base_url);
        let result = self.client.post(&url).json(body).send().await;
        self.record(result).await
    }

    async fn record<T: serde::de::DeserializeOwned>(
        &self,
        result: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T, ExchangeError> {
        let response = match result {
            Ok(r) => r,
            Err(e) => {
                self.breaker.record_failure();
                return Err(ExchangeError::Transport(e.to_string()));
            }
        };

        if !response.status().is_success() {
            self.breaker.record_failure();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Rejected(format!("{status}: {body}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        match serde_json::from_str(&text) {
            Ok(value) => {
                self.breaker.record_success();
                Ok(value)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(ExchangeError::Transport(format!("decode failed: {e}")))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderSubmitResponse {
    #[allow(dead_code)]
    id: i64,
}

#[derive(Debug, Deserialize)]
struct OrderHistoryEntry {
    id: i64,
    gid: Option<i64>,
    symbol: String,
    #[serde(default)]
    is_filled: bool,
    price_avg: Option<Decimal>,
    amount_filled: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct MinOrderSizeEntry {
    symbol: String,
    min_order_size: Decimal,
}

#[async_trait]
impl ExchangeRestPort for HttpExchangeRestClient {
    async fn order(&self, side: Side, request: OrderRequest) -> Result<(), ExchangeError> {
        let signed_amount = match side {
            Side::Buy => request.amount.abs(),
            Side::Sell => -request.amount.abs(),
        };
        let body = serde_json::json!({
            "symbol": self.pair(&request.asset),
            "price": request.price.to_string(),
            "amount": signed_amount.to_string(),
            "gid": request.gid.as_str(),
        });
        let _: OrderSubmitResponse = self.post("/order/new", &body).await?;
        Ok(())
    }

    async fn get_order_history(&self) -> Result<Vec<ExchangeOrderRecord>, ExchangeError> {
        let entries: Vec<OrderHistoryEntry> = self.get("/orders/history").await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let symbol = convert_symbol_str(&entry.symbol, &self.quote)?;
                Some(ExchangeOrderRecord {
                    id: ExchangeOrderId::new(entry.id.to_string()),
                    gid: entry.gid.map(|g| GroupId::new(g.to_string())),
                    symbol,
                    executed: entry.is_filled,
                    price_avg: entry.price_avg,
                    amount_filled: entry.amount_filled,
                })
            })
            .collect())
    }

    async fn get_min_order_sizes(&self) -> Result<HashMap<Symbol, Decimal>, ExchangeError> {
        let entries: Vec<MinOrderSizeEntry> = self.get("/conf/min-order-size").await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let symbol = convert_symbol_str(&entry.symbol, &self.quote)?;
                Some((symbol, entry.min_order_size))
            })
            .collect())
    }

    async fn get_latest_remote_candle_timestamp(
        &self,
        minus_delta_ms: i64,
    ) -> Result<i64, ExchangeError> {
        #[derive(Deserialize)]
        struct LatestTimestamp {
            timestamp_ms: i64,
        }
        let latest: LatestTimestamp = self.get("/candles/latest").await?;
        Ok(latest.timestamp_ms - minus_delta_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_order_history_decodes_and_converts_symbol() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "gid": 7, "symbol": "tBTCUSD", "is_filled": true, "price_avg": "100.5", "amount_filled": "0.5"}
            ])))
            .mount(&server)
            .await;

        let client = HttpExchangeRestClient::new(server.uri(), "usd").unwrap();
        let history = client.get_order_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].symbol.as_str(), "BTC");
        assert_eq!(history[0].gid.as_ref().unwrap().as_str(), "7");
    }

    #[tokio::test]
    async fn non_success_status_surfaces_as_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conf/min-order-size"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpExchangeRestClient::new(server.uri(), "usd").unwrap();
        let err = client.get_min_order_sizes().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Rejected(_)));
    }
}
