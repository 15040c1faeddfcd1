//! Prometheus metrics for the trading engine (§10).

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".parse().expect("valid default address"),
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with a custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self { listen_addr: addr }
    }
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to install the Prometheus exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the exporter fails to bind (e.g. port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %config.listen_addr, "Prometheus metrics exporter started");
    Ok(())
}

/// Record that a tick fired.
pub fn record_tick() {
    counter!("tradeforce_ticks_total").increment(1);
}

/// Record an order submission for `side` ("buy" or "sell").
pub fn record_order_submitted(side: &str) {
    counter!("tradeforce_orders_submitted_total", "side" => side.to_string()).increment(1);
}

/// Record a history-patch sync run.
pub fn record_sync_patch() {
    counter!("tradeforce_sync_patches_total").increment(1);
}

/// Update the current budget gauge.
pub fn update_budget(budget_fiat: f64) {
    gauge!("tradeforce_budget_fiat").set(budget_fiat);
}

/// Update the open-orders gauge.
pub fn update_open_orders(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("tradeforce_open_orders").set(count as f64);
}

/// Update the candle-cache size gauge.
pub fn update_candle_cache_size(size: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("tradeforce_candle_cache_size").set(size as f64);
}
