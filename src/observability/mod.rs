//! Observability module for metrics, tracing, and logging.
//!
//! This module provides instrumentation for the trading engine,
//! including Prometheus metrics export and distributed tracing.

mod metrics;
mod tracing;

pub use metrics::{
    init_metrics, record_order_submitted, record_sync_patch, record_tick,
    update_budget, update_candle_cache_size, update_open_orders, MetricsConfig, MetricsError,
};
pub use tracing::{config_from_env, init_tracing, span_attrs, TracingConfig, TracingError, TracingGuard};
