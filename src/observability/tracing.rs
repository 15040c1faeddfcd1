//! OpenTelemetry distributed tracing for the trading engine.
//!
//! Provides distributed tracing with OTLP export for tick evaluation,
//! order submission, and candle sync spans.
//!
//! # Example
//!
//! ```ignore
//! use tradeforce_engine::observability::{init_tracing, TracingConfig};
//!
//! let config = TracingConfig::default();
//! init_tracing(&config).expect("Failed to initialize tracing");
//! ```
//!
//! # Key Spans
//!
//! - `tick` - Full per-step evaluation (§10)
//! - `order.submit` - Order submission to the exchange
//! - `sync.patch` - Candle history gap patching

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{BatchSpanProcessor, SdkTracerProvider};
use std::time::Duration;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Configuration for OpenTelemetry tracing.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// OTLP endpoint URL (e.g., "http://localhost:4317").
    pub otlp_endpoint: String,
    /// Service name for resource attributes.
    pub service_name: String,
    /// Service version for resource attributes.
    pub service_version: String,
    /// Sampling ratio (0.0 to 1.0).
    pub sampling_ratio: f64,
    /// Maximum batch size for span export.
    pub batch_size: usize,
    /// Scheduled delay between batch exports.
    pub batch_timeout: Duration,
    /// Whether to enable console logging layer.
    pub enable_console: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "tradeforce-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            sampling_ratio: 1.0,
            batch_size: 512,
            batch_timeout: Duration::from_secs(5),
            enable_console: true,
        }
    }
}

impl TracingConfig {
    /// Create a new tracing configuration with a custom endpoint.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            otlp_endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the service name.
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Disable console logging layer.
    #[must_use]
    pub fn without_console(mut self) -> Self {
        self.enable_console = false;
        self
    }
}

/// Error type for tracing operations.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Failed to create OTLP exporter.
    #[error("failed to create OTLP exporter: {0}")]
    ExporterError(String),
    /// Failed to initialize tracing subscriber.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberError(String),
}

/// Tracer provider handle for graceful shutdown.
pub struct TracingGuard {
    provider: SdkTracerProvider,
}

impl TracingGuard {
    /// Shutdown the tracer provider, flushing any pending spans.
    ///
    /// This should be called before the application exits to ensure
    /// all spans are exported.
    pub fn shutdown(self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::error!(error = %e, "Failed to shutdown tracer provider");
        }
    }
}

/// Initialize OpenTelemetry tracing with OTLP exporter.
///
/// This sets up:
/// - OTLP gRPC exporter with batch processing
/// - Resource attributes (service name, version)
/// - tracing-subscriber with OpenTelemetry layer
/// - Optional console logging layer
///
/// # Returns
///
/// A `TracingGuard` that should be held until shutdown.
///
/// # Errors
///
/// Returns an error if the OTLP exporter or subscriber fails to initialize.
///
/// # Panics
///
/// Panics if the tracing subscriber has already been set.
pub fn init_tracing(config: &TracingConfig) -> Result<TracingGuard, TracingError> {
    // Create OTLP exporter
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .map_err(|e| TracingError::ExporterError(e.to_string()))?;

    // Build resource with service attributes
    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", config.service_version.clone()),
        ])
        .build();

    // Create batch span processor
    let batch_processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(
            opentelemetry_sdk::trace::BatchConfigBuilder::default()
                .with_max_export_batch_size(config.batch_size)
                .with_scheduled_delay(config.batch_timeout)
                .build(),
        )
        .build();

    // Build tracer provider
    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_span_processor(batch_processor)
        .build();

    // Get tracer for OpenTelemetry layer
    let tracer = provider.tracer(config.service_name.clone());

    // Build subscriber with layers
    let otel_layer = OpenTelemetryLayer::new(tracer);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.enable_console {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(otel_layer)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(otel_layer)
            .init();
    }

    tracing::info!(
        endpoint = %config.otlp_endpoint,
        service = %config.service_name,
        "OpenTelemetry tracing initialized"
    );

    Ok(TracingGuard { provider })
}

/// Create a tracing configuration from environment variables.
///
/// Reads the following environment variables:
/// - `OTEL_EXPORTER_OTLP_ENDPOINT` - OTLP endpoint (default: http://localhost:4317)
/// - `OTEL_SERVICE_NAME` - Service name (default: execution-engine)
/// - `OTEL_TRACES_SAMPLER_ARG` - Sampling ratio (default: 1.0)
#[must_use]
pub fn config_from_env() -> TracingConfig {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "tradeforce-engine".to_string());
    let sampling_ratio = std::env::var("OTEL_TRACES_SAMPLER_ARG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1.0);

    TracingConfig {
        otlp_endpoint: endpoint,
        service_name,
        sampling_ratio,
        ..Default::default()
    }
}

// ============================================================================
// Span attribute helpers
// ============================================================================

/// Common span attribute keys for tick and order operations.
pub mod span_attrs {
    /// Tick timestamp attribute key.
    pub const TICK_TS: &str = "tick.ts";
    /// Order ID attribute key.
    pub const ORDER_ID: &str = "order.id";
    /// Symbol attribute key.
    pub const SYMBOL: &str = "order.symbol";
    /// Order side attribute key (BUY/SELL).
    pub const SIDE: &str = "order.side";
    /// Order quantity attribute key.
    pub const QUANTITY: &str = "order.quantity";
    /// Exchange name attribute key.
    pub const EXCHANGE: &str = "order.exchange";
    /// Group ID attribute key.
    pub const GROUP_ID: &str = "order.gid";
    /// Sync patch range-start attribute key.
    pub const SYNC_START_MS: &str = "sync.start_ms";
    /// Sync patch range-end attribute key.
    pub const SYNC_END_MS: &str = "sync.end_ms";
}

// ============================================================================
// Tests
// ============================================================================
