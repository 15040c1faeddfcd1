// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Tradeforce Engine - Deterministic Trading Core
//!
//! A deterministic trading engine covering three bounded contexts: live
//! candle ingestion and gap-detection sync, order lifecycle against an
//! exchange, and a vectorized simulator kernel for backtesting the same
//! buy/sell decision logic used live.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic, zero infrastructure dependencies.
//!   - `market_data`: candle/`Ohlcv`, the bounded candle cache, gap
//!     detection (`missing_range`) and the exchange-symbol boundary
//!     conversion.
//!   - `order_execution`: `OpenOrder`/`ClosedOrder` and the order-book
//!     aggregate.
//!   - `shared`: value objects (`Money`, `Symbol`, `Side`, identifiers),
//!     errors, and fee/percentage-change arithmetic.
//!
//! - **Application**: Use cases and port definitions.
//!   - `ports`: `ExchangeRestPort`, `ExchangePublicPort`,
//!     `ExchangePrivatePort`, `BackendPort` — the external collaborators.
//!   - `use_cases`: the `Trader` core and the `TickCoordinator` state
//!     machine.
//!
//! - **Simulator**: the vectorized buy/sell kernel and the parallel
//!   multi-snapshot runner used for backtesting.
//!
//! - **Infrastructure**: Adapters (implementations).
//!   - `exchange`: `reqwest`-based REST client.
//!   - `websocket`: public/private streaming clients.
//!   - `persistence`: in-memory `BackendPort` adapter.
//!   - `http`: minimal operational `/health` + `/status` surface.
//!
//! - **Config / Observability / Resilience**: ambient stack — YAML
//!   configuration loading, Prometheus metrics + OTLP tracing, and
//!   circuit breakers around the external collaborators.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Simulator - the vectorized buy/sell evaluation kernel.
pub mod simulator;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Observability - metrics and distributed tracing.
pub mod observability;

/// Resilience - circuit breakers around external collaborators.
pub mod resilience;

/// Configuration loading and validation.
pub mod config;

// =============================================================================
// Re-exports
// =============================================================================

pub use domain::market_data::{
    convert_symbol_str, missing_range, symbol_to_exchange_pair, Candle, CandleCache, CandleRow,
    Ohlcv, RacePreventionList,
};
pub use domain::order_execution::{ClosedOrder, OpenOrder, OrderBook};
pub use domain::shared::{
    calc_fee, pct_change, DomainError, ExchangeOrderId, GroupId, Money, Side, Symbol, Timestamp,
};

pub use application::ports::{
    BackendPort, ExchangePrivatePort, ExchangePublicPort, ExchangeRestPort,
};
pub use application::use_cases::{TickCoordinator, TickState, Trader, TraderConfig};

pub use simulator::{run_snapshot, run_snapshots_parallel, SimParams, SnapshotResult};

pub use infrastructure::exchange::HttpExchangeRestClient;
pub use infrastructure::http::{create_router, StatusSnapshot, StatusState};
pub use infrastructure::persistence::InMemoryBackend;
pub use infrastructure::websocket::{PrivateWebSocketClient, PublicWebSocketClient};

pub use config::{load_config, ConfigError, TradingConfig};
