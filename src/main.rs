//! Tradeforce Engine Binary
//!
//! Starts the trading engine: loads configuration, wires the exchange
//! REST/websocket adapters and the in-memory backend, and runs the tick
//! coordinator's event loop until shutdown (§11).
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tradeforce-engine
//! ```
//!
//! # Environment Variables
//!
//! - `TRADEFORCE_CONFIG`: path to the YAML config file (default: `config.yaml`)
//! - `EXCHANGE_API_URL`: base URL for the exchange REST API
//! - `EXCHANGE_WS_PUBLIC_URL` / `EXCHANGE_WS_PRIVATE_URL`: websocket endpoints
//! - `EXCHANGE_API_KEY` / `EXCHANGE_API_SECRET`: private-stream credentials
//! - `HTTP_PORT`: operational HTTP surface port (default: 8080)
//! - `RUST_LOG`: log level (default: info)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tradeforce_engine::{
    create_router, load_config, HttpExchangeRestClient, InMemoryBackend, PrivateWebSocketClient,
    PublicWebSocketClient, StatusSnapshot, StatusState, TickCoordinator, Trader,
};
use tradeforce_engine::application::ports::{ExchangePublicPort, PublicEvent};
use tradeforce_engine::infrastructure::websocket::WebSocketConfig;
use tradeforce_engine::observability::{init_metrics, MetricsConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }

    #[allow(clippy::unwrap_used)]
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tradeforce_engine=info".parse().unwrap()),
        )
        .init();

    tracing::info!("starting tradeforce engine");

    let config_path = std::env::var("TRADEFORCE_CONFIG")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let trading_config = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "configuration fatal");
            std::process::exit(1);
        }
    };

    let trader_config = match trading_config.clone().into_trader_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "configuration fatal");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_metrics(&MetricsConfig::default()) {
        tracing::warn!(error = %e, "metrics exporter not started");
    }

    let assets: Vec<_> = trading_config
        .assets
        .iter()
        .map(|a| tradeforce_engine::Symbol::new(a.clone()))
        .collect();

    let exchange_api_url =
        std::env::var("EXCHANGE_API_URL").unwrap_or_else(|_| "https://api.exchange.invalid".to_string());
    let exchange = Arc::new(HttpExchangeRestClient::new(
        exchange_api_url,
        trading_config.base_currency.clone(),
    )?);

    let backend = Arc::new(InMemoryBackend::new());

    let ws_config = WebSocketConfig::new(
        std::env::var("EXCHANGE_WS_PUBLIC_URL").unwrap_or_else(|_| "wss://stream.exchange.invalid/public".to_string()),
        std::env::var("EXCHANGE_WS_PRIVATE_URL").unwrap_or_else(|_| "wss://stream.exchange.invalid/private".to_string()),
        trading_config.base_currency.clone(),
        std::env::var("EXCHANGE_API_KEY").unwrap_or_default(),
        std::env::var("EXCHANGE_API_SECRET").unwrap_or_default(),
    );
    let public_ws: Arc<dyn ExchangePublicPort> = Arc::new(PublicWebSocketClient::connect(ws_config.clone()));
    let private_ws = PrivateWebSocketClient::connect(ws_config);

    for asset in &assets {
        if let Err(e) = public_ws.subscribe_candles(asset).await {
            tracing::warn!(%asset, error = %e, "candle subscription failed");
        }
    }

    let interval_ms = parse_interval_ms(&trading_config.candle_interval);
    let mut coordinator = TickCoordinator::new(
        assets,
        interval_ms,
        trading_config.is_simulation,
        Arc::clone(&public_ws),
        Arc::clone(&backend),
    );
    let mut trader = Trader::new(trader_config, backend, exchange);

    let http_port: u16 = std::env::var("HTTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let status_state = StatusState::new();
    let http_addr: SocketAddr = format!("0.0.0.0:{http_port}").parse()?;
    let router = create_router(status_state.clone());
    let listener = TcpListener::bind(http_addr).await?;
    tracing::info!(%http_addr, "operational HTTP surface starting");
    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "http server error");
        }
    });

    tracing::info!("tradeforce engine ready");

    tokio::select! {
        () = run_event_loop(&mut coordinator, &mut trader, Arc::clone(&public_ws), private_ws, &status_state) => {}
        () = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    http_handle.abort();
    tracing::info!(profit = %trader.get_profit(), "tradeforce engine stopped");
    Ok(())
}

async fn run_event_loop(
    coordinator: &mut TickCoordinator,
    trader: &mut Trader,
    public_ws: Arc<dyn ExchangePublicPort>,
    private_ws: PrivateWebSocketClient,
    status_state: &StatusState,
) {
    use tradeforce_engine::application::ports::ExchangePrivatePort;

    loop {
        tokio::select! {
            event = public_ws.next_event() => {
                match event {
                    Ok(PublicEvent::NewCandle { timestamp_ms, symbol, ohlcv }) => {
                        if let Err(e) = coordinator.on_new_candle(timestamp_ms, symbol, ohlcv, trader).await {
                            tracing::warn!(error = %e, "tick coordinator reported an error");
                        }
                        status_state.update(StatusSnapshot {
                            budget: Some(trader.budget()),
                            open_order_count: trader.order_book().open().len(),
                            last_tick_ms: Some(timestamp_ms),
                        });
                    }
                    Ok(other) => coordinator.on_public_event(&other),
                    Err(e) => tracing::warn!(error = %e, "public channel error"),
                }
            }
            event = private_ws.next_event() => {
                match event {
                    Ok(event) => coordinator.on_private_event(event, trader).await,
                    Err(e) => tracing::warn!(error = %e, "private channel error"),
                }
            }
        }
    }
}

/// Parse a candle interval string like `"5min"`/`"1h"` into milliseconds.
fn parse_interval_ms(interval: &str) -> i64 {
    let digits: String = interval.chars().take_while(char::is_ascii_digit).collect();
    let unit = &interval[digits.len()..];
    let n: i64 = digits.parse().unwrap_or(1);
    let unit_ms = match unit {
        "s" | "sec" => 1_000,
        "h" | "hour" => 3_600_000,
        _ => 60_000, // minutes, the common case ("5min")
    };
    n * unit_ms
}

/// Load `.env` from the current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received Ctrl+C"); }
        () = terminate => { tracing::info!("received SIGTERM"); }
    }
}
