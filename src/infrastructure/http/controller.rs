//! Minimal operational HTTP surface: `/health` and `/status` (§11).
//!
//! Not part of the core's specified interfaces; carries no business logic.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Money;

/// Fields the `/status` endpoint reports, refreshed by the coordinator
/// after every fired tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Current budget, if known.
    pub budget: Option<Money>,
    /// Number of currently open positions.
    pub open_order_count: usize,
    /// Timestamp (ms) of the last fired tick, if any.
    pub last_tick_ms: Option<i64>,
}

/// Shared, mutable status state updated from the coordinator's tick loop
/// and read by the HTTP handlers.
#[derive(Debug, Clone, Default)]
pub struct StatusState(Arc<RwLock<StatusSnapshot>>);

impl StatusState {
    /// Create empty status state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot.
    pub fn update(&self, snapshot: StatusSnapshot) {
        *self.0.write() = snapshot;
    }

    /// Read the current snapshot.
    #[must_use]
    pub fn get(&self) -> StatusSnapshot {
        self.0.read().clone()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Build the `/health` + `/status` router.
#[must_use]
pub fn create_router(state: StatusState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}

async fn status(State(state): State<StatusState>) -> impl IntoResponse {
    Json(state.get())
}
