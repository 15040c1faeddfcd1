//! Use cases: the trader core and the WS tick coordinator.

pub mod tick_coordinator;
pub mod trader;

pub use tick_coordinator::{SyncError, TickCoordinator, TickState};
pub use trader::{finalize_trading_config, Trader, TraderConfig, TraderError};
