//! Simulator: the vectorized buy/sell evaluation kernel and the
//! multi-snapshot parallel runner (§4.7, §5).

pub mod config;
pub mod kernel;
pub mod snapshot;

pub use config::SimParams;
pub use kernel::{check_buy, check_sell, BuybagRow, SoldbagRow};
pub use snapshot::{build_price_matrix, get_snapshot_indices, run_snapshot, run_snapshots_parallel, SnapshotResult};
