//! Snapshot indexing and parallel multi-range simulator runs (§4.7, §5).

use rayon::prelude::*;

use crate::domain::shared::Symbol;
use crate::simulator::config::SimParams;
use crate::simulator::kernel::{check_buy, check_sell, BuybagRow, SoldbagRow};

/// `amount` evenly-spaced integer row indices between `window` and
/// `boundary − size`, used to run the simulator over disjoint sub-ranges.
#[must_use]
pub fn get_snapshot_indices(window: usize, boundary: usize, amount: usize, size: usize) -> Vec<usize> {
    if amount == 0 || boundary <= size || window >= boundary - size {
        return Vec::new();
    }
    let span = (boundary - size) - window;
    if amount == 1 {
        return vec![window];
    }
    (0..amount)
        .map(|i| window + (span * i) / (amount - 1))
        .collect()
}

/// Result of evaluating the kernel over one snapshot's row range.
#[derive(Debug, Clone)]
pub struct SnapshotResult {
    /// Starting row index of this snapshot.
    pub start_row: usize,
    /// Positions still open at the end of the snapshot.
    pub open: Vec<BuybagRow>,
    /// Positions closed during the snapshot.
    pub closed: Vec<SoldbagRow>,
    /// Budget at the end of the snapshot.
    pub final_budget: f64,
}

/// Run the kernel over `[start_row, start_row + size)` of `prices`, starting
/// from `initial_budget`. `prices[t]` is the row of close prices at step
/// `t`, one column per asset in `assets`' order.
#[must_use]
pub fn run_snapshot(
    params: &SimParams,
    prices: &[Vec<f64>],
    start_row: usize,
    size: usize,
    initial_budget: f64,
) -> SnapshotResult {
    let mut buybag = Vec::new();
    let mut soldbag = Vec::new();
    let mut budget = initial_budget;
    let mut buy_iter = 0;
    let mut sell_iter = 0;

    let end_row = (start_row + size).min(prices.len());
    for row_idx in start_row..end_row {
        let prices_row = &prices[row_idx];
        check_sell(params, sell_iter, row_idx, &mut buybag, &mut soldbag, prices_row, &mut budget);
        sell_iter = soldbag.len();
        check_buy(params, buy_iter, row_idx, &mut buybag, prices_row, &mut budget);
        buy_iter = buybag.len() + sell_iter;
    }

    SnapshotResult {
        start_row,
        open: buybag,
        closed: soldbag,
        final_budget: budget,
    }
}

/// Run the kernel independently over every snapshot index, in parallel.
///
/// Each snapshot owns its own buybag/soldbag/budget; no mutation is visible
/// across snapshots (§5).
#[must_use]
pub fn run_snapshots_parallel(
    params: &SimParams,
    prices: &[Vec<f64>],
    snapshot_indices: &[usize],
    size: usize,
    initial_budget: f64,
) -> Vec<SnapshotResult> {
    snapshot_indices
        .par_iter()
        .map(|&start_row| run_snapshot(params, prices, start_row, size, initial_budget))
        .collect()
}

/// Flatten a [`crate::domain::market_data::CandleRow`] sequence into a
/// dense close-price matrix, one column per `assets` entry (in `assets`
/// order) — the shape [`run_snapshot`] expects.
#[must_use]
pub fn build_price_matrix(
    rows: &[crate::domain::market_data::CandleRow],
    assets: &[Symbol],
) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| {
            assets
                .iter()
                .map(|asset| row.get(asset).map_or(0.0, |o| o.close))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_snapshot_indices_spans_window_to_boundary_minus_size() {
        let indices = get_snapshot_indices(0, 100, 3, 10);
        assert_eq!(indices, vec![0, 45, 90]);
    }

    #[test]
    fn get_snapshot_indices_single_amount_returns_window() {
        assert_eq!(get_snapshot_indices(5, 100, 1, 10), vec![5]);
    }

    #[test]
    fn get_snapshot_indices_empty_when_window_past_boundary() {
        assert!(get_snapshot_indices(95, 100, 3, 10).is_empty());
    }

    #[test]
    fn property_3_profit_equals_budget_delta() {
        let params = SimParams {
            asset_buy_limit: Some(1),
            ..SimParams::default()
        };
        let prices = vec![
            vec![100.0],
            vec![100.0],
            vec![115.0],
            vec![115.0],
        ];
        let result = run_snapshot(&params, &prices, 0, 4, 1000.0);
        let sum_profit: f64 = result.closed.iter().map(|r| r.profit_fiat).sum();
        let budget_delta = result.final_budget - 1000.0
            + result.open.iter().map(|r| r.amount_fiat).sum::<f64>();
        assert!((sum_profit - budget_delta).abs() < 1e-6);
    }

    #[test]
    fn snapshots_run_independently_in_parallel() {
        let params = SimParams::default();
        let prices = vec![vec![100.0]; 20];
        let indices = get_snapshot_indices(0, 20, 2, 5);
        let results = run_snapshots_parallel(&params, &prices, &indices, 5, 1000.0);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| (r.final_budget - 1000.0).abs() < 1e-9));
    }
}
