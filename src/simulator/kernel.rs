//! Simulator kernel: the per-step buy/sell evaluation loop over fixed-width
//! buybag/soldbag rows (§4.7).

use crate::domain::shared::{calc_fee, Side};
use crate::simulator::config::SimParams;

/// Plausibility clamp threshold: a `price_current / price_profit` ratio
/// above this is treated as noise, not a real fill price (§4.7 step 4).
const PLAUSIBILITY_CLAMP_RATIO: f64 = 1.2;

/// An open simulated position: a fixed-width row, one per buy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuybagRow {
    /// Index into the price matrix's asset columns.
    pub asset_idx: usize,
    /// Ordinal of this buy within the run.
    pub buy_iter: usize,
    /// Row index (time step) at which the buy executed.
    pub row_idx_bought: usize,
    /// Fill price of the buy.
    pub price_bought: f64,
    /// Target sell price (`price_bought * profit_factor_target`).
    pub price_profit: f64,
    /// Fiat amount invested.
    pub amount_fiat: f64,
    /// Crypto amount received after the buy fee.
    pub amount_crypto: f64,
    /// Fee paid on the buy, in fiat.
    pub fee_buy_fiat: f64,
    /// Budget remaining immediately after this buy.
    pub budget_after_buy: f64,
}

/// A settled simulated position: a [`BuybagRow`] plus its sell-side fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoldbagRow {
    /// The buy-side fields this sell closes out.
    pub buy: BuybagRow,
    /// Row index (time step) at which the sell executed.
    pub row_idx_sold: usize,
    /// Fill price of the sell (after plausibility clamping).
    pub price_sold: f64,
    /// Fiat proceeds of the sell, before fees.
    pub sold_fiat: f64,
    /// Crypto amount sold, after the sell fee.
    pub sold_crypto: f64,
    /// Fee paid on the sell, in fiat.
    pub fee_sell_fiat: f64,
    /// Realized profit in fiat.
    pub profit_fiat: f64,
    /// Current fiat value of all remaining open buys, as of this step.
    pub crypto_value_fiat: f64,
    /// `crypto_value_fiat + budget`, as of this step.
    pub total_value: f64,
    /// Count of open buys remaining, as of this step.
    pub n_open_buys: usize,
    /// Ordinal of this sell within the run.
    pub sell_iter: usize,
    /// Index into the price matrix's asset columns.
    pub sell_idx: usize,
}

/// Evaluate every open `buybag` row against `prices_row`, moving triggered
/// sells into `soldbag` and crediting `budget`.
///
/// Iteration is row-index ascending and all arithmetic is 64-bit float, per
/// the kernel's determinism requirement.
pub fn check_sell(
    params: &SimParams,
    sell_iter_start: usize,
    row_idx: usize,
    buybag: &mut Vec<BuybagRow>,
    soldbag: &mut Vec<SoldbagRow>,
    prices_row: &[f64],
    budget: &mut f64,
) {
    let mut to_remove = Vec::new();
    let mut sell_iter = sell_iter_start;

    for (idx, row) in buybag.iter().enumerate() {
        let Some(&price_current_raw) = prices_row.get(row.asset_idx) else {
            continue;
        };
        let time_since_buy = (row_idx - row.row_idx_bought) as f64;
        let profit_ratio = price_current_raw / row.price_bought;

        let triggers = price_current_raw >= row.price_profit
            || (time_since_buy > params.hold_time_limit && profit_ratio >= params.profit_ratio_limit);
        if !triggers {
            continue;
        }

        let price_sold = if price_current_raw / row.price_profit > PLAUSIBILITY_CLAMP_RATIO {
            row.price_profit
        } else {
            price_current_raw
        };

        let fee = calc_fee(row.amount_crypto, params.maker_fee, params.taker_fee, price_sold, Side::Sell);
        let sold_fiat = fee.volume_after_fee * price_sold;
        *budget += sold_fiat;

        soldbag.push(SoldbagRow {
            buy: *row,
            row_idx_sold: row_idx,
            price_sold,
            sold_fiat,
            sold_crypto: fee.volume_after_fee,
            fee_sell_fiat: fee.fee_fiat,
            // Both fees are already embedded in reduced volumes (buy fee in
            // `amount_crypto`, sell fee in `sold_fiat` via `volume_after_fee`),
            // so the cash delta against budget is simply proceeds minus cost.
            profit_fiat: sold_fiat - row.amount_fiat,
            crypto_value_fiat: 0.0,
            total_value: 0.0,
            n_open_buys: 0,
            sell_iter,
            sell_idx: row.asset_idx,
        });
        sell_iter += 1;
        to_remove.push(idx);
    }

    for &idx in to_remove.iter().rev() {
        buybag.remove(idx);
    }

    if to_remove.is_empty() {
        return;
    }

    let crypto_value_fiat: f64 = buybag
        .iter()
        .filter_map(|row| prices_row.get(row.asset_idx).map(|p| row.amount_crypto * p))
        .sum();
    let total_value = crypto_value_fiat + *budget;
    let n_open_buys = buybag.len();

    let newly_sold_count = to_remove.len();
    let start = soldbag.len() - newly_sold_count;
    for row in soldbag[start..].iter_mut().rev() {
        row.crypto_value_fiat = crypto_value_fiat;
        row.total_value = total_value;
        row.n_open_buys = n_open_buys;
    }
}

/// Evaluate buy candidates against `prices_row`: one open position per
/// asset, respecting `asset_buy_limit` and `budget` (§4.5A, mirrored here
/// for the simulator).
pub fn check_buy(
    params: &SimParams,
    buy_iter_start: usize,
    row_idx: usize,
    buybag: &mut Vec<BuybagRow>,
    prices_row: &[f64],
    budget: &mut f64,
) {
    let mut buy_iter = buy_iter_start;

    for (asset_idx, &price) in prices_row.iter().enumerate() {
        if price <= 0.0 {
            continue;
        }
        if buybag.iter().any(|row| row.asset_idx == asset_idx) {
            continue;
        }
        if *budget < params.amount_invest_fiat {
            continue;
        }
        if let Some(limit) = params.asset_buy_limit {
            if buybag.len() >= limit {
                continue;
            }
        }

        let volume_crypto = params.amount_invest_fiat / price;
        let fee = calc_fee(volume_crypto, params.maker_fee, params.taker_fee, price, Side::Buy);

        *budget -= params.amount_invest_fiat;
        buybag.push(BuybagRow {
            asset_idx,
            buy_iter,
            row_idx_bought: row_idx,
            price_bought: price,
            price_profit: price * params.profit_factor_target,
            amount_fiat: params.amount_invest_fiat,
            amount_crypto: fee.volume_after_fee,
            fee_buy_fiat: fee.fee_fiat,
            budget_after_buy: *budget,
        });
        buy_iter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SimParams {
        SimParams {
            hold_time_limit: 100.0,
            profit_ratio_limit: 1.05,
            profit_factor_target: 1.1,
            amount_invest_fiat: 100.0,
            maker_fee: 0.1,
            taker_fee: 0.2,
            window: 0.0,
            asset_buy_limit: None,
        }
    }

    fn row(price_bought: f64, price_profit: f64, row_idx_bought: usize) -> BuybagRow {
        BuybagRow {
            asset_idx: 0,
            buy_iter: 0,
            row_idx_bought,
            price_bought,
            price_profit,
            amount_fiat: 100.0,
            amount_crypto: 1.0,
            fee_buy_fiat: 0.2,
            budget_after_buy: 900.0,
        }
    }

    #[test]
    fn s2_sells_by_profit_trigger_no_clamp() {
        let mut buybag = vec![row(100.0, 110.0, 0)];
        let mut soldbag = Vec::new();
        let mut budget = 900.0;
        check_sell(&params(), 0, 5, &mut buybag, &mut soldbag, &[111.0], &mut budget);
        assert!(buybag.is_empty());
        assert_eq!(soldbag.len(), 1);
        assert!((soldbag[0].price_sold - 111.0).abs() < 1e-9);
    }

    #[test]
    fn s3_sells_by_hold_time_trigger() {
        let mut buybag = vec![row(100.0, 110.0, 0)];
        let mut soldbag = Vec::new();
        let mut budget = 900.0;
        check_sell(&params(), 0, 200, &mut buybag, &mut soldbag, &[106.0], &mut budget);
        assert_eq!(soldbag.len(), 1);
        assert!((soldbag[0].price_sold - 106.0).abs() < 1e-9);
    }

    #[test]
    fn s4_plausibility_clamp_caps_sale_price() {
        let mut buybag = vec![row(100.0, 110.0, 0)];
        let mut soldbag = Vec::new();
        let mut budget = 900.0;
        check_sell(&params(), 0, 50, &mut buybag, &mut soldbag, &[140.0], &mut budget);
        assert_eq!(soldbag.len(), 1);
        assert!((soldbag[0].price_sold - 110.0).abs() < 1e-9);
    }

    #[test]
    fn no_trigger_leaves_buybag_untouched() {
        let mut buybag = vec![row(100.0, 110.0, 0)];
        let mut soldbag = Vec::new();
        let mut budget = 900.0;
        check_sell(&params(), 0, 10, &mut buybag, &mut soldbag, &[101.0], &mut budget);
        assert_eq!(buybag.len(), 1);
        assert!(soldbag.is_empty());
    }

    #[test]
    fn aggregates_backfilled_identically_across_step() {
        let mut buybag = vec![row(100.0, 110.0, 0), row(100.0, 105.0, 0)];
        buybag[1].asset_idx = 1;
        let mut soldbag = Vec::new();
        let mut budget = 800.0;
        check_sell(
            &params(),
            0,
            5,
            &mut buybag,
            &mut soldbag,
            &[111.0, 106.0],
            &mut budget,
        );
        assert_eq!(soldbag.len(), 2);
        assert_eq!(soldbag[0].total_value, soldbag[1].total_value);
        assert_eq!(soldbag[0].n_open_buys, 0);
    }

    #[test]
    fn check_buy_respects_one_position_per_asset() {
        let mut buybag = vec![row(100.0, 110.0, 0)];
        let mut budget = 1000.0;
        check_buy(&params(), 1, 1, &mut buybag, &[105.0], &mut budget);
        assert_eq!(buybag.len(), 1);
    }

    #[test]
    fn check_buy_respects_budget_and_limit() {
        let mut buybag = Vec::new();
        let mut budget = 150.0;
        let mut capped_params = params();
        capped_params.asset_buy_limit = Some(1);
        check_buy(&capped_params, 0, 0, &mut buybag, &[100.0, 100.0], &mut budget);
        assert_eq!(buybag.len(), 1);
        assert!((budget - 50.0).abs() < 1e-9);
    }
}
