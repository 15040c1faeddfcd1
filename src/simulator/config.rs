//! Simulator kernel parameters (§4.7).

/// Strategy and sizing parameters for one simulator run.
///
/// All fields are 64-bit float, matching the source system's untyped
/// parameter bag; unlike that bag, every recognized field is named here.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Force-sell a position once held this many rows, given
    /// `profit_ratio_limit` is also met.
    pub hold_time_limit: f64,
    /// Minimum `price_current / price_bought` ratio required for the
    /// hold-time sell trigger.
    pub profit_ratio_limit: f64,
    /// Multiplier applied to the buy price to derive the profit target.
    pub profit_factor_target: f64,
    /// Fixed fiat amount invested per buy.
    pub amount_invest_fiat: f64,
    /// Maker fee percentage (sells).
    pub maker_fee: f64,
    /// Taker fee percentage (buys).
    pub taker_fee: f64,
    /// Warm-up row count before a snapshot starts evaluating.
    pub window: f64,
    /// Maximum concurrent open positions; `None` for unlimited.
    pub asset_buy_limit: Option<usize>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
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
}
