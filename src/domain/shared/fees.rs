//! Fee and percentage-change arithmetic primitives.
//!
//! All arithmetic here is 64-bit float, matching the source system exactly —
//! no rounding happens in this module; callers round at presentation
//! boundaries (e.g. `Trader::get_profit`).

use super::value_objects::Side;

/// Result of a fee calculation: volume remaining after the fee, the fee
/// itself denominated in the traded asset, and the fee denominated in fiat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeBreakdown {
    /// Volume of the traded asset after the fee is deducted.
    pub volume_after_fee: f64,
    /// Fee amount, denominated in the traded asset.
    pub fee_asset: f64,
    /// Fee amount, denominated in fiat (`fee_asset * price`).
    pub fee_fiat: f64,
}

/// Compute the fee for a trade.
///
/// `fee_pct` is the taker fee for a buy, the maker fee for a sell — fee
/// schedules are asymmetric by design (makers add liquidity, takers remove
/// it). `volume_asset` is taken as an absolute value: callers may pass a
/// signed volume (negative for sells) without pre-normalizing.
#[must_use]
pub fn calc_fee(
    volume_asset: f64,
    maker_fee_pct: f64,
    taker_fee_pct: f64,
    price: f64,
    side: Side,
) -> FeeBreakdown {
    let fee_pct = match side {
        Side::Buy => taker_fee_pct,
        Side::Sell => maker_fee_pct,
    };
    let volume_asset = volume_asset.abs();
    let fee_asset = volume_asset * fee_pct / 100.0;
    let volume_after_fee = volume_asset - fee_asset;
    let fee_fiat = fee_asset * price;

    FeeBreakdown {
        volume_after_fee,
        fee_asset,
        fee_fiat,
    }
}

/// Percentage change of each column in `matrix`, row over row.
///
/// Row 0 of the result is all zeros. For `t >= 1`:
/// `result[t][k] = (matrix[t][k] - matrix[t-1][k]) / matrix[t][k]`.
///
/// The divisor is the *current* row, not the previous one — this is a
/// deliberately preserved quirk of the source system (a "reverse" percent
/// change), not a bug to silently fix. Callers comparing against a
/// conventional percent-change definition will see the numerator's sign
/// match intuition but the magnitude differ.
#[must_use]
pub fn pct_change(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    if matrix.is_empty() {
        return Vec::new();
    }
    let cols = matrix[0].len();
    let mut out = vec![vec![0.0_f64; cols]; matrix.len()];

    for t in 1..matrix.len() {
        for k in 0..cols {
            let current = matrix[t][k];
            let previous = matrix[t - 1][k];
            out[t][k] = (current - previous) / current;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_fee_math_buy() {
        // S1: calc_fee(1.0, 0.1, 0.2, 20000, "buy")
        let result = calc_fee(1.0, 0.1, 0.2, 20_000.0, Side::Buy);
        assert!((result.volume_after_fee - 0.998).abs() < 1e-9);
        assert!((result.fee_asset - 0.002).abs() < 1e-9);
        assert!((result.fee_fiat - 40.0).abs() < 1e-9);
    }

    #[test]
    fn fee_uses_maker_for_sell() {
        let result = calc_fee(1.0, 0.1, 0.2, 20_000.0, Side::Sell);
        assert!((result.fee_asset - 0.001).abs() < 1e-9);
    }

    #[test]
    fn fee_normalizes_negative_volume() {
        let buy = calc_fee(1.0, 0.1, 0.2, 20_000.0, Side::Sell);
        let sell = calc_fee(-1.0, 0.1, 0.2, 20_000.0, Side::Sell);
        assert_eq!(buy, sell);
    }

    #[test]
    fn pct_change_first_row_is_zero() {
        let m = vec![vec![100.0, 200.0], vec![110.0, 190.0]];
        let result = pct_change(&m);
        assert_eq!(result[0], vec![0.0, 0.0]);
    }

    #[test]
    fn pct_change_divides_by_current_row() {
        let m = vec![vec![100.0], vec![110.0], vec![99.0]];
        let result = pct_change(&m);
        // row 1: (110 - 100) / 110
        assert!((result[1][0] - (10.0 / 110.0)).abs() < 1e-12);
        // row 2: (99 - 110) / 99
        assert!((result[2][0] - (-11.0 / 99.0)).abs() < 1e-12);
    }

    #[test]
    fn pct_change_empty_matrix() {
        let m: Vec<Vec<f64>> = Vec::new();
        assert!(pct_change(&m).is_empty());
    }
}
