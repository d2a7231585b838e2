//! Summary metrics derived from snapshot and trade histories.

use serde::Serialize;

use crate::domain::ledger::{DailySnapshot, Side, Trade};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    /// Final return over initial cash, percent, 2 decimals.
    pub final_return_pct: f64,
    /// Maximum drawdown, percent, 2 decimals. Always ≤ 0.
    pub mdd_pct: f64,
    /// Share of sell trades with positive realized profit, percent, 1 decimal.
    pub win_rate_pct: f64,
    /// Sum of fees over all trades, rounded to whole units.
    pub total_fee: f64,
    pub total_trades: usize,
}

impl Metrics {
    pub fn compute(snapshots: &[DailySnapshot], trades: &[Trade], initial_cash: f64) -> Self {
        let (final_return_pct, mdd_pct) = if snapshots.is_empty() {
            (0.0, 0.0)
        } else {
            let last = snapshots[snapshots.len() - 1].total_value;
            let final_return = if initial_cash > 0.0 {
                (last - initial_cash) / initial_cash * 100.0
            } else {
                0.0
            };
            (round_to(final_return, 2), round_to(max_drawdown(snapshots), 2))
        };

        let sells: Vec<&Trade> = trades.iter().filter(|t| t.side == Side::Sell).collect();
        let win_rate = if sells.is_empty() {
            0.0
        } else {
            let wins = sells.iter().filter(|t| t.profit > 0.0).count();
            wins as f64 / sells.len() as f64 * 100.0
        };

        let total_fee: f64 = trades.iter().map(|t| t.fee).sum();

        Metrics {
            final_return_pct,
            mdd_pct,
            win_rate_pct: round_to(win_rate, 1),
            total_fee: total_fee.round(),
            total_trades: trades.len(),
        }
    }
}

/// Most negative percentage decline from the running peak of total value.
/// Zero for a monotonically non-decreasing path.
fn max_drawdown(snapshots: &[DailySnapshot]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut mdd = 0.0f64;
    for snap in snapshots {
        if snap.total_value > peak {
            peak = snap.total_value;
        }
        if peak > 0.0 {
            let drawdown = (snap.total_value - peak) / peak * 100.0;
            if drawdown < mdd {
                mdd = drawdown;
            }
        }
    }
    mdd
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
