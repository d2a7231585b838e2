//! Buy/sell signal detection — pure transforms over close-price slices.
//!
//! Each detector returns a boolean vector aligned index-for-index with its
//! input. Days without enough history are false, never undefined.

use crate::domain::series::PriceSeries;

/// Per-instrument signal triple, aligned to that instrument's price dates.
#[derive(Debug, Clone)]
pub struct SignalSet {
    pub buy: Vec<bool>,
    pub sell_fall: Vec<bool>,
    pub sell_emergency: Vec<bool>,
}

impl SignalSet {
    pub fn compute(series: &PriceSeries, n_rise: usize, m_fall: usize, y_pct: f64) -> Self {
        let closes = series.closes();
        Self {
            buy: detect_consecutive_rises(&closes, n_rise),
            sell_fall: detect_consecutive_falls(&closes, m_fall),
            sell_emergency: detect_emergency_sell(&closes, y_pct),
        }
    }
}

/// True on day `i` iff the last `n` day-over-day changes up to and including
/// day `i` were all strictly positive. A flat day breaks the streak; a streak
/// longer than `n` stays true on every further day.
pub fn detect_consecutive_rises(closes: &[f64], n: usize) -> Vec<bool> {
    let mut out = vec![false; closes.len()];
    if n == 0 {
        return out;
    }
    let mut streak = 0usize;
    for i in 1..closes.len() {
        if closes[i] > closes[i - 1] {
            streak += 1;
        } else {
            streak = 0;
        }
        out[i] = streak >= n;
    }
    out
}

/// Mirror of [`detect_consecutive_rises`] over strictly negative changes.
pub fn detect_consecutive_falls(closes: &[f64], m: usize) -> Vec<bool> {
    let mut out = vec![false; closes.len()];
    if m == 0 {
        return out;
    }
    let mut streak = 0usize;
    for i in 1..closes.len() {
        if closes[i] < closes[i - 1] {
            streak += 1;
        } else {
            streak = 0;
        }
        out[i] = streak >= m;
    }
    out
}

/// True on day `i` iff the close dropped by `y_pct` percent or more against
/// the previous day. The threshold is inclusive: exactly −y% triggers.
pub fn detect_emergency_sell(closes: &[f64], y_pct: f64) -> Vec<bool> {
    let mut out = vec![false; closes.len()];
    for i in 1..closes.len() {
        let prev = closes[i - 1];
        if prev > 0.0 {
            let pct_change = (closes[i] - prev) / prev * 100.0;
            out[i] = pct_change <= -y_pct;
        }
    }
    out
}
