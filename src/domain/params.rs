//! Run parameters and closed enums for market / ranking dispatch.

use chrono::NaiveDate;
use serde::Serialize;
use std::str::FromStr;

/// The two composable markets. KOSPI is the domestic (KRW) side, NASDAQ the
/// foreign (USD) side linked through the exchange-rate series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Market {
    #[serde(rename = "KOSPI")]
    Kospi,
    #[serde(rename = "NASDAQ")]
    Nasdaq,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Kospi => "KOSPI",
            Market::Nasdaq => "NASDAQ",
        }
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "KOSPI" => Ok(Market::Kospi),
            "NASDAQ" => Ok(Market::Nasdaq),
            other => Err(format!("unknown market: {other}")),
        }
    }
}

/// Buy-candidate ranking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RankMethod {
    /// Descending by the listing snapshot's fixed market-cap figure.
    #[serde(rename = "market_cap")]
    MarketCap,
    /// Descending by return over the trailing `n_rise_days` observations.
    #[serde(rename = "return_rate")]
    TrailingReturn,
}

impl FromStr for RankMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market_cap" => Ok(RankMethod::MarketCap),
            "return_rate" => Ok(RankMethod::TrailingReturn),
            other => Err(format!("unknown sort method: {other}")),
        }
    }
}

/// Immutable configuration for one backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestParams {
    pub initial_cash: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Fee rate in percent (0.015 means 0.015%).
    pub fee_rate: f64,
    /// Buy signal: consecutive rising days.
    pub n_rise_days: usize,
    /// Sell signal: consecutive falling days.
    pub m_fall_days: usize,
    /// Emergency sell: day-over-day drop in percent.
    pub y_emergency_pct: f64,
    /// Per-instrument cash cap for a single buy.
    pub max_buy_amount: f64,
    /// Minimum cash to keep after a buy.
    pub min_balance: f64,
    pub rank_method: RankMethod,
    /// KOSPI share of initial cash in percent (0–100); the remainder goes
    /// to NASDAQ. 100 and 0 denote single-market runs.
    pub kospi_ratio: u8,
}

impl BacktestParams {
    /// Defaults mirror the configuration surface: 0.015% fee, 3-day rise/fall
    /// streaks, 5% emergency drop, capitalization ranking, KOSPI only.
    pub fn new(
        initial_cash: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        max_buy_amount: f64,
        min_balance: f64,
    ) -> Self {
        Self {
            initial_cash,
            start_date,
            end_date,
            fee_rate: 0.015,
            n_rise_days: 3,
            m_fall_days: 3,
            y_emergency_pct: 5.0,
            max_buy_amount,
            min_balance,
            rank_method: RankMethod::MarketCap,
            kospi_ratio: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_round_trip() {
        assert_eq!("KOSPI".parse::<Market>().unwrap(), Market::Kospi);
        assert_eq!("nasdaq".parse::<Market>().unwrap(), Market::Nasdaq);
        assert_eq!(Market::Kospi.as_str(), "KOSPI");
        assert!("NYSE".parse::<Market>().is_err());
    }

    #[test]
    fn rank_method_parses_config_tokens() {
        assert_eq!(
            "market_cap".parse::<RankMethod>().unwrap(),
            RankMethod::MarketCap
        );
        assert_eq!(
            "return_rate".parse::<RankMethod>().unwrap(),
            RankMethod::TrailingReturn
        );
        assert!("alphabetical".parse::<RankMethod>().is_err());
    }

    #[test]
    fn params_defaults() {
        let params = BacktestParams::new(
            10_000_000.0,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            5_000_000.0,
            1_000_000.0,
        );
        assert!((params.fee_rate - 0.015).abs() < f64::EPSILON);
        assert_eq!(params.n_rise_days, 3);
        assert_eq!(params.m_fall_days, 3);
        assert!((params.y_emergency_pct - 5.0).abs() < f64::EPSILON);
        assert_eq!(params.rank_method, RankMethod::MarketCap);
        assert_eq!(params.kospi_ratio, 100);
    }
}
