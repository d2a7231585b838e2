//! Dual-market composition: capital split, currency conversion, two
//! independent engine runs, and the as-of merge into one result.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::engine::{run_backtest, BacktestResult, ProgressFn};
use crate::domain::error::DuotraderError;
use crate::domain::ledger::DailySnapshot;
use crate::domain::listing::Listing;
use crate::domain::metrics::Metrics;
use crate::domain::params::{BacktestParams, Market};
use crate::domain::series::{at_or_before, IndexSeries, PriceSeries};

/// Everything a composed run consumes beyond the shared parameters. The
/// exchange rate quotes KRW per USD.
#[derive(Debug, Clone, Default)]
pub struct DualMarketData {
    pub kospi_prices: BTreeMap<String, PriceSeries>,
    pub nasdaq_prices: BTreeMap<String, PriceSeries>,
    pub kospi_listing: Option<Listing>,
    pub nasdaq_listing: Option<Listing>,
    pub kospi_index: Option<IndexSeries>,
    pub nasdaq_index: Option<IndexSeries>,
    pub exchange_rate: IndexSeries,
}

/// Runs both markets and merges them into one KRW-denominated result.
///
/// Ratios of 100 and 0 degenerate to a plain single-market run on the
/// corresponding side; no currency conversion happens and the other
/// market's result fields stay empty. Composed runs resolve the exchange
/// rate once at the start date to split capital, and thereafter per day
/// (as-of) to value the foreign snapshots. An empty exchange-rate series
/// is the one fatal input for a composed run.
pub fn run_dual_backtest(
    params: &BacktestParams,
    data: &DualMarketData,
    mut progress: Option<ProgressFn<'_>>,
) -> Result<BacktestResult, DuotraderError> {
    match params.kospi_ratio {
        100 => {
            return Ok(run_backtest(
                params,
                &data.kospi_prices,
                data.kospi_listing.as_ref(),
                data.kospi_index.as_ref(),
                progress,
            ));
        }
        0 => {
            return Ok(run_backtest(
                params,
                &data.nasdaq_prices,
                data.nasdaq_listing.as_ref(),
                data.nasdaq_index.as_ref(),
                progress,
            ));
        }
        _ => {}
    }

    let initial_rate = data
        .exchange_rate
        .value_as_of(params.start_date)
        .ok_or(DuotraderError::EmptyExchangeRate)?;

    let ratio = f64::from(params.kospi_ratio) / 100.0;
    let kospi_cash = params.initial_cash * ratio;
    let nasdaq_cash_krw = params.initial_cash * (1.0 - ratio);

    let mut kospi_params = params.clone();
    kospi_params.initial_cash = kospi_cash;
    kospi_params.kospi_ratio = 100;

    // The foreign sub-portfolio runs entirely in USD: cash, the buy cap and
    // the floor all convert once at the start-date rate.
    let mut nasdaq_params = params.clone();
    nasdaq_params.initial_cash = nasdaq_cash_krw / initial_rate;
    nasdaq_params.max_buy_amount = params.max_buy_amount / initial_rate;
    nasdaq_params.min_balance = params.min_balance / initial_rate;
    nasdaq_params.kospi_ratio = 0;

    // Each half reports progress over a doubled total so the combined run
    // reads as one pass from 0 to 2N.
    let mut kospi_result = match progress.as_deref_mut() {
        Some(cb) => {
            let mut half = |cur: usize, tot: usize| cb(cur, tot * 2);
            run_backtest(
                &kospi_params,
                &data.kospi_prices,
                data.kospi_listing.as_ref(),
                data.kospi_index.as_ref(),
                Some(&mut half),
            )
        }
        None => run_backtest(
            &kospi_params,
            &data.kospi_prices,
            data.kospi_listing.as_ref(),
            data.kospi_index.as_ref(),
            None,
        ),
    };
    let mut nasdaq_result = match progress.as_deref_mut() {
        Some(cb) => {
            let mut half = |cur: usize, tot: usize| cb(tot + cur, tot * 2);
            run_backtest(
                &nasdaq_params,
                &data.nasdaq_prices,
                data.nasdaq_listing.as_ref(),
                data.nasdaq_index.as_ref(),
                Some(&mut half),
            )
        }
        None => run_backtest(
            &nasdaq_params,
            &data.nasdaq_prices,
            data.nasdaq_listing.as_ref(),
            data.nasdaq_index.as_ref(),
            None,
        ),
    };

    for trade in &mut kospi_result.trades {
        trade.market = Some(Market::Kospi);
    }
    for trade in &mut nasdaq_result.trades {
        trade.market = Some(Market::Nasdaq);
    }

    let combined_snapshots = merge_snapshots(
        &kospi_result.daily_snapshots,
        &nasdaq_result.daily_snapshots,
        &data.exchange_rate,
    );

    let mut trades = kospi_result.trades;
    trades.extend(nasdaq_result.trades);
    trades.sort_by_key(|t| t.date);

    let mut metrics = Metrics::compute(&combined_snapshots, &trades, params.initial_cash);
    // Fee totals convert at the fixed start rate, not the daily as-of rate
    // used for snapshot valuation.
    let kospi_fees: f64 = trades
        .iter()
        .filter(|t| t.market == Some(Market::Kospi))
        .map(|t| t.fee)
        .sum();
    let nasdaq_fees: f64 = trades
        .iter()
        .filter(|t| t.market == Some(Market::Nasdaq))
        .map(|t| t.fee)
        .sum();
    metrics.total_fee = (kospi_fees + nasdaq_fees * initial_rate).round();

    let mut result = BacktestResult::assemble(combined_snapshots, trades, metrics);
    result.kospi_index = kospi_result.benchmark_index;
    result.nasdaq_index = nasdaq_result.benchmark_index;
    result.exchange_rate = Some(data.exchange_rate.clone());
    result.initial_exchange_rate = initial_rate;
    result.kospi_snapshots = kospi_result.daily_snapshots;
    result.nasdaq_snapshots = nasdaq_result.daily_snapshots;
    Ok(result)
}

/// One combined KRW snapshot per distinct date across both markets. Each
/// side contributes its latest snapshot at or before the date, or nothing
/// while it has no history yet; the USD side converts at that day's as-of
/// rate.
fn merge_snapshots(
    kospi: &[DailySnapshot],
    nasdaq: &[DailySnapshot],
    exchange_rate: &IndexSeries,
) -> Vec<DailySnapshot> {
    let dates: BTreeSet<NaiveDate> = kospi
        .iter()
        .chain(nasdaq.iter())
        .map(|s| s.date)
        .collect();

    dates
        .into_iter()
        .map(|date| {
            let k = at_or_before(kospi, date, |s| s.date);
            let n = at_or_before(nasdaq, date, |s| s.date);
            let rate = exchange_rate.value_as_of(date).unwrap_or(0.0);

            let cash = k.map_or(0.0, |s| s.cash) + n.map_or(0.0, |s| s.cash) * rate;
            let stock_value =
                k.map_or(0.0, |s| s.stock_value) + n.map_or(0.0, |s| s.stock_value) * rate;
            DailySnapshot {
                date,
                cash,
                stock_value,
                total_value: cash + stock_value,
            }
        })
        .collect()
}
