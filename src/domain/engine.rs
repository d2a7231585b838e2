//! Single-market backtest engine: signal precompute, the chronological
//! sell → buy → snapshot day loop, and result assembly.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::ledger::{DailySnapshot, Ledger, Trade};
use crate::domain::listing::Listing;
use crate::domain::metrics::Metrics;
use crate::domain::params::{BacktestParams, RankMethod};
use crate::domain::series::{IndexSeries, PriceSeries};
use crate::domain::signal::SignalSet;

/// Optional per-day progress observer, called with (days done, total days).
/// Purely observational; results never depend on it.
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize);

/// Aggregate result of a single- or dual-market run. Per-market fields are
/// populated by the dual composer only and stay empty for single runs.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub daily_snapshots: Vec<DailySnapshot>,
    pub trades: Vec<Trade>,
    /// Caller-supplied benchmark, passed through unchanged (single runs).
    pub benchmark_index: Option<IndexSeries>,
    pub kospi_index: Option<IndexSeries>,
    pub nasdaq_index: Option<IndexSeries>,
    pub exchange_rate: Option<IndexSeries>,
    /// FX rate resolved at the run's start date (dual runs only).
    pub initial_exchange_rate: f64,
    pub kospi_snapshots: Vec<DailySnapshot>,
    pub nasdaq_snapshots: Vec<DailySnapshot>,
    pub final_return_pct: f64,
    pub mdd_pct: f64,
    pub win_rate_pct: f64,
    pub total_fee: f64,
    pub total_trades: usize,
}

impl BacktestResult {
    pub(crate) fn assemble(
        daily_snapshots: Vec<DailySnapshot>,
        trades: Vec<Trade>,
        metrics: Metrics,
    ) -> Self {
        BacktestResult {
            daily_snapshots,
            trades,
            benchmark_index: None,
            kospi_index: None,
            nasdaq_index: None,
            exchange_rate: None,
            initial_exchange_rate: 0.0,
            kospi_snapshots: Vec::new(),
            nasdaq_snapshots: Vec::new(),
            final_return_pct: metrics.final_return_pct,
            mdd_pct: metrics.mdd_pct,
            win_rate_pct: metrics.win_rate_pct,
            total_fee: metrics.total_fee,
            total_trades: metrics.total_trades,
        }
    }
}

/// Runs one market end to end.
///
/// The trading calendar is the sorted union of every instrument's own dates;
/// instruments need not share one. Within a day, sells settle before buys so
/// freed cash can fund same-day purchases, then the end-of-day snapshot is
/// taken. Degenerate input (no instruments, no dates) yields an empty result
/// with all-zero metrics.
pub fn run_backtest(
    params: &BacktestParams,
    price_data: &BTreeMap<String, PriceSeries>,
    listing: Option<&Listing>,
    benchmark: Option<&IndexSeries>,
    mut progress: Option<ProgressFn<'_>>,
) -> BacktestResult {
    let mut ledger = Ledger::new(params.initial_cash, params.fee_rate);

    let name_of = |code: &str| -> String {
        listing
            .and_then(|l| l.name_of(code))
            .unwrap_or(code)
            .to_string()
    };

    let signals: BTreeMap<&str, SignalSet> = price_data
        .iter()
        .filter(|(_, series)| !series.is_empty())
        .map(|(code, series)| {
            (
                code.as_str(),
                SignalSet::compute(series, params.n_rise_days, params.m_fall_days, params.y_emergency_pct),
            )
        })
        .collect();

    let calendar = trading_calendar(price_data);
    let total_days = calendar.len();

    for (day_idx, &date) in calendar.iter().enumerate() {
        // Sell phase: liquidate held instruments whose fall or emergency
        // signal fires today. Both triggers mean the same full liquidation.
        let mut held: Vec<String> = ledger.holdings.keys().cloned().collect();
        held.sort();
        for code in held {
            let Some(sig) = signals.get(code.as_str()) else {
                continue;
            };
            let series = &price_data[&code];
            let Some(idx) = series.index_on(date) else {
                continue;
            };
            if sig.sell_fall[idx] || sig.sell_emergency[idx] {
                let price = series.points()[idx].close;
                ledger.sell_all(date, &code, &name_of(&code), price);
            }
        }

        // Buy phase: rank today's signal candidates, then buy in order until
        // cash drops through the floor.
        let mut candidates: Vec<Candidate> = Vec::new();
        for (code, sig) in &signals {
            if ledger.holds(code) {
                continue;
            }
            let series = &price_data[*code];
            let Some(idx) = series.index_on(date) else {
                continue;
            };
            if sig.buy[idx] {
                candidates.push(Candidate {
                    code: (*code).to_string(),
                    name: name_of(code),
                    price: series.points()[idx].close,
                });
            }
        }

        rank_buy_candidates(
            &mut candidates,
            price_data,
            listing,
            params.rank_method,
            date,
            params.n_rise_days,
        );

        for candidate in candidates {
            if ledger.cash < params.min_balance {
                break;
            }
            ledger.buy(
                date,
                &candidate.code,
                &candidate.name,
                candidate.price,
                params.max_buy_amount,
                params.min_balance,
            );
        }

        // End-of-day snapshot at today's closes where available.
        let mut current_prices = HashMap::new();
        for code in ledger.holdings.keys() {
            if let Some(close) = price_data.get(code).and_then(|s| s.close_on(date)) {
                current_prices.insert(code.clone(), close);
            }
        }
        ledger.snapshot(date, &current_prices);

        if let Some(cb) = progress.as_deref_mut() {
            cb(day_idx + 1, total_days);
        }
    }

    let metrics = Metrics::compute(&ledger.snapshots, &ledger.trades, params.initial_cash);
    let mut result = BacktestResult::assemble(ledger.snapshots, ledger.trades, metrics);
    result.benchmark_index = benchmark.cloned();
    result
}

/// Sorted union of all dates appearing in any instrument's series.
pub fn trading_calendar(price_data: &BTreeMap<String, PriceSeries>) -> Vec<NaiveDate> {
    let dates: BTreeSet<NaiveDate> = price_data
        .values()
        .flat_map(|series| series.points().iter().map(|p| p.date))
        .collect();
    dates.into_iter().collect()
}

#[derive(Debug, Clone)]
struct Candidate {
    code: String,
    name: String,
    price: f64,
}

/// Orders buy candidates by the configured method, descending. The sort is
/// stable: equal keys keep their incoming relative order.
fn rank_buy_candidates(
    candidates: &mut [Candidate],
    price_data: &BTreeMap<String, PriceSeries>,
    listing: Option<&Listing>,
    method: RankMethod,
    current_date: NaiveDate,
    n_rise: usize,
) {
    match method {
        RankMethod::MarketCap => {
            let Some(listing) = listing else {
                return;
            };
            candidates.sort_by(|a, b| {
                listing
                    .market_cap_of(&b.code)
                    .partial_cmp(&listing.market_cap_of(&a.code))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        RankMethod::TrailingReturn => {
            candidates.sort_by(|a, b| {
                trailing_return(price_data, &b.code, current_date, n_rise)
                    .partial_cmp(&trailing_return(price_data, &a.code, current_date, n_rise))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }
}

/// Return over the trailing `n_rise` observations of the candidate's own
/// calendar, located with a forward-filled positional lookup. Candidates
/// lacking history or with a non-positive start price score zero.
fn trailing_return(
    price_data: &BTreeMap<String, PriceSeries>,
    code: &str,
    current_date: NaiveDate,
    n_rise: usize,
) -> f64 {
    let Some(series) = price_data.get(code) else {
        return 0.0;
    };
    let Some(idx) = series.index_at_or_before(current_date) else {
        return 0.0;
    };
    if idx < n_rise {
        return 0.0;
    }
    let start = series.points()[idx - n_rise].close;
    let end = series.points()[idx].close;
    if start > 0.0 {
        (end - start) / start
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::Side;
    use crate::domain::listing::ListingEntry;
    use crate::domain::series::PricePoint;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(code: &str, closes: &[f64]) -> PriceSeries {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: date(2024, 1, 1) + chrono::Duration::days(i as i64),
                close,
            })
            .collect();
        PriceSeries::new(code.to_string(), points)
    }

    fn params() -> BacktestParams {
        BacktestParams::new(
            10_000_000.0,
            date(2024, 1, 1),
            date(2024, 1, 31),
            5_000_000.0,
            1_000_000.0,
        )
    }

    fn price_map(entries: Vec<PriceSeries>) -> BTreeMap<String, PriceSeries> {
        entries.into_iter().map(|s| (s.code.clone(), s)).collect()
    }

    #[test]
    fn rise_then_fall_produces_buy_and_sell() {
        let prices = price_map(vec![series(
            "A",
            &[100.0, 101.0, 102.0, 103.0, 102.0, 101.0, 100.0, 99.0, 105.0],
        )]);
        let result = run_backtest(&params(), &prices, None, None, None);

        let buys: Vec<&Trade> = result.trades.iter().filter(|t| t.side == Side::Buy).collect();
        let sells: Vec<&Trade> = result.trades.iter().filter(|t| t.side == Side::Sell).collect();
        assert!(!buys.is_empty());
        // Buy signal first fires on the fourth day (three rises).
        assert_eq!(buys[0].date, date(2024, 1, 4));
        // Three consecutive falls liquidate on the seventh day.
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].date, date(2024, 1, 7));
        assert_eq!(result.daily_snapshots.len(), 9);
    }

    #[test]
    fn flat_series_never_trades() {
        let prices = price_map(vec![series("A", &[100.0, 100.0, 100.0, 100.0, 100.0])]);
        let result = run_backtest(&params(), &prices, None, None, None);

        assert_eq!(result.total_trades, 0);
        assert!((result.final_return_pct - 0.0).abs() < f64::EPSILON);
        assert_eq!(result.daily_snapshots.len(), 5);
    }

    #[test]
    fn emergency_sell_fires_before_fall_streak_completes() {
        // -10.7% on the last day; fall streak is only 1.
        let prices = price_map(vec![series("A", &[100.0, 101.0, 102.0, 103.0, 92.0])]);
        let result = run_backtest(&params(), &prices, None, None, None);

        let sells: Vec<&Trade> = result.trades.iter().filter(|t| t.side == Side::Sell).collect();
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].date, date(2024, 1, 5));
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let result = run_backtest(&params(), &BTreeMap::new(), None, None, None);
        assert!(result.daily_snapshots.is_empty());
        assert!(result.trades.is_empty());
        assert!((result.final_return_pct - 0.0).abs() < f64::EPSILON);
        assert!((result.mdd_pct - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn market_cap_ranking_buys_large_cap_first() {
        // Identical signal timing; cash only funds one max-amount buy before
        // the floor, so order decides who fills first.
        let prices = price_map(vec![
            series("SMALL", &[100.0, 101.0, 102.0, 103.0, 104.0]),
            series("BIG", &[200.0, 201.0, 202.0, 203.0, 204.0]),
        ]);
        let listing = Listing::new(vec![
            ListingEntry {
                code: "SMALL".into(),
                name: "Small Corp".into(),
                market_cap: 100_000_000.0,
            },
            ListingEntry {
                code: "BIG".into(),
                name: "Big Corp".into(),
                market_cap: 10_000_000_000.0,
            },
        ]);

        let result = run_backtest(&params(), &prices, Some(&listing), None, None);
        let buys: Vec<&Trade> = result.trades.iter().filter(|t| t.side == Side::Buy).collect();
        assert!(!buys.is_empty());
        assert_eq!(buys[0].code, "BIG");
        assert_eq!(buys[0].name, "Big Corp");
    }

    #[test]
    fn trailing_return_ranking_prefers_steeper_rise() {
        let mut p = params();
        p.rank_method = RankMethod::TrailingReturn;
        // FAST rises 10%/day, SLOW 1%/day; both signal on day 4.
        let prices = price_map(vec![
            series("SLOW", &[100.0, 101.0, 102.0, 103.0, 104.0]),
            series("FAST", &[100.0, 110.0, 121.0, 133.1, 146.4]),
        ]);

        let result = run_backtest(&p, &prices, None, None, None);
        let buys: Vec<&Trade> = result.trades.iter().filter(|t| t.side == Side::Buy).collect();
        assert!(!buys.is_empty());
        assert_eq!(buys[0].code, "FAST");
    }

    #[test]
    fn buy_loop_stops_at_cash_floor() {
        let mut p = params();
        p.initial_cash = 6_000_000.0;
        p.max_buy_amount = 5_000_000.0;
        p.min_balance = 1_000_000.0;
        let prices = price_map(vec![
            series("A", &[100.0, 101.0, 102.0, 103.0, 104.0]),
            series("B", &[200.0, 201.0, 202.0, 203.0, 204.0]),
        ]);

        let result = run_backtest(&p, &prices, None, None, None);
        let buys: Vec<&Trade> = result.trades.iter().filter(|t| t.side == Side::Buy).collect();
        // First fill takes ~5M of 6M; under a 1M floor the second never fills.
        assert_eq!(buys.len(), 1);
    }

    #[test]
    fn names_default_to_codes_without_listing() {
        let prices = price_map(vec![series("A", &[100.0, 101.0, 102.0, 103.0])]);
        let result = run_backtest(&params(), &prices, None, None, None);
        let buys: Vec<&Trade> = result.trades.iter().filter(|t| t.side == Side::Buy).collect();
        assert!(!buys.is_empty());
        assert_eq!(buys[0].name, "A");
    }

    #[test]
    fn unaligned_calendars_union_and_cost_basis_fallback() {
        // B misses Jan 4-5; A alone defines those days.
        let a = series("A", &[100.0, 101.0, 102.0, 103.0, 104.0]);
        let b = PriceSeries::new(
            "B".into(),
            vec![
                PricePoint { date: date(2024, 1, 1), close: 50.0 },
                PricePoint { date: date(2024, 1, 2), close: 51.0 },
                PricePoint { date: date(2024, 1, 3), close: 52.0 },
            ],
        );
        let prices = price_map(vec![a, b]);
        let calendar = trading_calendar(&prices);
        assert_eq!(calendar.len(), 5);

        let result = run_backtest(&params(), &prices, None, None, None);
        // Snapshots exist for every calendar day even while B has no quote.
        assert_eq!(result.daily_snapshots.len(), 5);
    }

    #[test]
    fn benchmark_passes_through_unchanged() {
        use crate::domain::series::DatedValue;
        let benchmark = IndexSeries::new(vec![DatedValue {
            date: date(2024, 1, 1),
            value: 2500.0,
        }]);
        let prices = price_map(vec![series("A", &[100.0, 100.0])]);
        let result = run_backtest(&params(), &prices, None, Some(&benchmark), None);
        assert_eq!(result.benchmark_index, Some(benchmark));
    }

    #[test]
    fn progress_reports_every_day() {
        let prices = price_map(vec![series("A", &[100.0, 100.0, 100.0])]);
        let mut calls = Vec::new();
        {
            let mut cb = |cur: usize, tot: usize| calls.push((cur, tot));
            run_backtest(&params(), &prices, None, None, Some(&mut cb));
        }
        assert_eq!(calls, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn identical_inputs_replay_identically() {
        let prices = price_map(vec![
            series("A", &[100.0, 101.0, 102.0, 103.0, 99.0, 98.0, 97.0]),
            series("B", &[50.0, 51.0, 52.0, 53.0, 54.0, 50.0, 49.0]),
        ]);
        let p = params();
        let first = run_backtest(&p, &prices, None, None, None);
        let second = run_backtest(&p, &prices, None, None, None);

        assert_eq!(first.trades, second.trades);
        assert_eq!(first.daily_snapshots, second.daily_snapshots);
        assert!((first.final_return_pct - second.final_return_pct).abs() < f64::EPSILON);
    }
}
