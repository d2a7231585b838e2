//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::config_validation::{backtest_params_from_config, validate_backtest_config};
use crate::domain::dual::{run_dual_backtest, DualMarketData};
use crate::domain::engine::BacktestResult;
use crate::domain::error::DuotraderError;
use crate::domain::listing::Listing;
use crate::domain::params::{BacktestParams, Market};
use crate::domain::series::{IndexSeries, PriceSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "duotrader", about = "Dual-market rule-based equity backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List instrument codes available in the data directory
    ListCodes {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        market: Market,
    },
    /// Validate a backtest configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl clap::ValueEnum for Market {
    fn value_variants<'a>() -> &'a [Self] {
        &[Market::Kospi, Market::Nasdaq]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest { config, output } => run_backtest_command(&config, output.as_ref()),
        Command::ListCodes { config, market } => run_list_codes(&config, market),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = DuotraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest_command(config_path: &PathBuf, output_path: Option<&PathBuf>) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let params = match backtest_params_from_config(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 2: Resolve the data directory
    let csv_dir = match config.get_string("data", "csv_dir") {
        Some(dir) => dir,
        None => {
            let err = DuotraderError::ConfigMissing {
                section: "data".to_string(),
                key: "csv_dir".to_string(),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
    };
    let adapter = CsvAdapter::new(PathBuf::from(csv_dir));

    // Stage 3: Load the market data the ratio requires
    let mut data = DualMarketData::default();

    if params.kospi_ratio > 0 {
        let (prices, listing, index) = match load_market_data(&adapter, Market::Kospi, &params) {
            Ok(side) => side,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        data.kospi_prices = prices;
        data.kospi_listing = listing;
        data.kospi_index = index;
    }

    if params.kospi_ratio < 100 {
        let (prices, listing, index) = match load_market_data(&adapter, Market::Nasdaq, &params) {
            Ok(side) => side,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        data.nasdaq_prices = prices;
        data.nasdaq_listing = listing;
        data.nasdaq_index = index;

        match adapter.fetch_exchange_rate(params.start_date, params.end_date) {
            Ok(fx) => data.exchange_rate = fx,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    eprintln!(
        "Running backtest: {} KOSPI / {} NASDAQ instruments, {} to {}, ratio {}",
        data.kospi_prices.len(),
        data.nasdaq_prices.len(),
        params.start_date,
        params.end_date,
        params.kospi_ratio,
    );

    // Stage 4: Run
    let mut progress = |current: usize, total: usize| {
        if total > 0 && (current % 50 == 0 || current == total) {
            eprintln!("  {}/{} days", current, total);
        }
    };
    let result = match run_dual_backtest(&params, &data, Some(&mut progress)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 5: Print summary to stderr
    print_summary(&result);

    // Stage 6: Optional JSON report
    if let Some(output) = output_path {
        let path = output.display().to_string();
        if let Err(e) = JsonReportAdapter.write(&result, &params, &path) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("\nReport written to: {}", path);
    }

    ExitCode::SUCCESS
}

/// Loads one market's prices, listing and benchmark index. Unreadable quote
/// files are skipped with a warning; a missing listing or index file only
/// disables the feature it feeds.
fn load_market_data(
    adapter: &CsvAdapter,
    market: Market,
    params: &BacktestParams,
) -> Result<(BTreeMap<String, PriceSeries>, Option<Listing>, Option<IndexSeries>), DuotraderError> {
    let codes = adapter.list_codes(market)?;

    let listing = match adapter.fetch_listing(market) {
        Ok(l) => Some(l),
        Err(e) => {
            eprintln!("warning: no listing for {} ({})", market.as_str(), e);
            None
        }
    };

    let mut prices = BTreeMap::new();
    for code in &codes {
        match adapter.fetch_prices(code, market, params.start_date, params.end_date) {
            Ok(series) if !series.is_empty() => {
                prices.insert(code.clone(), series);
            }
            Ok(_) => {}
            Err(e) => eprintln!("warning: skipping {} ({})", code, e),
        }
    }

    let index = match adapter.fetch_index(market, params.start_date, params.end_date) {
        Ok(i) => Some(i),
        Err(e) => {
            eprintln!("warning: no benchmark index for {} ({})", market.as_str(), e);
            None
        }
    };

    Ok((prices, listing, index))
}

fn print_summary(result: &BacktestResult) {
    eprintln!("\n=== Results ===");
    eprintln!("Final Return:     {:.2}%", result.final_return_pct);
    eprintln!("Max Drawdown:     {:.2}%", result.mdd_pct);
    eprintln!("Win Rate:         {:.1}%", result.win_rate_pct);
    eprintln!("Total Fees:       {:.0}", result.total_fee);
    eprintln!("Total Trades:     {}", result.total_trades);
    if result.initial_exchange_rate > 0.0 {
        eprintln!("Start FX Rate:    {:.2}", result.initial_exchange_rate);
    }
}

fn run_list_codes(config_path: &PathBuf, market: Market) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let csv_dir = match config.get_string("data", "csv_dir") {
        Some(dir) => dir,
        None => {
            let err = DuotraderError::ConfigMissing {
                section: "data".to_string(),
                key: "csv_dir".to_string(),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
    };

    let adapter = CsvAdapter::new(PathBuf::from(csv_dir));
    let codes = match adapter.list_codes(market) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if codes.is_empty() {
        eprintln!("No codes found for market {}", market.as_str());
    } else {
        for code in &codes {
            println!("{}", code);
        }
        eprintln!("{} codes found", codes.len());
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match validate_backtest_config(&config) {
        Ok(()) => {
            eprintln!("Config validated successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
