//! Validation of the `[backtest]` configuration section, and construction
//! of run parameters from a validated config.

use crate::domain::error::DuotraderError;
use crate::domain::params::{BacktestParams, RankMethod};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), DuotraderError> {
    validate_initial_cash(config)?;
    validate_dates(config)?;
    validate_fee_rate(config)?;
    validate_signal_windows(config)?;
    validate_emergency_threshold(config)?;
    validate_cash_limits(config)?;
    validate_rank_method(config)?;
    validate_kospi_ratio(config)?;
    Ok(())
}

/// Builds run parameters from a config that already passed validation.
pub fn backtest_params_from_config(
    config: &dyn ConfigPort,
) -> Result<BacktestParams, DuotraderError> {
    validate_backtest_config(config)?;

    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        config.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    let mut params = BacktestParams::new(
        config.get_double("backtest", "initial_cash", 0.0),
        start_date,
        end_date,
        config.get_double("backtest", "max_buy_amount", 0.0),
        config.get_double("backtest", "min_balance", 0.0),
    );
    params.fee_rate = config.get_double("backtest", "fee_rate", params.fee_rate);
    params.n_rise_days =
        config.get_int("backtest", "n_rise_days", params.n_rise_days as i64) as usize;
    params.m_fall_days =
        config.get_int("backtest", "m_fall_days", params.m_fall_days as i64) as usize;
    params.y_emergency_pct =
        config.get_double("backtest", "y_emergency_pct", params.y_emergency_pct);
    if let Some(method) = config.get_string("backtest", "rank_method") {
        params.rank_method = method
            .parse::<RankMethod>()
            .map_err(|reason| DuotraderError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "rank_method".to_string(),
                reason,
            })?;
    }
    params.kospi_ratio = config.get_int("backtest", "kospi_ratio", 100) as u8;
    Ok(params)
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), DuotraderError> {
    let value = config.get_double("backtest", "initial_cash", 0.0);
    if value <= 0.0 {
        return Err(DuotraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_cash".to_string(),
            reason: "initial_cash must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), DuotraderError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(DuotraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, DuotraderError> {
    match value {
        None => Err(DuotraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| DuotraderError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            })
        }
    }
}

fn validate_fee_rate(config: &dyn ConfigPort) -> Result<(), DuotraderError> {
    let value = config.get_double("backtest", "fee_rate", 0.015);
    if value < 0.0 {
        return Err(DuotraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "fee_rate".to_string(),
            reason: "fee_rate must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_signal_windows(config: &dyn ConfigPort) -> Result<(), DuotraderError> {
    let n = config.get_int("backtest", "n_rise_days", 3);
    if n < 1 {
        return Err(DuotraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "n_rise_days".to_string(),
            reason: "n_rise_days must be at least 1".to_string(),
        });
    }
    let m = config.get_int("backtest", "m_fall_days", 3);
    if m < 1 {
        return Err(DuotraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "m_fall_days".to_string(),
            reason: "m_fall_days must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_emergency_threshold(config: &dyn ConfigPort) -> Result<(), DuotraderError> {
    let value = config.get_double("backtest", "y_emergency_pct", 5.0);
    if value <= 0.0 {
        return Err(DuotraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "y_emergency_pct".to_string(),
            reason: "y_emergency_pct must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_cash_limits(config: &dyn ConfigPort) -> Result<(), DuotraderError> {
    let cap = config.get_double("backtest", "max_buy_amount", 0.0);
    if cap <= 0.0 {
        return Err(DuotraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "max_buy_amount".to_string(),
            reason: "max_buy_amount must be positive".to_string(),
        });
    }
    let floor = config.get_double("backtest", "min_balance", 0.0);
    if floor < 0.0 {
        return Err(DuotraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "min_balance".to_string(),
            reason: "min_balance must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_rank_method(config: &dyn ConfigPort) -> Result<(), DuotraderError> {
    match config.get_string("backtest", "rank_method") {
        None => Ok(()),
        Some(s) => match s.parse::<RankMethod>() {
            Ok(_) => Ok(()),
            Err(reason) => Err(DuotraderError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "rank_method".to_string(),
                reason,
            }),
        },
    }
}

fn validate_kospi_ratio(config: &dyn ConfigPort) -> Result<(), DuotraderError> {
    let value = config.get_int("backtest", "kospi_ratio", 100);
    if !(0..=100).contains(&value) {
        return Err(DuotraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "kospi_ratio".to_string(),
            reason: "kospi_ratio must be between 0 and 100".to_string(),
        });
    }
    Ok(())
}
