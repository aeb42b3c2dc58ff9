//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use crate::domain::error::SmacrossError;
use crate::domain::pipeline::{
    DEFAULT_INITIAL_CAPITAL, DEFAULT_RISK_FREE_RATE, DEFAULT_TRADE_LOG_COUNT, DEFAULT_WINDOW,
};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const PROVIDERS: [&str; 2] = ["yahoo", "csv"];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    validate_ticker(config)?;
    validate_dates(config)?;
    validate_window(config)?;
    validate_initial_capital(config)?;
    validate_risk_free_rate(config)?;
    validate_trade_log_count(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    validate_cache_path(config)?;
    validate_provider(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SmacrossError {
    SmacrossError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn is_ticker_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-.^=".contains(c)
}

fn validate_ticker(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    match config.get_string("backtest", "ticker") {
        Some(s) if s.trim().is_empty() => {
            Err(invalid("backtest", "ticker", "ticker must not be empty"))
        }
        Some(s) if !s.trim().chars().all(is_ticker_char) => Err(invalid(
            "backtest",
            "ticker",
            format!("unsupported characters in ticker {s:?}"),
        )),
        _ => Ok(()),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, SmacrossError> {
    match value {
        None => Err(SmacrossError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let value = config.get_int("backtest", "window", DEFAULT_WINDOW as i64);
    if value < 1 {
        return Err(invalid("backtest", "window", "window must be at least 1"));
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let value = config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let value = config.get_double("backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_trade_log_count(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let value = config.get_int("backtest", "trade_log_count", DEFAULT_TRADE_LOG_COUNT as i64);
    if value < 0 {
        return Err(invalid(
            "backtest",
            "trade_log_count",
            "trade_log_count must be non-negative",
        ));
    }
    Ok(())
}

fn validate_cache_path(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    match config.get_string("cache", "path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(SmacrossError::ConfigMissing {
            section: "cache".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn validate_provider(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let provider = config.get_string_or("data", "provider", "yahoo").to_lowercase();

    if !PROVIDERS.contains(&provider.as_str()) {
        return Err(invalid(
            "data",
            "provider",
            format!("unknown provider {provider:?}, expected one of {PROVIDERS:?}"),
        ));
    }

    if provider == "csv" {
        match config.get_string("data", "csv_dir") {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(SmacrossError::ConfigMissing {
                    section: "data".to_string(),
                    key: "csv_dir".to_string(),
                })
            }
        }
    }

    if config.get_int("data", "timeout_secs", 30) < 1 {
        return Err(invalid("data", "timeout_secs", "timeout_secs must be at least 1"));
    }
    Ok(())
}
