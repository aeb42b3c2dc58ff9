//! CSV exports of the derived backtest table and the trade log.

use crate::domain::backtest::{BacktestResult, DerivedRow};
use crate::domain::error::SmacrossError;
use crate::ports::report_port::ReportPort;
use std::path::Path;

const ROW_HEADER: [&str; 23] = [
    "Date",
    "Open",
    "High",
    "Low",
    "Close",
    "Adj Close",
    "Volume",
    "Daily Return",
    "Price Change",
    "Inverse Daily Return",
    "Short Cumulative Return",
    "Short Daily Return",
    "Cumulative Return",
    "Moving Average",
    "Signal",
    "Strategy Daily Return",
    "Strategy Cumulative Return",
    "Trade",
    "Shares Held",
    "Portfolio Value Change",
    "Portfolio Value",
    "Portfolio Return",
    "Portfolio Cumulative Return",
];

const TRADE_HEADER: [&str; 3] = ["Date", "Action", "Price"];

fn report_error(path: &Path, e: impl std::fmt::Display) -> SmacrossError {
    SmacrossError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn row_fields(row: &DerivedRow) -> Vec<String> {
    let r = &row.record;
    vec![
        r.date.to_string(),
        r.open.to_string(),
        r.high.to_string(),
        r.low.to_string(),
        r.close.to_string(),
        r.adjusted_close.to_string(),
        r.volume.to_string(),
        opt(row.daily_return),
        opt(row.price_change),
        opt(row.inverse_daily_return),
        row.short_cumulative_return.to_string(),
        opt(row.short_daily_return),
        row.cumulative_return.to_string(),
        opt(row.moving_average),
        row.signal.map(|s| s.to_string()).unwrap_or_default(),
        opt(row.strategy_daily_return),
        row.strategy_cumulative_return.to_string(),
        row.trade_flag.to_string(),
        opt(row.shares_held),
        opt(row.portfolio_value_change),
        row.portfolio_value.to_string(),
        opt(row.portfolio_return),
        row.portfolio_cumulative_return.to_string(),
    ]
}

/// Every derived row, undefined values left blank.
pub struct CsvRowsAdapter;

impl ReportPort for CsvRowsAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SmacrossError> {
        let mut wtr =
            csv::Writer::from_path(output_path).map_err(|e| report_error(output_path, e))?;
        wtr.write_record(ROW_HEADER)
            .map_err(|e| report_error(output_path, e))?;
        for row in &result.rows {
            wtr.write_record(row_fields(row))
                .map_err(|e| report_error(output_path, e))?;
        }
        wtr.flush().map_err(|e| report_error(output_path, e))?;
        Ok(())
    }
}

/// The ordered trade list.
pub struct CsvTradesAdapter;

impl ReportPort for CsvTradesAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SmacrossError> {
        let mut wtr =
            csv::Writer::from_path(output_path).map_err(|e| report_error(output_path, e))?;
        wtr.write_record(TRADE_HEADER)
            .map_err(|e| report_error(output_path, e))?;
        for trade in &result.trades {
            wtr.write_record([
                trade.date.to_string(),
                trade.action.to_string(),
                trade.price.to_string(),
            ])
            .map_err(|e| report_error(output_path, e))?;
        }
        wtr.flush().map_err(|e| report_error(output_path, e))?;
        Ok(())
    }
}
