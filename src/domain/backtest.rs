//! Backtest engine for the moving-average crossover on a short position.
//!
//! Every derived field at row `i` depends only on rows `<= i`. The signal
//! observed at the close of day `i-1` gates the short-position return of
//! day `i`. Values that are undefined for a row are `None`.

use crate::domain::error::SmacrossError;
use crate::domain::indicator::simple_moving_average;
use crate::domain::price::PriceRecord;
use crate::domain::series::PriceSeries;
use crate::domain::trade::{extract_trades, Trade};
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub window: usize,
    pub initial_capital: f64,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), SmacrossError> {
        if self.window == 0 {
            return Err(SmacrossError::InvalidParameter {
                name: "window".into(),
                reason: "moving-average window must be at least 1".into(),
            });
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(SmacrossError::InvalidParameter {
                name: "initial_capital".into(),
                reason: format!("must be positive, got {}", self.initial_capital),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Long,
    Flat,
}

impl Signal {
    /// Fraction of capital deployed: 1.0 when long, 0.0 when flat.
    pub fn as_factor(self) -> f64 {
        match self {
            Signal::Long => 1.0,
            Signal::Flat => 0.0,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => write!(f, "LONG"),
            Signal::Flat => write!(f, "FLAT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub record: PriceRecord,
    pub daily_return: Option<f64>,
    pub price_change: Option<f64>,
    pub inverse_daily_return: Option<f64>,
    pub short_cumulative_return: f64,
    pub short_daily_return: Option<f64>,
    pub cumulative_return: f64,
    pub moving_average: Option<f64>,
    pub signal: Option<Signal>,
    pub strategy_daily_return: Option<f64>,
    pub strategy_cumulative_return: f64,
    pub trade_flag: bool,
    pub shares_held: Option<f64>,
    pub portfolio_value_change: Option<f64>,
    pub portfolio_value: f64,
    pub portfolio_return: Option<f64>,
    pub portfolio_cumulative_return: f64,
}

impl DerivedRow {
    pub fn date(&self) -> NaiveDate {
        self.record.date
    }

    pub fn adjusted_close(&self) -> f64 {
        self.record.adjusted_close
    }

    /// Warm-up rows have no signal and count as flat.
    pub fn effective_signal(&self) -> Signal {
        self.signal.unwrap_or(Signal::Flat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub rows: Vec<DerivedRow>,
    pub trades: Vec<Trade>,
    pub window: usize,
    pub initial_capital: f64,
}

impl BacktestResult {
    pub fn portfolio_curve(&self) -> Vec<CurvePoint> {
        self.rows
            .iter()
            .map(|row| CurvePoint {
                date: row.date(),
                value: row.portfolio_value,
            })
            .collect()
    }

    /// Buy-and-hold cumulative return scaled to the initial capital.
    pub fn baseline_curve(&self) -> Vec<CurvePoint> {
        self.rows
            .iter()
            .map(|row| CurvePoint {
                date: row.date(),
                value: row.cumulative_return * self.initial_capital,
            })
            .collect()
    }

    /// Fewer rows than the window means no signal was ever active.
    pub fn history_warning(&self) -> Option<SmacrossError> {
        if self.rows.len() < self.window {
            Some(SmacrossError::InsufficientHistory {
                rows: self.rows.len(),
                window: self.window,
            })
        } else {
            None
        }
    }
}

pub fn run_backtest(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, SmacrossError> {
    config.validate()?;
    if let Some(bad) = series.records().iter().find(|r| !(r.adjusted_close > 0.0)) {
        return Err(SmacrossError::MalformedRecord {
            date: bad.date,
            reason: format!("adjusted_close must be positive, got {}", bad.adjusted_close),
        });
    }

    let closes = series.adjusted_closes();
    let moving_averages = simple_moving_average(&closes, config.window);
    let capital = config.initial_capital;

    let mut rows: Vec<DerivedRow> = Vec::with_capacity(series.len());

    for (i, record) in series.records().iter().enumerate() {
        let price = record.adjusted_close;
        let moving_average = moving_averages[i];
        let signal = moving_average.map(|ma| if price > ma { Signal::Long } else { Signal::Flat });

        let row = match rows.last() {
            None => DerivedRow {
                record: record.clone(),
                daily_return: None,
                price_change: None,
                inverse_daily_return: None,
                short_cumulative_return: 1.0,
                short_daily_return: None,
                cumulative_return: 1.0,
                moving_average,
                signal,
                strategy_daily_return: None,
                strategy_cumulative_return: 1.0,
                trade_flag: false,
                shares_held: None,
                portfolio_value_change: None,
                portfolio_value: capital,
                portfolio_return: None,
                portfolio_cumulative_return: 1.0,
            },
            Some(prev) => {
                let prev_price = prev.adjusted_close();
                let daily_return = price / prev_price - 1.0;
                let price_change = price - prev_price;
                let inverse_daily_return = 1.0 / (1.0 + daily_return);
                let short_cumulative_return = prev.short_cumulative_return * inverse_daily_return;
                // Needs two prior cumulative values, so row 1 stays undefined.
                let short_daily_return = (i >= 2)
                    .then(|| short_cumulative_return / prev.short_cumulative_return - 1.0);

                let prev_factor = prev.effective_signal().as_factor();
                let strategy_daily_return = short_daily_return.map(|r| prev_factor * r);
                let shares_held = capital * prev_factor / price;
                let portfolio_value_change = -price_change * shares_held;
                let portfolio_value = prev.portfolio_value + portfolio_value_change;
                let portfolio_return = portfolio_value_change / prev.portfolio_value;

                DerivedRow {
                    record: record.clone(),
                    daily_return: Some(daily_return),
                    price_change: Some(price_change),
                    inverse_daily_return: Some(inverse_daily_return),
                    short_cumulative_return,
                    short_daily_return,
                    cumulative_return: prev.cumulative_return * (1.0 + daily_return),
                    moving_average,
                    signal,
                    strategy_daily_return,
                    strategy_cumulative_return: compound(
                        prev.strategy_cumulative_return,
                        strategy_daily_return,
                    ),
                    trade_flag: signal.unwrap_or(Signal::Flat) != prev.effective_signal(),
                    shares_held: Some(shares_held),
                    portfolio_value_change: Some(portfolio_value_change),
                    portfolio_value,
                    portfolio_return: Some(portfolio_return),
                    portfolio_cumulative_return: compound(
                        prev.portfolio_cumulative_return,
                        Some(portfolio_return),
                    ),
                }
            }
        };
        rows.push(row);
    }

    let trades = extract_trades(&rows);

    Ok(BacktestResult {
        rows,
        trades,
        window: config.window,
        initial_capital: capital,
    })
}

/// An undefined daily return leaves the running product unchanged.
fn compound(previous: f64, daily: Option<f64>) -> f64 {
    match daily {
        Some(r) => previous * (1.0 + r),
        None => previous,
    }
}
