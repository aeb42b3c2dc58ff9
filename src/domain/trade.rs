//! Trades emitted whenever the effective signal changes.

use crate::domain::backtest::{DerivedRow, Signal};
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub price: f64,
    pub action: TradeAction,
}

/// Every flagged row in encounter order.
pub fn extract_trades(rows: &[DerivedRow]) -> Vec<Trade> {
    rows.iter()
        .filter(|row| row.trade_flag)
        .map(|row| Trade {
            date: row.date(),
            price: row.adjusted_close(),
            action: match row.effective_signal() {
                Signal::Long => TradeAction::Buy,
                Signal::Flat => TradeAction::Sell,
            },
        })
        .collect()
}

/// The most recent `n` trades, oldest first.
pub fn last_trades(trades: &[Trade], n: usize) -> &[Trade] {
    &trades[trades.len().saturating_sub(n)..]
}
