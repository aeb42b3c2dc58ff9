//! Core domain types and logic.

pub mod price;
pub mod series;
pub mod indicator;
pub mod backtest;
pub mod trade;
pub mod metrics;
pub mod loader;
pub mod pipeline;
pub mod config_validation;
pub mod error;
