//! One backtest run: load prices, run the engine, summarise both curves.

use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::error::SmacrossError;
use crate::domain::loader::DataLoader;
use crate::domain::metrics::PerformanceSummary;
use crate::domain::series::PriceSeries;
use crate::ports::cache_port::CachePort;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use tracing::{info, warn};

pub const DEFAULT_TICKER: &str = "SQQQ";
pub const DEFAULT_WINDOW: usize = 50;
pub const DEFAULT_INITIAL_CAPITAL: f64 = 100.0;
pub const DEFAULT_TRADE_LOG_COUNT: usize = 5;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;

/// Static parameters of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub window: usize,
    pub initial_capital: f64,
    pub risk_free_rate: f64,
    pub trade_log_count: usize,
}

impl RunConfig {
    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            window: self.window,
            initial_capital: self.initial_capital,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub series: PriceSeries,
    pub result: BacktestResult,
    pub strategy_summary: PerformanceSummary,
    pub baseline_summary: PerformanceSummary,
}

pub fn run_pipeline(
    config: &RunConfig,
    cache: &dyn CachePort,
    remote: &dyn MarketDataPort,
) -> Result<PipelineOutput, SmacrossError> {
    let backtest_config = config.backtest_config();
    backtest_config.validate()?;

    let loader = DataLoader::new(cache, remote);
    let series = loader.load(&config.ticker, config.start_date, config.end_date)?;

    info!(
        ticker = %config.ticker,
        rows = series.len(),
        window = config.window,
        "running backtest"
    );
    let result = run_backtest(&series, &backtest_config)?;

    if let Some(w) = result.history_warning() {
        warn!("{w}; no trading signal is active");
    }

    let strategy_summary =
        PerformanceSummary::compute(&result.portfolio_curve(), config.risk_free_rate);
    let baseline_summary =
        PerformanceSummary::compute(&result.baseline_curve(), config.risk_free_rate);

    Ok(PipelineOutput {
        series,
        result,
        strategy_summary,
        baseline_summary,
    })
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use crate::domain::price::PriceRecord;
    use approx::assert_relative_eq;

    struct StaticRemote(PriceSeries);

    impl MarketDataPort for StaticRemote {
        fn fetch(
            &self,
            ticker: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<PriceSeries, SmacrossError> {
            let series = self.0.restrict(start, end);
            if series.is_empty() {
                return Err(SmacrossError::NoData {
                    ticker: ticker.to_string(),
                    start,
                    end,
                });
            }
            Ok(series)
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn remote(prices: &[f64]) -> StaticRemote {
        let records = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PriceRecord {
                date: d(2 + i as u32),
                open: p,
                high: p,
                low: p,
                close: p,
                adjusted_close: p,
                volume: 100,
            })
            .collect();
        StaticRemote(PriceSeries::new("SQQQ", records))
    }

    fn run_config(window: usize) -> RunConfig {
        RunConfig {
            ticker: DEFAULT_TICKER.to_string(),
            start_date: d(2),
            end_date: d(5),
            window,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_free_rate: 0.0,
            trade_log_count: DEFAULT_TRADE_LOG_COUNT,
        }
    }

    #[test]
    fn runs_loader_engine_and_metrics() {
        let cache = SqliteAdapter::in_memory().unwrap();
        let remote = remote(&[10.0, 11.0, 9.0, 12.0]);
        let output = run_pipeline(&run_config(2), &cache, &remote).unwrap();

        assert_eq!(output.series.len(), 4);
        assert_eq!(output.result.rows.len(), 4);
        assert_relative_eq!(output.baseline_summary.final_value, 120.0, epsilon = 1e-9);
        assert_relative_eq!(
            output.strategy_summary.final_value,
            output.result.rows[3].portfolio_value,
            epsilon = 1e-12
        );
        assert!(cache.exists("SQQQ").unwrap());
    }

    #[test]
    fn short_history_still_completes() {
        let cache = SqliteAdapter::in_memory().unwrap();
        let remote = remote(&[10.0, 11.0, 9.0, 12.0]);
        let output = run_pipeline(&run_config(50), &cache, &remote).unwrap();

        assert!(output.result.history_warning().is_some());
        assert!(output.result.trades.is_empty());
        assert_relative_eq!(output.strategy_summary.final_value, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_window_is_rejected() {
        let cache = SqliteAdapter::in_memory().unwrap();
        let err = run_pipeline(&run_config(0), &cache, &remote(&[10.0, 11.0])).unwrap_err();
        assert!(matches!(err, SmacrossError::InvalidParameter { .. }));
        assert!(!cache.exists("SQQQ").unwrap());
    }

    #[test]
    fn invalid_capital_is_rejected_before_loading() {
        let cache = SqliteAdapter::in_memory().unwrap();
        let mut config = run_config(2);
        config.initial_capital = -1.0;

        let err = run_pipeline(&config, &cache, &remote(&[10.0, 11.0])).unwrap_err();
        assert!(matches!(
            err,
            SmacrossError::InvalidParameter { name, .. } if name == "initial_capital"
        ));
        assert!(!cache.exists("SQQQ").unwrap());
        assert!(cache.fresh_through("SQQQ").unwrap().is_none());
    }
}
