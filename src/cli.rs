//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::chart_svg::SvgChartAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report::{CsvRowsAdapter, CsvTradesAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::yahoo_adapter::YahooAdapter;
use crate::domain::config_validation::{parse_date, validate_backtest_config, validate_data_config};
use crate::domain::error::SmacrossError;
use crate::domain::metrics::PerformanceSummary;
use crate::domain::pipeline::{
    run_pipeline, PipelineOutput, RunConfig, DEFAULT_INITIAL_CAPITAL, DEFAULT_RISK_FREE_RATE,
    DEFAULT_TICKER, DEFAULT_TRADE_LOG_COUNT, DEFAULT_WINDOW,
};
use crate::domain::trade::last_trades;
use crate::ports::cache_port::CachePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "smacross", about = "Moving-average crossover backtester")]
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
        #[command(flatten)]
        overrides: Overrides,
        #[command(flatten)]
        outputs: OutputOverrides,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the cached data range for a ticker
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
}

/// Command-line values that take precedence over `[backtest]`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Overrides {
    #[arg(long)]
    pub ticker: Option<String>,
    /// First date, YYYY-MM-DD
    #[arg(long)]
    pub start: Option<String>,
    /// Last date (inclusive), YYYY-MM-DD
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub window: Option<usize>,
    #[arg(long)]
    pub capital: Option<f64>,
}

/// Command-line values that take precedence over `[report]`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct OutputOverrides {
    #[arg(long)]
    pub chart: Option<PathBuf>,
    #[arg(long)]
    pub rows: Option<PathBuf>,
    #[arg(long)]
    pub trades: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPaths {
    pub chart: Option<PathBuf>,
    pub rows: Option<PathBuf>,
    pub trades: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            overrides,
            outputs,
        } => run_backtest(&config, &overrides, &outputs),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, ticker } => run_info(&config, ticker.as_deref()),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn fail(e: SmacrossError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

fn run_backtest(config_path: &Path, overrides: &Overrides, outputs: &OutputOverrides) -> ExitCode {
    info!(path = %config_path.display(), "loading config");
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checked = validate_backtest_config(&adapter).and_then(|()| validate_data_config(&adapter));
    if let Err(e) = checked {
        return fail(e);
    }

    let run_config = match build_run_config(&adapter, overrides) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let report_paths = resolve_report_paths(&adapter, outputs);

    let market_data = match build_market_data(&adapter) {
        Ok(m) => m,
        Err(e) => return fail(e),
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let cache = match SqliteAdapter::from_config(&adapter) {
            Ok(c) => c,
            Err(e) => return fail(e),
        };

        match run_backtest_pipeline(&run_config, &cache, market_data.as_ref(), &report_paths) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(e),
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (&run_config, &report_paths, market_data);
        eprintln!("error: sqlite feature is required for backtest");
        ExitCode::from(1)
    }
}

/// Merge `[backtest]` with the command-line overrides.
pub fn build_run_config(
    config: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<RunConfig, SmacrossError> {
    let ticker = overrides
        .ticker
        .clone()
        .or_else(|| config.get_string("backtest", "ticker"))
        .unwrap_or_else(|| DEFAULT_TICKER.to_string())
        .trim()
        .to_uppercase();

    let start_str = overrides
        .start
        .clone()
        .or_else(|| config.get_string("backtest", "start_date"));
    let end_str = overrides
        .end
        .clone()
        .or_else(|| config.get_string("backtest", "end_date"));
    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    let window = match overrides.window {
        Some(w) => w,
        None => non_negative(
            config.get_int("backtest", "window", DEFAULT_WINDOW as i64),
            "window",
        )?,
    };
    let trade_log_count = non_negative(
        config.get_int("backtest", "trade_log_count", DEFAULT_TRADE_LOG_COUNT as i64),
        "trade_log_count",
    )?;

    Ok(RunConfig {
        ticker,
        start_date,
        end_date,
        window,
        initial_capital: overrides.capital.unwrap_or_else(|| {
            config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)
        }),
        risk_free_rate: config.get_double("backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE),
        trade_log_count,
    })
}

fn non_negative(value: i64, key: &str) -> Result<usize, SmacrossError> {
    usize::try_from(value).map_err(|_| SmacrossError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: format!("{key} must be non-negative"),
    })
}

pub fn resolve_report_paths(config: &dyn ConfigPort, outputs: &OutputOverrides) -> ReportPaths {
    let pick = |over: &Option<PathBuf>, key: &str| {
        over.clone()
            .or_else(|| config.get_string("report", key).map(PathBuf::from))
    };
    ReportPaths {
        chart: pick(&outputs.chart, "chart_path"),
        rows: pick(&outputs.rows, "rows_path"),
        trades: pick(&outputs.trades, "trades_path"),
    }
}

/// The remote source selected by `[data] provider`.
pub fn build_market_data(
    config: &dyn ConfigPort,
) -> Result<Box<dyn MarketDataPort>, SmacrossError> {
    let provider = config.get_string_or("data", "provider", "yahoo").to_lowercase();

    match provider.as_str() {
        "yahoo" => Ok(Box::new(YahooAdapter::from_config(config)?)),
        "csv" => {
            let dir = config
                .get_string("data", "csv_dir")
                .ok_or_else(|| SmacrossError::ConfigMissing {
                    section: "data".into(),
                    key: "csv_dir".into(),
                })?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        other => Err(SmacrossError::ConfigInvalid {
            section: "data".into(),
            key: "provider".into(),
            reason: format!("unknown provider {other:?}"),
        }),
    }
}

/// Loader, engine, console summary and report files for one run.
pub fn run_backtest_pipeline(
    run_config: &RunConfig,
    cache: &dyn CachePort,
    market_data: &dyn MarketDataPort,
    report_paths: &ReportPaths,
) -> Result<(), SmacrossError> {
    let output = run_pipeline(run_config, cache, market_data)?;

    print_summary(run_config, &output);
    write_reports(run_config, &output, report_paths)
}

fn print_summary(run_config: &RunConfig, output: &PipelineOutput) {
    let result = &output.result;
    let (first, last) = match (output.series.first_date(), output.series.last_date()) {
        (Some(f), Some(l)) => (f, l),
        _ => return,
    };

    eprintln!(
        "\n=== {} SMA({}) crossover, {} to {} ({} rows) ===",
        run_config.ticker,
        run_config.window,
        first,
        last,
        result.rows.len()
    );
    eprintln!("{:<18}{:>14}{:>14}", "", "Strategy", "Buy & Hold");
    print_metric_row("Final Value:", &output.strategy_summary, &output.baseline_summary, |s| {
        format!("{:.2}", s.final_value)
    });
    print_metric_row("Total Return:", &output.strategy_summary, &output.baseline_summary, |s| {
        format!("{:.2}%", s.total_return * 100.0)
    });
    print_metric_row("Annualized:", &output.strategy_summary, &output.baseline_summary, |s| {
        format!("{:.2}%", s.annualized_return * 100.0)
    });
    print_metric_row("Sharpe Ratio:", &output.strategy_summary, &output.baseline_summary, |s| {
        format!("{:.2}", s.sharpe_ratio)
    });
    print_metric_row("Sortino Ratio:", &output.strategy_summary, &output.baseline_summary, |s| {
        format!("{:.2}", s.sortino_ratio)
    });
    print_metric_row("Max Drawdown:", &output.strategy_summary, &output.baseline_summary, |s| {
        format!("-{:.1}%", s.max_drawdown * 100.0)
    });
    print_metric_row("DD Duration:", &output.strategy_summary, &output.baseline_summary, |s| {
        format!("{} rows", s.max_drawdown_duration)
    });
    eprintln!("Total Trades:     {}", result.trades.len());

    let recent = last_trades(&result.trades, run_config.trade_log_count);
    if !recent.is_empty() {
        eprintln!("\n=== Last {} Trades ===", recent.len());
        for trade in recent {
            eprintln!("  {}  {:<4}  {:.2}", trade.date, trade.action.to_string(), trade.price);
        }
    }
}

fn print_metric_row(
    label: &str,
    strategy: &PerformanceSummary,
    baseline: &PerformanceSummary,
    fmt: impl Fn(&PerformanceSummary) -> String,
) {
    eprintln!("{:<18}{:>14}{:>14}", label, fmt(strategy), fmt(baseline));
}

fn write_reports(
    run_config: &RunConfig,
    output: &PipelineOutput,
    report_paths: &ReportPaths,
) -> Result<(), SmacrossError> {
    let chart = SvgChartAdapter::new(format!("{} Buy & Hold", run_config.ticker));
    let reports: [(&Option<PathBuf>, &dyn ReportPort); 3] = [
        (&report_paths.chart, &chart),
        (&report_paths.rows, &CsvRowsAdapter),
        (&report_paths.trades, &CsvTradesAdapter),
    ];

    for (path, report) in reports {
        let Some(path) = path else { continue };
        report.write(&output.result, path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checked = validate_backtest_config(&adapter).and_then(|()| validate_data_config(&adapter));
    if let Err(e) = checked {
        return fail(e);
    }

    match build_run_config(&adapter, &Overrides::default()) {
        Ok(c) => {
            eprintln!("  Ticker:   {}", c.ticker);
            eprintln!("  Range:    {} to {}", c.start_date, c.end_date);
            eprintln!("  Window:   {}", c.window);
            eprintln!("  Capital:  {:.2}", c.initial_capital);
            eprintln!("Config is valid");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_info(config_path: &Path, ticker: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let ticker = ticker
        .map(str::to_string)
        .unwrap_or_else(|| config.get_string_or("backtest", "ticker", DEFAULT_TICKER))
        .to_uppercase();

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let cache = match SqliteAdapter::from_config(&config) {
            Ok(c) => c,
            Err(e) => return fail(e),
        };

        match cache.data_range(&ticker) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} rows, {} to {}", ticker, count, min_date, max_date);
                match cache.fresh_through(&ticker) {
                    Ok(Some(through)) => println!("{}: checked through {}", ticker, through),
                    Ok(None) => {}
                    Err(e) => return fail(e),
                }
                ExitCode::SUCCESS
            }
            Ok(None) => {
                eprintln!("{}: no cached data", ticker);
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = ticker;
        eprintln!("error: sqlite feature is required for info");
        ExitCode::from(1)
    }
}
