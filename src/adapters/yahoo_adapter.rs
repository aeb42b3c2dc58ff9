//! Yahoo Finance market data adapter.
//!
//! Fetches daily OHLCV bars with adjusted closes from Yahoo's v8 chart API.
//! One blocking request per call; failures are reported, never retried.

use crate::domain::error::SmacrossError;
use crate::domain::price::PriceRecord;
use crate::domain::series::PriceSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const ORIGIN: &str = "yahoo";
pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooAdapter {
    pub fn new(timeout: Duration) -> Result<Self, SmacrossError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, SmacrossError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| SmacrossError::unavailable(ORIGIN, e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SmacrossError> {
        let timeout = Duration::from_secs(config.get_int("data", "timeout_secs", 30).max(1) as u64);
        let base_url = config.get_string_or("data", "yahoo_url", DEFAULT_BASE_URL);
        Self::with_base_url(&base_url, timeout)
    }

    /// The chart URL for `[start, end]`; `period2` is the exclusive midnight after `end`.
    fn chart_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{}/v8/finance/chart/{ticker}?period1={start_ts}&period2={end_ts}&interval=1d&includeAdjustedClose=true",
            self.base_url
        )
    }
}

fn parse_response(
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    resp: ChartResponse,
) -> Result<PriceSeries, SmacrossError> {
    let no_data = || SmacrossError::NoData {
        ticker: ticker.to_string(),
        start,
        end,
    };

    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(SmacrossError::unavailable(
                ORIGIN,
                format!("unknown ticker {ticker}: {}", err.description),
            ))
        }
        (None, Some(err)) => {
            return Err(SmacrossError::unavailable(
                ORIGIN,
                format!("{}: {}", err.code, err.description),
            ))
        }
        (None, None) => return Err(no_data()),
    };

    let Some(data) = result.into_iter().next() else {
        return Err(no_data());
    };
    let Some(timestamps) = data.timestamp else {
        return Err(no_data());
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| SmacrossError::unavailable(ORIGIN, "response has no quote data"))?;
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut records = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| SmacrossError::unavailable(ORIGIN, format!("invalid timestamp {ts}")))?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        // Rows with every field null are non-trading days.
        let all_missing = open.is_none()
            && high.is_none()
            && low.is_none()
            && close.is_none()
            && volume.is_none();
        if all_missing {
            continue;
        }

        let adjusted_close = adj_closes
            .as_ref()
            .and_then(|v| v.get(i).copied().flatten());

        // Missing prices become NaN and are rejected when the series is built.
        records.push(PriceRecord {
            date,
            open: open.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
            low: low.unwrap_or(f64::NAN),
            close: close.unwrap_or(f64::NAN),
            adjusted_close: adjusted_close.unwrap_or(f64::NAN),
            volume: volume.unwrap_or(0),
        });
    }

    let series = PriceSeries::new(ticker, records).restrict(start, end);
    if series.is_empty() {
        return Err(no_data());
    }
    Ok(series)
}

impl MarketDataPort for YahooAdapter {
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, SmacrossError> {
        let url = self.chart_url(ticker, start, end);
        debug!(%url, "requesting chart");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| SmacrossError::unavailable(ORIGIN, e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SmacrossError::unavailable(ORIGIN, e))?;

        let parsed: ChartResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(SmacrossError::unavailable(ORIGIN, format!("HTTP {status}")));
            }
            Err(e) => {
                return Err(SmacrossError::unavailable(
                    ORIGIN,
                    format!("unexpected response format: {e}"),
                ));
            }
        };

        let series = parse_response(ticker, start, end, parsed)?;
        info!(ticker, rows = series.len(), %start, %end, "fetched from Yahoo Finance");
        Ok(series)
    }
}
