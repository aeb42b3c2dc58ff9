//! CSV file market data adapter.
//!
//! Reads `{base_path}/{TICKER}.csv` in the layout Yahoo Finance exports:
//! `Date,Open,High,Low,Close,Adj Close,Volume`. Columns are located by header
//! name; an empty price cell counts as missing.

use crate::domain::error::SmacrossError;
use crate::domain::price::PriceRecord;
use crate::domain::series::PriceSeries;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::info;

const ORIGIN: &str = "csv";
const COLUMNS: [&str; 7] = ["Date", "Open", "High", "Low", "Close", "Adj Close", "Volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn parse_price(value: Option<&str>) -> f64 {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() && !s.eq_ignore_ascii_case("null") => {
            s.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

fn parse_volume(value: Option<&str>) -> i64 {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s
            .parse::<i64>()
            .or_else(|_| s.parse::<f64>().map(|v| v.round() as i64))
            .unwrap_or(-1),
        None => 0,
    }
}

impl MarketDataPort for CsvAdapter {
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, SmacrossError> {
        let path = self.csv_path(ticker);
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| {
            SmacrossError::unavailable(ORIGIN, format!("failed to read {}: {}", path.display(), e))
        })?;

        let headers = rdr
            .headers()
            .map_err(|e| SmacrossError::unavailable(ORIGIN, format!("CSV parse error: {}", e)))?
            .clone();

        let mut index = [0usize; COLUMNS.len()];
        for (slot, name) in index.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| {
                    let reason = format!("missing {name} column in {}", path.display());
                    SmacrossError::unavailable(ORIGIN, reason)
                })?;
        }

        let mut records = Vec::new();
        for result in rdr.records() {
            let row = result
                .map_err(|e| SmacrossError::unavailable(ORIGIN, format!("CSV parse error: {e}")))?;

            let date_str = row.get(index[0]).unwrap_or_default().trim();
            // Accept both plain dates and timestamps such as "2023-03-01 00:00:00".
            let date_part = date_str.get(..10).unwrap_or(date_str);
            let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
                SmacrossError::unavailable(ORIGIN, format!("invalid date {date_str:?}: {}", e))
            })?;

            if date < start || date > end {
                continue;
            }

            records.push(PriceRecord {
                date,
                open: parse_price(row.get(index[1])),
                high: parse_price(row.get(index[2])),
                low: parse_price(row.get(index[3])),
                close: parse_price(row.get(index[4])),
                adjusted_close: parse_price(row.get(index[5])),
                volume: parse_volume(row.get(index[6])),
            });
        }

        let series = PriceSeries::new(ticker, records);
        if series.is_empty() {
            return Err(SmacrossError::NoData {
                ticker: ticker.to_string(),
                start,
                end,
            });
        }
        info!(ticker, rows = series.len(), path = %path.display(), "read prices from CSV");
        Ok(series)
    }
}
