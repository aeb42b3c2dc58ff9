#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use smacross::domain::error::SmacrossError;
use smacross::domain::price::PriceRecord;
use smacross::domain::series::PriceSeries;
use smacross::ports::cache_port::CachePort;
use smacross::ports::market_data_port::MarketDataPort;
use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory cache that counts full-overwrite writes.
#[derive(Default)]
pub struct MockCache {
    pub tables: RefCell<HashMap<String, PriceSeries>>,
    pub fresh: RefCell<HashMap<String, NaiveDate>>,
    pub writes: RefCell<usize>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(self, series: PriceSeries) -> Self {
        self.tables
            .borrow_mut()
            .insert(series.ticker().to_string(), series);
        self
    }

    pub fn stored(&self, ticker: &str) -> Option<PriceSeries> {
        self.tables.borrow().get(ticker).cloned()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }

    pub fn fresh_mark(&self, ticker: &str) -> Option<NaiveDate> {
        self.fresh.borrow().get(ticker).copied()
    }
}

impl CachePort for MockCache {
    fn exists(&self, ticker: &str) -> Result<bool, SmacrossError> {
        Ok(self.tables.borrow().contains_key(ticker))
    }

    fn read(&self, ticker: &str) -> Result<PriceSeries, SmacrossError> {
        Ok(self
            .tables
            .borrow()
            .get(ticker)
            .cloned()
            .unwrap_or_else(|| PriceSeries::empty(ticker)))
    }

    fn write(
        &self,
        ticker: &str,
        series: &PriceSeries,
        fresh_through: NaiveDate,
    ) -> Result<(), SmacrossError> {
        *self.writes.borrow_mut() += 1;
        self.tables
            .borrow_mut()
            .insert(ticker.to_string(), series.clone());
        self.fresh
            .borrow_mut()
            .insert(ticker.to_string(), fresh_through);
        Ok(())
    }

    fn fresh_through(&self, ticker: &str) -> Result<Option<NaiveDate>, SmacrossError> {
        Ok(self.fresh_mark(ticker))
    }

    fn mark_fresh(&self, ticker: &str, through: NaiveDate) -> Result<(), SmacrossError> {
        let mut fresh = self.fresh.borrow_mut();
        let mark = fresh.entry(ticker.to_string()).or_insert(through);
        *mark = (*mark).max(through);
        Ok(())
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SmacrossError> {
        Ok(self.tables.borrow().get(ticker).and_then(|s| {
            match (s.first_date(), s.last_date()) {
                (Some(first), Some(last)) => Some((first, last, s.len())),
                _ => None,
            }
        }))
    }
}

/// Remote source backed by a fixed series; records every requested range.
pub struct MockMarketData {
    pub data: HashMap<String, PriceSeries>,
    pub unavailable: bool,
    pub calls: RefCell<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            unavailable: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.data.insert(series.ticker().to_string(), series);
        self
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, SmacrossError> {
        self.calls
            .borrow_mut()
            .push((ticker.to_string(), start, end));

        if self.unavailable {
            return Err(SmacrossError::unavailable("mock", "connection refused"));
        }

        let series = self
            .data
            .get(ticker)
            .map(|s| s.restrict(start, end))
            .unwrap_or_else(|| PriceSeries::empty(ticker));
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

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_record(date: NaiveDate, adjusted_close: f64) -> PriceRecord {
    PriceRecord {
        date,
        open: adjusted_close,
        high: adjusted_close * 1.01,
        low: adjusted_close * 0.99,
        close: adjusted_close,
        adjusted_close,
        volume: 1_000_000,
    }
}

/// Consecutive weekdays starting at `start`, one per price.
pub fn make_series(ticker: &str, start: NaiveDate, prices: &[f64]) -> PriceSeries {
    let records = trading_days(start)
        .zip(prices)
        .map(|(d, &p)| make_record(d, p))
        .collect();
    PriceSeries::new(ticker, records)
}

/// `count` weekday prices following a deterministic zig-zag drift.
pub fn generate_series(ticker: &str, start: NaiveDate, count: usize) -> PriceSeries {
    let prices: Vec<f64> = (0..count)
        .map(|i| {
            let i = i as f64;
            50.0 + 10.0 * (i / 7.0).sin() + 0.05 * i
        })
        .collect();
    make_series(ticker, start, &prices)
}

pub fn trading_days(start: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
}
