//! Ordered daily price series for a single ticker.
//!
//! Construction sorts by date, drops duplicate dates (first occurrence wins)
//! and rejects malformed records, so every `PriceSeries` is strictly
//! increasing by date and holds only positive prices.

use crate::domain::price::PriceRecord;
use chrono::NaiveDate;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    records: Vec<PriceRecord>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, mut records: Vec<PriceRecord>) -> Self {
        let ticker = ticker.into();

        records.retain(|record| match record.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    ticker = %ticker,
                    date = %record.date,
                    "dropping record, date gap left in series: {e}"
                );
                false
            }
        });

        // Stable sort keeps the original order among equal dates, so dedup keeps the first.
        records.sort_by_key(|r| r.date);
        records.dedup_by_key(|r| r.date);

        Self { ticker, records }
    }

    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            records: Vec::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    pub fn adjusted_closes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.adjusted_close).collect()
    }

    /// Records with `start <= date <= end`.
    pub fn restrict(&self, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        let records = self
            .records
            .iter()
            .filter(|r| r.date >= start && r.date <= end)
            .cloned()
            .collect();
        Self {
            ticker: self.ticker.clone(),
            records,
        }
    }

    /// Union by date; rows already in `self` win over rows from `other`.
    pub fn merge(self, other: PriceSeries) -> PriceSeries {
        let mut records = self.records;
        records.extend(other.records);
        PriceSeries::new(self.ticker, records)
    }
}
