//! Local price cache port trait.

use crate::domain::error::SmacrossError;
use crate::domain::series::PriceSeries;
use chrono::NaiveDate;

/// Persistent table store keyed by ticker, one authoritative series per ticker.
///
/// Alongside the rows, each ticker carries a `fresh_through` date: the last
/// day the remote source has been asked about. It can run past the last
/// stored row when the remote had nothing to add (weekends, holidays).
pub trait CachePort {
    fn exists(&self, ticker: &str) -> Result<bool, SmacrossError>;

    fn read(&self, ticker: &str) -> Result<PriceSeries, SmacrossError>;

    /// Replaces every stored row for `ticker` with `series` and sets its
    /// freshness mark to `fresh_through`, atomically.
    fn write(
        &self,
        ticker: &str,
        series: &PriceSeries,
        fresh_through: NaiveDate,
    ) -> Result<(), SmacrossError>;

    fn fresh_through(&self, ticker: &str) -> Result<Option<NaiveDate>, SmacrossError>;

    /// Advances the freshness mark without touching rows. Never moves it back.
    fn mark_fresh(&self, ticker: &str, through: NaiveDate) -> Result<(), SmacrossError>;

    /// First date, last date and row count, or `None` when nothing is stored.
    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SmacrossError>;
}
