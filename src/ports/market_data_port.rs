//! Remote market data port trait.

use crate::domain::error::SmacrossError;
use crate::domain::series::PriceSeries;
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// Daily records for `ticker` with `start <= date <= end`.
    ///
    /// An empty result is `SmacrossError::NoData`; transport and parse
    /// failures are `SmacrossError::DataSourceUnavailable`.
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, SmacrossError>;
}
