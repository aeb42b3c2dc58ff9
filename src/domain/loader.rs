//! Cache-aware price loading.
//!
//! The cache is consulted first; only the days after the ticker's freshness
//! mark are fetched from the remote source, merged, and written back as one
//! full overwrite. A ticker with nothing cached is fetched for the whole
//! requested range. An empty gap fetch only advances the mark.

use crate::domain::error::SmacrossError;
use crate::domain::series::PriceSeries;
use crate::ports::cache_port::CachePort;
use crate::ports::market_data_port::MarketDataPort;
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

pub struct DataLoader<'a> {
    cache: &'a dyn CachePort,
    remote: &'a dyn MarketDataPort,
    today: NaiveDate,
}

impl<'a> DataLoader<'a> {
    pub fn new(cache: &'a dyn CachePort, remote: &'a dyn MarketDataPort) -> Self {
        Self {
            cache,
            remote,
            today: Utc::now().date_naive(),
        }
    }

    /// Pins the calendar date that bounds freshness marks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// The series for `ticker` restricted to `[start_date, end_date]`.
    pub fn load(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, SmacrossError> {
        if start_date > end_date {
            return Err(SmacrossError::InvalidParameter {
                name: "start_date".into(),
                reason: format!("{start_date} is after end_date {end_date}"),
            });
        }

        let cached = if self.cache.exists(ticker)? {
            let series = self.cache.read(ticker)?;
            info!(ticker, rows = series.len(), "loaded cached series");
            Some(series).filter(|s| !s.is_empty())
        } else {
            None
        };

        let series = match cached {
            Some(cached) => self.refresh(ticker, cached, start_date, end_date)?,
            None => {
                info!(ticker, %start_date, %end_date, "no cached data, fetching full range");
                let fetched = self.remote.fetch(ticker, start_date, end_date)?;
                let fresh_through = self.fresh_mark(end_date, fetched.last_date());
                self.cache.write(ticker, &fetched, fresh_through)?;
                info!(ticker, rows = fetched.len(), %fresh_through, "stored new series in cache");
                fetched
            }
        };

        let restricted = series.restrict(start_date, end_date);
        if restricted.is_empty() {
            return Err(SmacrossError::NoData {
                ticker: ticker.to_string(),
                start: start_date,
                end: end_date,
            });
        }
        Ok(restricted)
    }

    fn refresh(
        &self,
        ticker: &str,
        cached: PriceSeries,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, SmacrossError> {
        if let Some(first) = cached.first_date() {
            if first > start_date {
                warn!(ticker, %first, %start_date, "cache begins after the requested start date");
            }
        }

        let Some(last_cached) = cached.last_date() else {
            return Ok(cached);
        };
        let checked = match self.cache.fresh_through(ticker)? {
            Some(mark) => mark.max(last_cached),
            None => last_cached,
        };

        // A cache checked through the day before end_date is treated as current.
        let stale_before = end_date.pred_opt().unwrap_or(end_date);
        if checked >= stale_before {
            info!(ticker, %last_cached, %checked, "cache is up to date");
            return Ok(cached);
        }

        let gap_start = checked.succ_opt().unwrap_or(checked);
        info!(ticker, %gap_start, %end_date, "cache is outdated, fetching missing rows");

        let missing = match self.remote.fetch(ticker, gap_start, end_date) {
            Ok(series) => series,
            Err(SmacrossError::NoData { .. }) => {
                let through = self.fresh_mark(end_date, Some(checked));
                warn!(ticker, %gap_start, %end_date, "no new trading days in gap, using cache");
                if through > checked {
                    self.cache.mark_fresh(ticker, through)?;
                }
                return Ok(cached);
            }
            Err(e) => return Err(e),
        };

        let fetched = missing.len();
        let merged = cached.merge(missing);
        let fresh_through = self.fresh_mark(end_date, merged.last_date());
        self.cache.write(ticker, &merged, fresh_through)?;
        info!(ticker, fetched, rows = merged.len(), %fresh_through, "updated cache");
        Ok(merged)
    }

    /// The day a fetch ending at `end_date` vouches for. Today's bar may still
    /// be forming, so the mark stops at yesterday but never precedes `floor`.
    fn fresh_mark(&self, end_date: NaiveDate, floor: Option<NaiveDate>) -> NaiveDate {
        let yesterday = self.today.pred_opt().unwrap_or(self.today);
        let bound = end_date.min(yesterday);
        floor.map_or(bound, |f| f.max(bound))
    }
}
