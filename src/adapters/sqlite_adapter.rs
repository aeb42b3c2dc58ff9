//! SQLite price cache adapter.
//!
//! One `prices` table keyed by `(ticker, date)` and a `cache_meta` table
//! holding each ticker's freshness mark. Writes replace every row of the
//! ticker and its mark inside a single transaction, so the table always
//! holds one contiguous authoritative series per ticker.

use crate::domain::error::SmacrossError;
use crate::domain::price::PriceRecord;
use crate::domain::series::PriceSeries;
use crate::ports::cache_port::CachePort;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn pool_error(e: r2d2::Error) -> SmacrossError {
    SmacrossError::unavailable("cache", e)
}

fn query_error(e: rusqlite::Error) -> SmacrossError {
    SmacrossError::unavailable("cache", e)
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SmacrossError> {
        let db_path =
            config
                .get_string("cache", "path")
                .ok_or_else(|| SmacrossError::ConfigMissing {
                    section: "cache".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("cache", "pool_size", 1).max(1) as u32;
        Self::open_with_size(Path::new(&db_path), pool_size)
    }

    /// Open (creating if needed) the cache file and its schema.
    pub fn open(path: &Path) -> Result<Self, SmacrossError> {
        Self::open_with_size(path, 1)
    }

    fn open_with_size(path: &Path, pool_size: u32) -> Result<Self, SmacrossError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(SmacrossError::unavailable(
                    "cache",
                    format!("directory {} does not exist", parent.display()),
                ));
            }
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(CONNECT_TIMEOUT)
            .build(manager)
            .map_err(pool_error)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        debug!(path = %path.display(), "opened price cache");
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, SmacrossError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, SmacrossError> {
        self.pool.get().map_err(pool_error)
    }

    pub fn initialize_schema(&self) -> Result<(), SmacrossError> {
        let conn = self.connection()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS prices (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                adjusted_close REAL NOT NULL,
                volume INTEGER NOT NULL,
                PRIMARY KEY (ticker, date)
            );
            CREATE TABLE IF NOT EXISTS cache_meta (
                ticker TEXT PRIMARY KEY,
                fresh_through TEXT NOT NULL
            );",
        )
        .map_err(query_error)?;

        Ok(())
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            date_str.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

impl CachePort for SqliteAdapter {
    fn exists(&self, ticker: &str) -> Result<bool, SmacrossError> {
        let conn = self.connection()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM prices WHERE ticker = ?1)",
            params![ticker],
            |row| row.get(0),
        )
        .map_err(query_error)
    }

    fn read(&self, ticker: &str) -> Result<PriceSeries, SmacrossError> {
        let conn = self.connection()?;

        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, adjusted_close, volume
                 FROM prices
                 WHERE ticker = ?1
                 ORDER BY date ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![ticker], |row| {
                let date_str: String = row.get(0)?;
                Ok(PriceRecord {
                    date: parse_date(&date_str)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    adjusted_close: row.get(5)?,
                    volume: row.get(6)?,
                })
            })
            .map_err(query_error)?;

        let records = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;

        Ok(PriceSeries::new(ticker, records))
    }

    fn write(
        &self,
        ticker: &str,
        series: &PriceSeries,
        fresh_through: NaiveDate,
    ) -> Result<(), SmacrossError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction().map_err(query_error)?;

        tx.execute("DELETE FROM prices WHERE ticker = ?1", params![ticker])
            .map_err(query_error)?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO prices
                        (ticker, date, open, high, low, close, adjusted_close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(query_error)?;

            for record in series.records() {
                stmt.execute(params![
                    ticker,
                    record.date.format(DATE_FORMAT).to_string(),
                    record.open,
                    record.high,
                    record.low,
                    record.close,
                    record.adjusted_close,
                    record.volume
                ])
                .map_err(query_error)?;
            }
        }

        tx.execute(
            "INSERT INTO cache_meta (ticker, fresh_through) VALUES (?1, ?2)
             ON CONFLICT(ticker) DO UPDATE SET fresh_through = excluded.fresh_through",
            params![ticker, fresh_through.format(DATE_FORMAT).to_string()],
        )
        .map_err(query_error)?;

        tx.commit().map_err(query_error)?;
        debug!(ticker, rows = series.len(), %fresh_through, "wrote series to cache");
        Ok(())
    }

    fn fresh_through(&self, ticker: &str) -> Result<Option<NaiveDate>, SmacrossError> {
        let conn = self.connection()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT fresh_through FROM cache_meta WHERE ticker = ?1",
                params![ticker],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_error)?;

        stored
            .map(|s| parse_date(&s).map_err(query_error))
            .transpose()
    }

    fn mark_fresh(&self, ticker: &str, through: NaiveDate) -> Result<(), SmacrossError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO cache_meta (ticker, fresh_through) VALUES (?1, ?2)
             ON CONFLICT(ticker) DO UPDATE
             SET fresh_through = MAX(fresh_through, excluded.fresh_through)",
            params![ticker, through.format(DATE_FORMAT).to_string()],
        )
        .map_err(query_error)?;
        debug!(ticker, %through, "advanced cache freshness mark");
        Ok(())
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SmacrossError> {
        let conn = self.connection()?;

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM prices WHERE ticker = ?1",
                params![ticker],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = parse_date(&min_str).map_err(query_error)?;
                let max = parse_date(&max_str).map_err(query_error)?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}
