//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for smacross.
#[derive(Debug, thiserror::Error)]
pub enum SmacrossError {
    #[error("data source unavailable ({origin}): {reason}")]
    DataSourceUnavailable { origin: String, reason: String },

    #[error("no data for {ticker} between {start} and {end}")]
    NoData {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("insufficient history: have {rows} rows, moving average needs {window}")]
    InsufficientHistory { rows: usize, window: usize },

    #[error("malformed record on {date}: {reason}")]
    MalformedRecord { date: NaiveDate, reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SmacrossError {
    pub fn unavailable(origin: &str, reason: impl ToString) -> Self {
        SmacrossError::DataSourceUnavailable {
            origin: origin.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for every failure that means the price data could not be obtained.
    pub fn is_data_source_unavailable(&self) -> bool {
        matches!(
            self,
            SmacrossError::DataSourceUnavailable { .. } | SmacrossError::NoData { .. }
        )
    }
}

impl From<&SmacrossError> for std::process::ExitCode {
    fn from(err: &SmacrossError) -> Self {
        let code: u8 = match err {
            SmacrossError::Io(_) | SmacrossError::Report { .. } => 1,
            SmacrossError::ConfigParse { .. }
            | SmacrossError::ConfigMissing { .. }
            | SmacrossError::ConfigInvalid { .. } => 2,
            SmacrossError::DataSourceUnavailable { .. } | SmacrossError::NoData { .. } => 3,
            SmacrossError::InsufficientHistory { .. }
            | SmacrossError::MalformedRecord { .. }
            | SmacrossError::InvalidParameter { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_counts_as_unavailable() {
        let err = SmacrossError::NoData {
            ticker: "SQQQ".into(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        };
        assert!(err.is_data_source_unavailable());
        assert_eq!(
            err.to_string(),
            "no data for SQQQ between 2024-01-01 and 2024-01-31"
        );
    }

    #[test]
    fn computation_errors_are_not_unavailable() {
        let err = SmacrossError::InsufficientHistory { rows: 3, window: 50 };
        assert!(!err.is_data_source_unavailable());
    }

    #[test]
    fn unavailable_helper_formats_origin() {
        let err = SmacrossError::unavailable("cache", "disk full");
        assert_eq!(err.to_string(), "data source unavailable (cache): disk full");
    }
}
