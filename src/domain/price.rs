//! Daily price record for one ticker.

use crate::domain::error::SmacrossError;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: i64,
}

impl PriceRecord {
    /// Reject missing (non-finite) or non-positive prices and negative volume.
    pub fn validate(&self) -> Result<(), SmacrossError> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("adjusted_close", self.adjusted_close),
        ];
        for (name, value) in prices {
            if !value.is_finite() {
                return Err(SmacrossError::MalformedRecord {
                    date: self.date,
                    reason: format!("{name} is missing"),
                });
            }
            if value <= 0.0 {
                return Err(SmacrossError::MalformedRecord {
                    date: self.date,
                    reason: format!("{name} must be positive, got {value}"),
                });
            }
        }
        if self.volume < 0 {
            return Err(SmacrossError::MalformedRecord {
                date: self.date,
                reason: format!("volume must be non-negative, got {}", self.volume),
            });
        }
        Ok(())
    }
}
