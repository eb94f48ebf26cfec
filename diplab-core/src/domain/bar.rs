//! PriceBar, the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single symbol over one sampling interval.
///
/// Only `timestamp`, `high` and `low` drive the simulators. The remaining
/// fields are carried through from the data source for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub unix_time: i64,
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Volume in the base asset (BTC).
    pub volume_base: f64,
    /// Volume in the quote asset (USDT).
    pub volume_quote: f64,
    pub buy_taker_amount: f64,
    pub buy_taker_quantity: f64,
    pub trade_count: u64,
    pub weighted_average: f64,
}

/// A bar whose values fall outside the OHLC domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("high {high} is below low {low}")]
    HighBelowLow { high: f64, low: f64 },

    #[error("{field} {value} lies outside the bar range [{low}, {high}]")]
    OutsideRange {
        field: &'static str,
        value: f64,
        low: f64,
        high: f64,
    },
}

impl PriceBar {
    /// Check the OHLC invariants, reporting the first violation.
    ///
    /// Prices must be finite and positive, `high >= low`, and both `open`
    /// and `close` must lie within `[low, high]`.
    pub fn validate(&self) -> Result<(), BarError> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (field, value) in prices {
            if !value.is_finite() {
                return Err(BarError::NotFinite { field });
            }
            if value <= 0.0 {
                return Err(BarError::NonPositive { field, value });
            }
        }

        if self.high < self.low {
            return Err(BarError::HighBelowLow {
                high: self.high,
                low: self.low,
            });
        }

        for (field, value) in [("open", self.open), ("close", self.close)] {
            if value > self.high || value < self.low {
                return Err(BarError::OutsideRange {
                    field,
                    value,
                    low: self.low,
                    high: self.high,
                });
            }
        }

        Ok(())
    }

    /// Boolean form of [`PriceBar::validate`].
    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }
}
