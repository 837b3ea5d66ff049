//! Equity curve points.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One snapshot of the portfolio's value.
///
/// `total_equity` is always computed as `cash + holdings_value` at construction,
/// so the accounting identity holds bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDate,
    pub cash: f64,
    pub holdings_value: f64,
    pub total_equity: f64,
}

impl EquityPoint {
    pub fn new(timestamp: NaiveDate, cash: f64, holdings_value: f64) -> Self {
        Self {
            timestamp,
            cash,
            holdings_value,
            total_equity: cash + holdings_value,
        }
    }

    /// `total_equity == cash + holdings_value`, exactly.
    pub fn is_balanced(&self) -> bool {
        self.total_equity == self.cash + self.holdings_value
    }
}
