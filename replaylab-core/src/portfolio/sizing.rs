//! Order sizing for new long entries.
//!
//! Exits always close the whole position; only entries are sized.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Decides how many shares a LONG entry buys.
pub trait OrderSizer: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Shares to buy given current total equity and the latest close (if any).
    ///
    /// `None` or `Some(0)` means "do not place an order".
    fn entry_quantity(&self, equity: f64, reference_price: Option<f64>) -> Option<u64>;
}

/// Always trade the same number of shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedQuantity {
    pub quantity: u64,
}

impl FixedQuantity {
    pub const DEFAULT_QUANTITY: u64 = 100;

    pub fn new(quantity: u64) -> Self {
        Self { quantity }
    }
}

impl Default for FixedQuantity {
    fn default() -> Self {
        Self::new(Self::DEFAULT_QUANTITY)
    }
}

impl OrderSizer for FixedQuantity {
    fn name(&self) -> &str {
        "fixed_quantity"
    }

    fn entry_quantity(&self, _equity: f64, _reference_price: Option<f64>) -> Option<u64> {
        Some(self.quantity)
    }
}

/// Buy `floor(fraction * equity / price)` shares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentEquity {
    /// Fraction of total equity, e.g. 0.25 = 25%.
    pub fraction: f64,
}

impl PercentEquity {
    pub fn new(fraction: f64) -> Self {
        Self { fraction }
    }
}

impl OrderSizer for PercentEquity {
    fn name(&self) -> &str {
        "percent_equity"
    }

    fn entry_quantity(&self, equity: f64, reference_price: Option<f64>) -> Option<u64> {
        let price = reference_price.filter(|p| *p > 0.0 && p.is_finite())?;
        if equity <= 0.0 || self.fraction <= 0.0 {
            return None;
        }
        let shares = (equity * self.fraction / price).floor();
        (shares >= 1.0).then_some(shares as u64)
    }
}
