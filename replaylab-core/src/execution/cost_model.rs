//! Cost model — slippage and commission.
//!
//! Slippage is directional: buyers pay more, sellers receive less.
//! Commission is a flat amount per share traded.

use serde::{Deserialize, Serialize};

use crate::domain::OrderSide;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Currency units charged per share, on both sides.
    pub commission_per_share: f64,
    /// Fractional price adjustment, e.g. 0.0005 = 5 bps.
    pub slippage_pct: f64,
}

impl CostModel {
    pub const DEFAULT_COMMISSION_PER_SHARE: f64 = 0.001;
    pub const DEFAULT_SLIPPAGE_PCT: f64 = 0.0005;

    pub fn new(commission_per_share: f64, slippage_pct: f64) -> Self {
        Self {
            commission_per_share,
            slippage_pct,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    /// `open * (1 + slippage)` for buys, `open * (1 - slippage)` for sells.
    pub fn fill_price(&self, open: f64, side: OrderSide) -> f64 {
        match side {
            OrderSide::Buy => open * (1.0 + self.slippage_pct),
            OrderSide::Sell => open * (1.0 - self.slippage_pct),
        }
    }

    pub fn commission(&self, quantity: u64) -> f64 {
        self.commission_per_share * quantity as f64
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_COMMISSION_PER_SHARE,
            Self::DEFAULT_SLIPPAGE_PCT,
        )
    }
}
