//! Backtest result — everything a run produces, serializable to `result.json`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use replaylab_core::data::FeedWarning;
use replaylab_core::domain::{EquityPoint, FillEvent, OrderEvent, Symbol};
use replaylab_core::engine::RunStats;

use crate::config::{BacktestConfig, RunId};
use crate::metrics::PerformanceMetrics;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: BacktestConfig,
    /// Symbols that actually had data.
    pub symbols: Vec<Symbol>,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<EquityPoint>,
    /// Same length as `equity_curve`.
    pub drawdown: Vec<f64>,
    pub fills: Vec<FillEvent>,
    /// Signed share count per symbol at the end of the run.
    pub final_positions: BTreeMap<Symbol, i64>,
    pub final_cash: f64,
    pub stats: RunStats,
    /// Orders that never found a bar to fill against.
    pub dropped_orders: Vec<OrderEvent>,
    pub warnings: Vec<FeedWarning>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// The summary metrics need at least two equity points.
    pub fn has_enough_data(&self) -> bool {
        self.equity_curve.len() >= 2
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
