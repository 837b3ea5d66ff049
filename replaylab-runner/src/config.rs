//! Serializable backtest configuration.
//!
//! Every section is optional in TOML; missing sections and keys take the
//! defaults below.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use replaylab_core::data::historic::SYMBOL_PLACEHOLDER;
use replaylab_core::data::DateRange;
use replaylab_core::domain::Symbol;
use replaylab_core::engine::EngineConfig;
use replaylab_core::execution::CostModel;
use replaylab_core::portfolio::{EquityGranularity, FixedQuantity, OrderSizer, PercentEquity};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete, reproducible description of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BacktestConfig {
    pub data: DataConfig,
    pub portfolio: PortfolioConfig,
    pub sizing: SizingConfig,
    pub strategy: StrategyConfig,
    pub execution: ExecutionConfig,
    pub engine: EngineSection,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding one CSV per symbol.
    pub csv_dir: PathBuf,
    /// File name with `{symbol}` substituted.
    pub file_pattern: String,
    pub symbols: Vec<Symbol>,
    /// Inclusive lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("data"),
            file_pattern: "{symbol}_1d.csv".into(),
            symbols: vec!["AAPL".into()],
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortfolioConfig {
    pub initial_capital: f64,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
        }
    }
}

/// Entry sizing rule (serializable enum).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingConfig {
    /// Fixed number of shares per entry.
    FixedQuantity { quantity: u64 },

    /// Fraction of total equity per entry, converted at the latest close.
    PercentEquity { fraction: f64 },
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self::FixedQuantity {
            quantity: FixedQuantity::DEFAULT_QUANTITY,
        }
    }
}

impl SizingConfig {
    pub fn build(&self) -> Box<dyn OrderSizer> {
        match *self {
            Self::FixedQuantity { quantity } => Box::new(FixedQuantity::new(quantity)),
            Self::PercentEquity { fraction } => Box::new(PercentEquity::new(fraction)),
        }
    }
}

/// Dual moving average crossover windows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StrategyConfig {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub commission_per_share: f64,
    pub slippage_pct: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            commission_per_share: CostModel::DEFAULT_COMMISSION_PER_SHARE,
            slippage_pct: CostModel::DEFAULT_SLIPPAGE_PCT,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSection {
    pub equity_granularity: EquityGranularity,
    pub max_events_per_step: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            equity_granularity: EquityGranularity::default(),
            max_events_per_step: EngineConfig::DEFAULT_MAX_EVENTS_PER_STEP,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub periods_per_year: f64,
    /// Annual rate, e.g. 0.02 = 2%.
    pub risk_free_rate: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.data.symbols.is_empty() {
            return invalid("data.symbols must list at least one symbol".into());
        }
        if self.data.symbols.iter().any(|s| s.trim().is_empty()) {
            return invalid("data.symbols contains an empty symbol".into());
        }
        if self.data.symbols.len() > 1 && !self.data.file_pattern.contains(SYMBOL_PLACEHOLDER) {
            return invalid(format!(
                "data.file_pattern must contain {SYMBOL_PLACEHOLDER} when trading several symbols"
            ));
        }
        if let (Some(start), Some(end)) = (self.data.start_date, self.data.end_date) {
            if start > end {
                return invalid(format!(
                    "data.start_date ({start}) is after data.end_date ({end})"
                ));
            }
        }

        let capital = self.portfolio.initial_capital;
        if !(capital.is_finite() && capital > 0.0) {
            return invalid(format!(
                "portfolio.initial_capital must be positive, got {capital}"
            ));
        }

        match self.sizing {
            SizingConfig::FixedQuantity { quantity: 0 } => {
                return invalid("sizing.quantity must be >= 1".into());
            }
            SizingConfig::PercentEquity { fraction } if !(fraction > 0.0 && fraction <= 1.0) => {
                return invalid(format!(
                    "sizing.fraction must be in (0, 1], got {fraction}"
                ));
            }
            _ => {}
        }

        let StrategyConfig {
            short_window,
            long_window,
        } = self.strategy;
        if short_window == 0 {
            return invalid("strategy.short_window must be >= 1".into());
        }
        if short_window >= long_window {
            return invalid(format!(
                "strategy.short_window ({short_window}) must be less than strategy.long_window ({long_window})"
            ));
        }

        let commission = self.execution.commission_per_share;
        if !(commission.is_finite() && commission >= 0.0) {
            return invalid(format!(
                "execution.commission_per_share must be >= 0, got {commission}"
            ));
        }
        let slippage = self.execution.slippage_pct;
        if !(0.0..1.0).contains(&slippage) {
            return invalid(format!(
                "execution.slippage_pct must be in [0, 1), got {slippage}"
            ));
        }

        if self.engine.max_events_per_step == 0 {
            return invalid("engine.max_events_per_step must be >= 1".into());
        }

        let ppy = self.report.periods_per_year;
        if !(ppy.is_finite() && ppy > 0.0) {
            return invalid(format!(
                "report.periods_per_year must be positive, got {ppy}"
            ));
        }
        if !self.report.risk_free_rate.is_finite() {
            return invalid("report.risk_free_rate must be finite".into());
        }

        Ok(())
    }

    /// Deterministic hash of the configuration.
    ///
    /// Two identical configs share a RunId; any parameter change produces a new one.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.data.start_date, self.data.end_date)
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(
            self.execution.commission_per_share,
            self.execution.slippage_pct,
        )
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_events_per_step: self.engine.max_events_per_step,
        }
    }
}
