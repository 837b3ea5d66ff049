//! ReplayLab Runner — backtest orchestration, metrics and report export.
//!
//! This crate builds on `replaylab-core` to provide:
//! - TOML configuration with validation and content-addressed run ids
//! - Single-backtest runner wiring feed, strategy, portfolio and execution
//! - Performance metrics (total return, Sharpe, drawdown)
//! - Text summary and artifact export (`equity.csv`, `result.json`)

pub mod config;
pub mod metrics;
pub mod reporting;
pub mod result;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, RunId, SizingConfig};
pub use metrics::PerformanceMetrics;
pub use reporting::{render_summary, ArtifactManager, ArtifactPaths};
pub use result::BacktestResult;
pub use runner::{run_backtest, run_backtest_from_bars, RunError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_metrics_is_send_sync() {
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
    }
}
