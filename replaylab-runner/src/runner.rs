//! Backtest runner — wires feed, strategy, portfolio and execution from a config,
//! runs the engine and computes metrics.
//!
//! Two entry points:
//! - `run_backtest()`: loads one CSV per symbol from `data.csv_dir`. Used by the CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded bars. Used by tests and tooling.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};

use replaylab_core::data::{DataFeed, HistoricBarFeed};
use replaylab_core::domain::{Bar, Symbol};
use replaylab_core::engine::{Engine, EngineError, EventBus};
use replaylab_core::execution::SimulatedExecution;
use replaylab_core::portfolio::Portfolio;
use replaylab_core::strategy::DualMaCrossover;

use crate::config::{BacktestConfig, ConfigError};
use crate::metrics::{drawdown_series, PerformanceMetrics};
use crate::result::{BacktestResult, SCHEMA_VERSION};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Run a backtest reading bars from `config.data.csv_dir`.
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_csv_dir(
        &config.data.csv_dir,
        &config.data.file_pattern,
        &config.data.symbols,
        config.date_range(),
        bus.sender(),
    );
    run_with_feed(config, bus, feed)
}

/// Run a backtest over in-memory bars. `config.data.csv_dir` is ignored.
pub fn run_backtest_from_bars(
    config: &BacktestConfig,
    bars: HashMap<Symbol, Vec<Bar>>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_bars(
        &config.data.symbols,
        bars,
        config.date_range(),
        bus.sender(),
    );
    run_with_feed(config, bus, feed)
}

fn run_with_feed(
    config: &BacktestConfig,
    bus: EventBus,
    feed: HistoricBarFeed,
) -> Result<BacktestResult, RunError> {
    let run_id = config.run_id()?;
    let symbols = feed.symbols().to_vec();
    if symbols.is_empty() {
        return Err(EngineError::EmptyUniverse.into());
    }
    if symbols.len() < config.data.symbols.len() {
        warn!(
            requested = config.data.symbols.len(),
            active = symbols.len(),
            "running with a reduced universe"
        );
    }

    let strategy = DualMaCrossover::new(
        &symbols,
        config.strategy.short_window,
        config.strategy.long_window,
        bus.sender(),
    )?;
    let portfolio = Portfolio::new(&symbols, config.portfolio.initial_capital, bus.sender())
        .with_sizer(config.sizing.build())
        .with_granularity(config.engine.equity_granularity);
    let execution = SimulatedExecution::new(config.cost_model(), bus.sender());

    info!(run_id = %run_id, symbols = ?symbols, "starting run");
    let mut engine = Engine::new(bus, feed, strategy, portfolio, execution, config.engine_config())?;
    let stats = engine.run()?;
    let (feed, _strategy, portfolio, execution, _) = engine.into_parts();

    let equity: Vec<f64> = portfolio
        .equity_curve()
        .iter()
        .map(|p| p.total_equity)
        .collect();
    let metrics = PerformanceMetrics {
        fill_count: portfolio.fills().len(),
        total_commission: portfolio.total_commission(),
        ..PerformanceMetrics::compute(
            &equity,
            portfolio.initial_capital(),
            portfolio.current_equity(),
            config.report.periods_per_year,
            config.report.risk_free_rate,
        )
    };
    if !execution.dropped_orders().is_empty() {
        warn!(
            count = execution.dropped_orders().len(),
            "orders dropped for lack of a bar"
        );
    }

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        final_positions: portfolio
            .holdings()
            .iter()
            .map(|(s, h)| (s.clone(), h.quantity))
            .collect(),
        final_cash: portfolio.cash(),
        symbols,
        metrics,
        drawdown: drawdown_series(&equity),
        fills: portfolio.fills().to_vec(),
        equity_curve: portfolio.into_equity_curve(),
        stats,
        dropped_orders: execution.dropped_orders().to_vec(),
        warnings: feed.warnings().to_vec(),
    })
}
