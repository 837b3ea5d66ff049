//! Integration tests for the dispatch loop.
//!
//! Tests:
//! 1. End-to-end crossover run: entry fills at the latest open, cash and position move exactly
//! 2. Breadth-first ordering: every Market event of a step precedes its downstream events
//! 3. Orders with no bar are dropped, not retried
//! 4. Event budget guard stops a handler that re-enqueues forever
//! 5. Equity granularity and accounting identity across a multi-symbol run

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::NaiveDate;
use replaylab_core::data::{DataFeed, DateRange, HistoricBarFeed, LatestBar};
use replaylab_core::domain::{
    Bar, EquityPoint, MarketEvent, OrderEvent, OrderSide, SignalDirection, SignalEvent, Symbol,
};
use replaylab_core::engine::{Engine, EngineConfig, EngineError, EventBus, EventSender};
use replaylab_core::execution::{CostModel, ExecutionHandler, SimulatedExecution};
use replaylab_core::portfolio::{EquityGranularity, Portfolio};
use replaylab_core::strategy::{DualMaCrossover, Strategy};

// ── Helpers ──────────────────────────────────────────────────────────

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(i as i64)
}

/// Bars with the given (open, close) pairs on consecutive days.
fn bars(prices: &[(f64, f64)]) -> Vec<Bar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &(o, c))| Bar::new(day(i), o, o.max(c), o.min(c), c, 10_000))
        .collect()
}

fn flat(closes: &[f64]) -> Vec<Bar> {
    bars(&closes.iter().map(|&c| (c, c)).collect::<Vec<_>>())
}

fn symbols(names: &[&str]) -> Vec<Symbol> {
    names.iter().map(|s| s.to_string()).collect()
}

type Log = Rc<RefCell<Vec<String>>>;

/// Emits LONG on every bar and records what it saw.
struct AlwaysLong {
    log: Log,
    sender: EventSender,
}

impl Strategy for AlwaysLong {
    fn name(&self) -> &str {
        "always_long"
    }

    fn calculate_signals(&mut self, event: &MarketEvent) -> Result<(), EngineError> {
        self.log.borrow_mut().push(format!("M:{}", event.symbol));
        self.sender.send(SignalEvent::new(
            event.timestamp,
            event.symbol.clone(),
            SignalDirection::Long,
        ))
    }
}

/// Records each order, then delegates to the simulated broker.
struct Recording {
    log: Log,
    inner: SimulatedExecution,
}

impl ExecutionHandler for Recording {
    fn execute_order(
        &mut self,
        order: &OrderEvent,
        bars: &dyn LatestBar,
    ) -> Result<(), EngineError> {
        self.log.borrow_mut().push(format!("O:{}", order.symbol));
        self.inner.execute_order(order, bars)
    }
}

/// Re-sends every order it receives.
struct Echo {
    sender: EventSender,
}

impl ExecutionHandler for Echo {
    fn execute_order(&mut self, order: &OrderEvent, _: &dyn LatestBar) -> Result<(), EngineError> {
        self.sender.send(order.clone())
    }
}

/// Always signals for a symbol nobody else knows about.
struct Stray {
    sender: EventSender,
}

impl Strategy for Stray {
    fn name(&self) -> &str {
        "stray"
    }

    fn calculate_signals(&mut self, event: &MarketEvent) -> Result<(), EngineError> {
        self.sender
            .send(SignalEvent::new(event.timestamp, "ZZZ", SignalDirection::Long))
    }
}

// ── 1. End-to-end ────────────────────────────────────────────────────

#[test]
fn crossover_entry_fills_at_latest_open() {
    let syms = symbols(&["X"]);
    let mut series = HashMap::new();
    // closes 10, 9, 11; bar 3 opens at 10.5
    series.insert("X".to_string(), bars(&[(10.0, 10.0), (9.0, 9.0), (10.5, 11.0)]));

    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_bars(&syms, series, DateRange::all(), bus.sender());
    let strategy = DualMaCrossover::new(&syms, 1, 2, bus.sender()).unwrap();
    let portfolio = Portfolio::new(&syms, 100_000.0, bus.sender());
    let exec = SimulatedExecution::new(CostModel::frictionless(), bus.sender());
    let mut engine =
        Engine::new(bus, feed, strategy, portfolio, exec, EngineConfig::default()).unwrap();

    engine.run().unwrap();
    let p = engine.portfolio();

    assert_eq!(p.fills().len(), 1);
    let fill = &p.fills()[0];
    assert_eq!(fill.side, OrderSide::Buy);
    assert_eq!(fill.fill_price, 10.5);
    assert_eq!(fill.timestamp, day(2));

    assert_eq!(p.cash(), 100_000.0 - 100.0 * 10.5);
    assert_eq!(p.position("X"), Some(100));
    assert_eq!(p.current_equity(), p.cash() + 100.0 * 11.0);
    assert_eq!(engine.strategy().last_signal("X"), Some(SignalDirection::Long));
    assert!(engine.feed().is_exhausted());
}

#[test]
fn costs_are_charged_on_every_fill() {
    let syms = symbols(&["X"]);
    let mut series = HashMap::new();
    // up-cross at bar 3, down-cross at bar 4
    series.insert("X".to_string(), flat(&[10.0, 9.0, 11.0, 8.0]));

    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_bars(&syms, series, DateRange::all(), bus.sender());
    let strategy = DualMaCrossover::new(&syms, 1, 2, bus.sender()).unwrap();
    let portfolio = Portfolio::new(&syms, 100_000.0, bus.sender());
    let exec = SimulatedExecution::new(CostModel::new(0.01, 0.0), bus.sender());
    let mut engine =
        Engine::new(bus, feed, strategy, portfolio, exec, EngineConfig::default()).unwrap();

    engine.run().unwrap();
    let p = engine.portfolio();

    assert_eq!(p.fills().len(), 2);
    assert_eq!(p.position("X"), Some(0));
    assert!((p.total_commission() - 2.0).abs() < 1e-12);
    // bought 100 @ 11, sold 100 @ 8, paid 1.0 each way
    assert!((p.cash() - (100_000.0 - 1_101.0 + 799.0)).abs() < 1e-9);
}

// ── 2. Ordering ──────────────────────────────────────────────────────

#[test]
fn market_events_are_dispatched_breadth_first() {
    let syms = symbols(&["A", "B"]);
    let mut series = HashMap::new();
    series.insert("A".to_string(), flat(&[10.0, 11.0]));
    series.insert("B".to_string(), flat(&[20.0, 21.0]));

    let log: Log = Rc::default();
    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_bars(&syms, series, DateRange::all(), bus.sender());
    let strategy = AlwaysLong {
        log: Rc::clone(&log),
        sender: bus.sender(),
    };
    let portfolio = Portfolio::new(&syms, 100_000.0, bus.sender());
    let exec = Recording {
        log: Rc::clone(&log),
        inner: SimulatedExecution::new(CostModel::frictionless(), bus.sender()),
    };
    let mut engine =
        Engine::new(bus, feed, strategy, portfolio, exec, EngineConfig::default()).unwrap();

    let stats = engine.run().unwrap();

    // Step 2 LONG signals are ignored because both symbols are already long.
    assert_eq!(
        *log.borrow(),
        ["M:A", "M:B", "O:A", "O:B", "M:A", "M:B"]
    );
    assert_eq!(stats.feed_steps, 2);
    assert_eq!(stats.signal_events, 4);
    assert_eq!(stats.order_events, 2);
    assert_eq!(stats.fill_events, 2);
}

// ── 3. Dropped orders ────────────────────────────────────────────────

#[test]
fn order_before_any_bar_is_dropped() {
    let syms = symbols(&["X"]);
    let mut series = HashMap::new();
    series.insert("X".to_string(), flat(&[10.0, 10.0]));

    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_bars(&syms, series, DateRange::all(), bus.sender());
    let strategy = DualMaCrossover::new(&syms, 1, 2, bus.sender()).unwrap();
    let portfolio = Portfolio::new(&syms, 100_000.0, bus.sender());
    let exec = SimulatedExecution::new(CostModel::default(), bus.sender());
    let mut engine =
        Engine::new(bus, feed, strategy, portfolio, exec, EngineConfig::default()).unwrap();

    engine
        .sender()
        .send(OrderEvent::market(day(0), "X", 10, OrderSide::Buy))
        .unwrap();
    assert_eq!(engine.drain().unwrap(), 1);
    engine.run().unwrap();

    assert_eq!(engine.execution().dropped_orders().len(), 1);
    assert!(engine.portfolio().fills().is_empty());
    assert_eq!(engine.portfolio().cash(), 100_000.0);
}

// ── 4. Event budget ──────────────────────────────────────────────────

#[test]
fn runaway_reenqueue_hits_event_budget() {
    let syms = symbols(&["X"]);
    let mut series = HashMap::new();
    series.insert("X".to_string(), flat(&[10.0]));

    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_bars(&syms, series, DateRange::all(), bus.sender());
    let strategy = DualMaCrossover::new(&syms, 1, 2, bus.sender()).unwrap();
    let portfolio = Portfolio::new(&syms, 100_000.0, bus.sender());
    let exec = Echo {
        sender: bus.sender(),
    };
    let config = EngineConfig {
        max_events_per_step: 50,
    };
    let mut engine = Engine::new(bus, feed, strategy, portfolio, exec, config).unwrap();

    engine
        .sender()
        .send(OrderEvent::market(day(0), "X", 1, OrderSide::Buy))
        .unwrap();
    let err = engine.run().unwrap_err();
    assert!(matches!(
        err,
        EngineError::EventBudgetExceeded { limit: 50, step: 1 }
    ));
}

#[test]
fn unknown_symbol_aborts_the_run() {
    let syms = symbols(&["X"]);
    let mut series = HashMap::new();
    series.insert("X".to_string(), flat(&[10.0]));

    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_bars(&syms, series, DateRange::all(), bus.sender());
    let strategy = Stray {
        sender: bus.sender(),
    };
    let portfolio = Portfolio::new(&syms, 100_000.0, bus.sender());
    let exec = SimulatedExecution::new(CostModel::default(), bus.sender());
    let mut engine =
        Engine::new(bus, feed, strategy, portfolio, exec, EngineConfig::default()).unwrap();

    let err = engine.run().unwrap_err();
    assert!(matches!(err, EngineError::UnknownSymbol { ref symbol } if symbol == "ZZZ"));
}

// ── 5. Equity curve ──────────────────────────────────────────────────

fn two_symbol_run(granularity: EquityGranularity) -> (usize, Vec<EquityPoint>) {
    let syms = symbols(&["A", "B"]);
    let mut series = HashMap::new();
    series.insert("A".to_string(), flat(&[10.0, 9.0, 11.0, 12.0, 8.0]));
    series.insert("B".to_string(), flat(&[30.0, 31.0, 29.0, 33.0, 34.0]));

    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_bars(&syms, series, DateRange::all(), bus.sender());
    let strategy = DualMaCrossover::new(&syms, 1, 2, bus.sender()).unwrap();
    let portfolio =
        Portfolio::new(&syms, 100_000.0, bus.sender()).with_granularity(granularity);
    let exec = SimulatedExecution::new(CostModel::default(), bus.sender());
    let mut engine =
        Engine::new(bus, feed, strategy, portfolio, exec, EngineConfig::default()).unwrap();

    let stats = engine.run().unwrap();
    let (_, _, portfolio, _, _) = engine.into_parts();
    (stats.market_events, portfolio.into_equity_curve())
}

#[test]
fn per_timestamp_curve_has_one_point_per_step() {
    let (markets, curve) = two_symbol_run(EquityGranularity::PerTimestamp);
    assert_eq!(markets, 10);
    assert_eq!(curve.len(), 5);
    assert!(curve.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert!(curve.iter().all(|p| p.is_balanced()));
}

#[test]
fn per_event_curve_has_one_point_per_market_event() {
    let (markets, curve) = two_symbol_run(EquityGranularity::PerEvent);
    assert_eq!(curve.len(), markets);
    assert!(curve.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(curve.iter().all(|p| p.is_balanced()));
}

#[test]
fn misaligned_calendars_keep_the_curve_ordered() {
    // A skips day 1; B trades every day.
    let syms = symbols(&["A", "B"]);
    let mut series = HashMap::new();
    series.insert(
        "A".to_string(),
        vec![Bar::new(day(0), 10.0, 10.0, 10.0, 10.0, 100), Bar::new(day(2), 12.0, 12.0, 12.0, 12.0, 100)],
    );
    series.insert("B".to_string(), flat(&[20.0, 21.0, 22.0]));

    let log: Log = Rc::default();
    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_bars(&syms, series, DateRange::all(), bus.sender());
    let strategy = AlwaysLong {
        log: log.clone(),
        sender: bus.sender(),
    };
    let portfolio = Portfolio::new(&syms, 100_000.0, bus.sender());
    let exec = SimulatedExecution::new(CostModel::frictionless(), bus.sender());
    let mut engine =
        Engine::new(bus, feed, strategy, portfolio, exec, EngineConfig::default()).unwrap();

    let stats = engine.run().unwrap();
    assert_eq!(stats.market_events, 5);

    let curve = engine.portfolio().equity_curve();
    let stamps: Vec<NaiveDate> = curve.iter().map(|p| p.timestamp).collect();
    assert_eq!(stamps, [day(0), day(1), day(2)]);
    assert!(curve.iter().all(|p| p.is_balanced()));

    // Day 1 marks A at its day-0 close and B at its day-1 close.
    assert_eq!(curve[0].total_equity, 100_000.0);
    assert_eq!(curve[1].total_equity, 97_000.0 + 1_000.0 + 2_100.0);
    assert_eq!(curve[2].total_equity, 97_000.0 + 1_200.0 + 2_200.0);
}

#[test]
fn feed_with_unloadable_symbols_still_runs_the_rest() {
    let syms = symbols(&["X", "MISSING"]);
    let mut series = HashMap::new();
    series.insert("X".to_string(), flat(&[1.0, 2.0]));

    let bus = EventBus::new();
    let feed = HistoricBarFeed::from_bars(&syms, series, DateRange::all(), bus.sender());
    assert_eq!(feed.symbols(), ["X".to_string()]);
    assert_eq!(feed.warnings().len(), 1);

    let active = feed.symbols().to_vec();
    let strategy = DualMaCrossover::new(&active, 1, 2, bus.sender()).unwrap();
    let portfolio = Portfolio::new(&active, 100_000.0, bus.sender());
    let exec = SimulatedExecution::new(CostModel::default(), bus.sender());
    let mut engine =
        Engine::new(bus, feed, strategy, portfolio, exec, EngineConfig::default()).unwrap();
    assert_eq!(engine.run().unwrap().market_events, 2);
}
