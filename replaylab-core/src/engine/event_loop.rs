//! The dispatch loop.
//!
//! One feed step pushes at most one bar per symbol, then the queue is drained to
//! empty before the next step. Events are dispatched strictly in enqueue order:
//!
//! - Market → strategy, then portfolio mark-to-market
//! - Signal → portfolio
//! - Order  → execution
//! - Fill   → portfolio
//!
//! The run ends after the first step in which the feed produced nothing and the
//! queue is empty.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::bus::EventBus;
use super::error::EngineError;
use crate::data::DataFeed;
use crate::domain::{Event, EventKind};
use crate::execution::ExecutionHandler;
use crate::portfolio::Portfolio;
use crate::strategy::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on events dispatched within a single feed step.
    pub max_events_per_step: usize,
}

impl EngineConfig {
    pub const DEFAULT_MAX_EVENTS_PER_STEP: usize = 100_000;
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events_per_step: Self::DEFAULT_MAX_EVENTS_PER_STEP,
        }
    }
}

/// Dispatch counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Feed steps that produced at least one bar.
    pub feed_steps: usize,
    pub market_events: usize,
    pub signal_events: usize,
    pub order_events: usize,
    pub fill_events: usize,
}

impl RunStats {
    pub fn total_events(&self) -> usize {
        self.market_events + self.signal_events + self.order_events + self.fill_events
    }

    fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::Market => self.market_events += 1,
            EventKind::Signal => self.signal_events += 1,
            EventKind::Order => self.order_events += 1,
            EventKind::Fill => self.fill_events += 1,
        }
    }
}

/// Owns the bus and every component for the length of a run.
///
/// Components are built first, each with a sender from the same `bus`, then
/// handed over here.
pub struct Engine<F, S, X> {
    bus: EventBus,
    feed: F,
    strategy: S,
    portfolio: Portfolio,
    execution: X,
    config: EngineConfig,
    stats: RunStats,
    steps_taken: usize,
}

impl<F, S, X> Engine<F, S, X>
where
    F: DataFeed,
    S: Strategy,
    X: ExecutionHandler,
{
    pub fn new(
        bus: EventBus,
        feed: F,
        strategy: S,
        portfolio: Portfolio,
        execution: X,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        if feed.symbols().is_empty() {
            return Err(EngineError::EmptyUniverse);
        }
        if config.max_events_per_step == 0 {
            return Err(EngineError::InvalidParameters(
                "max_events_per_step must be >= 1".into(),
            ));
        }
        Ok(Self {
            bus,
            feed,
            strategy,
            portfolio,
            execution,
            config,
            stats: RunStats::default(),
            steps_taken: 0,
        })
    }

    /// Replay the feed to exhaustion.
    pub fn run(&mut self) -> Result<RunStats, EngineError> {
        info!(
            strategy = self.strategy.name(),
            symbols = self.feed.symbols().len(),
            max_events_per_step = self.config.max_events_per_step,
            "backtest started"
        );

        while self.step()? {}

        info!(
            feed_steps = self.stats.feed_steps,
            events = self.stats.total_events(),
            fills = self.stats.fill_events,
            final_equity = self.portfolio.current_equity(),
            "backtest finished"
        );
        Ok(self.stats)
    }

    /// Advance the feed once and drain the queue.
    ///
    /// Returns false once the feed has nothing left; the queue is still drained
    /// on that final call.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        let advanced = self.feed.advance();
        self.steps_taken += 1;
        if advanced {
            self.stats.feed_steps += 1;
        }
        let dispatched = self.drain()?;
        debug!(step = self.steps_taken, advanced, dispatched, "feed step drained");
        Ok(advanced)
    }

    /// Dispatch until the queue is empty. Returns the number of events handled.
    pub fn drain(&mut self) -> Result<usize, EngineError> {
        let mut dispatched = 0usize;
        while let Some(event) = self.bus.pop() {
            dispatched += 1;
            if dispatched > self.config.max_events_per_step {
                return Err(EngineError::EventBudgetExceeded {
                    limit: self.config.max_events_per_step,
                    step: self.steps_taken,
                });
            }
            self.dispatch(event)?;
        }
        Ok(dispatched)
    }

    fn dispatch(&mut self, event: Event) -> Result<(), EngineError> {
        self.stats.record(event.kind());
        debug!(kind = ?event.kind(), symbol = event.symbol(), "dispatch");
        match event {
            Event::Market(market) => {
                self.strategy.calculate_signals(&market)?;
                self.portfolio.update_timeindex(&market, &self.feed)
            }
            Event::Signal(signal) => self.portfolio.update_signal(&signal, &self.feed),
            Event::Order(order) => self.execution.execute_order(&order, &self.feed),
            Event::Fill(fill) => self.portfolio.update_fill(&fill, &self.feed),
        }
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn execution(&self) -> &X {
        &self.execution
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// New sender onto the engine's bus.
    pub fn sender(&self) -> super::bus::EventSender {
        self.bus.sender()
    }

    pub fn into_parts(self) -> (F, S, Portfolio, X, RunStats) {
        (
            self.feed,
            self.strategy,
            self.portfolio,
            self.execution,
            self.stats,
        )
    }
}
