//! Strategy trait and implementations.
//!
//! A strategy sees only Market events. It emits Signal events through the
//! [`EventSender`](crate::engine::EventSender) it was constructed with and never
//! observes portfolio state.

pub mod ma_crossover;

pub use ma_crossover::DualMaCrossover;

use crate::domain::MarketEvent;
use crate::engine::error::EngineError;

pub trait Strategy {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    /// React to a new bar, possibly enqueueing Signal events.
    fn calculate_signals(&mut self, event: &MarketEvent) -> Result<(), EngineError>;
}

impl<T: Strategy + ?Sized> Strategy for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn calculate_signals(&mut self, event: &MarketEvent) -> Result<(), EngineError> {
        (**self).calculate_signals(event)
    }
}
