//! Execution: turns Order events into Fill events.
//!
//! Handlers read prices through [`LatestBar`] and enqueue fills through the
//! [`EventSender`](crate::engine::EventSender) they were built with. The
//! portfolio is never touched here.

pub mod cost_model;
pub mod simulated;

pub use cost_model::CostModel;
pub use simulated::SimulatedExecution;

use crate::data::LatestBar;
use crate::domain::OrderEvent;
use crate::engine::error::EngineError;

pub trait ExecutionHandler {
    /// Attempt to fill `order`, possibly enqueueing a Fill event.
    fn execute_order(&mut self, order: &OrderEvent, bars: &dyn LatestBar)
        -> Result<(), EngineError>;
}

impl<T: ExecutionHandler + ?Sized> ExecutionHandler for Box<T> {
    fn execute_order(
        &mut self,
        order: &OrderEvent,
        bars: &dyn LatestBar,
    ) -> Result<(), EngineError> {
        (**self).execute_order(order, bars)
    }
}
