//! Simulated broker: fills market orders at the latest bar's open.
//!
//! An order for a symbol with no bar yet is dropped with a warning and kept in
//! [`SimulatedExecution::dropped_orders`]. It is not retried.

use tracing::{debug, warn};

use super::{CostModel, ExecutionHandler};
use crate::data::LatestBar;
use crate::domain::{Bar, FillEvent, OrderEvent};
use crate::engine::bus::EventSender;
use crate::engine::error::EngineError;

#[derive(Debug)]
pub struct SimulatedExecution {
    cost: CostModel,
    sender: EventSender,
    dropped: Vec<OrderEvent>,
}

impl SimulatedExecution {
    pub fn new(cost: CostModel, sender: EventSender) -> Self {
        Self {
            cost,
            sender,
            dropped: Vec::new(),
        }
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    /// Orders that found no bar to fill against, in arrival order.
    pub fn dropped_orders(&self) -> &[OrderEvent] {
        &self.dropped
    }

    /// Fill `order` in full against `bar`.
    ///
    /// The fill keeps the order's timestamp even though the price comes from
    /// whatever bar is latest when the order is processed.
    pub fn simulate_fill(&self, order: &OrderEvent, bar: &Bar) -> FillEvent {
        let price = self.cost.fill_price(bar.open, order.side);
        FillEvent::new(
            order.timestamp,
            order.symbol.clone(),
            order.quantity,
            order.side,
            price,
            self.cost.commission(order.quantity),
        )
    }
}

impl ExecutionHandler for SimulatedExecution {
    fn execute_order(
        &mut self,
        order: &OrderEvent,
        bars: &dyn LatestBar,
    ) -> Result<(), EngineError> {
        let Some(bar) = bars.latest_bar(&order.symbol) else {
            warn!(
                symbol = %order.symbol,
                side = %order.side,
                quantity = order.quantity,
                "no bar available, order dropped"
            );
            self.dropped.push(order.clone());
            return Ok(());
        };

        let fill = self.simulate_fill(order, bar);
        debug!(
            symbol = %fill.symbol,
            side = %fill.side,
            quantity = fill.quantity,
            price = fill.fill_price,
            commission = fill.commission,
            "order filled"
        );
        self.sender.send(fill)
    }
}
