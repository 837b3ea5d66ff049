//! Portfolio — cash, positions, holdings valuation and the equity curve.
//!
//! Consumes three event kinds:
//! - Market: mark every holding to its latest close and record an [`EquityPoint`]
//! - Signal: translate intent into an Order under the long-only policy
//! - Fill: debit `fill.cost` from cash and move the position
//!
//! Cash changes only on fills. Holdings value changes only on marks, or on a fill
//! (revalued at the latest close, or provisionally at the fill price when the
//! symbol has no bar yet).

pub mod sizing;

pub use sizing::{FixedQuantity, OrderSizer, PercentEquity};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::LatestBar;
use crate::domain::{
    EquityPoint, FillEvent, MarketEvent, OrderEvent, OrderSide, SignalDirection, SignalEvent,
    Symbol,
};
use crate::engine::bus::EventSender;
use crate::engine::error::EngineError;

/// How Market events map to equity points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquityGranularity {
    /// One point per distinct timestamp: a Market event with the same timestamp
    /// as the last recorded point overwrites it.
    #[default]
    PerTimestamp,
    /// One point per Market event.
    PerEvent,
}

/// Per-symbol ledger entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Signed share count.
    pub quantity: i64,
    /// `quantity * last known price`.
    pub market_value: f64,
}

#[derive(Debug)]
pub struct Portfolio {
    initial_capital: f64,
    cash: f64,
    /// Ordered so the holdings sum is reproducible run to run.
    holdings: BTreeMap<Symbol, Holding>,
    equity_curve: Vec<EquityPoint>,
    fills: Vec<FillEvent>,
    total_commission: f64,
    sizer: Box<dyn OrderSizer>,
    granularity: EquityGranularity,
    sender: EventSender,
}

impl Portfolio {
    /// Portfolio tracking exactly `symbols`, sized with [`FixedQuantity::default`].
    pub fn new(symbols: &[Symbol], initial_capital: f64, sender: EventSender) -> Self {
        let holdings = symbols
            .iter()
            .map(|s| (s.clone(), Holding::default()))
            .collect();
        Self {
            initial_capital,
            cash: initial_capital,
            holdings,
            equity_curve: Vec::new(),
            fills: Vec::new(),
            total_commission: 0.0,
            sizer: Box::new(FixedQuantity::default()),
            granularity: EquityGranularity::default(),
            sender,
        }
    }

    pub fn with_sizer(mut self, sizer: Box<dyn OrderSizer>) -> Self {
        self.sizer = sizer;
        self
    }

    pub fn with_granularity(mut self, granularity: EquityGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Mark to market and record an equity point.
    pub fn update_timeindex(
        &mut self,
        event: &MarketEvent,
        bars: &dyn LatestBar,
    ) -> Result<(), EngineError> {
        if !self.holdings.contains_key(&event.symbol) {
            return Err(EngineError::unknown_symbol(&event.symbol));
        }

        for (symbol, holding) in self.holdings.iter_mut() {
            if holding.quantity == 0 {
                holding.market_value = 0.0;
            } else if let Some(bar) = bars.latest_bar(symbol) {
                holding.market_value = holding.quantity as f64 * bar.close;
            }
            // Non-zero position without a bar keeps its last valuation.
        }

        let point = EquityPoint::new(event.timestamp, self.cash, self.total_holdings_value());
        match (self.granularity, self.equity_curve.last_mut()) {
            (EquityGranularity::PerTimestamp, Some(last)) if last.timestamp == point.timestamp => {
                *last = point;
            }
            _ => self.equity_curve.push(point),
        }
        Ok(())
    }

    /// Long-only, fixed-intent order policy.
    ///
    /// LONG while flat buys the sizer's quantity; EXIT while long sells the whole
    /// position. Every other combination is ignored.
    pub fn update_signal(
        &mut self,
        signal: &SignalEvent,
        bars: &dyn LatestBar,
    ) -> Result<(), EngineError> {
        let quantity = self.holding(&signal.symbol)?.quantity;

        let order = match signal.direction {
            SignalDirection::Long if quantity == 0 => {
                let reference = bars.latest_bar(&signal.symbol).map(|b| b.close);
                match self.sizer.entry_quantity(self.current_equity(), reference) {
                    Some(shares) if shares > 0 => Some(OrderEvent::market(
                        signal.timestamp,
                        signal.symbol.clone(),
                        shares,
                        OrderSide::Buy,
                    )),
                    _ => {
                        debug!(symbol = %signal.symbol, sizer = self.sizer.name(), "sizer declined entry");
                        None
                    }
                }
            }
            SignalDirection::Exit if quantity > 0 => Some(OrderEvent::market(
                signal.timestamp,
                signal.symbol.clone(),
                quantity.unsigned_abs(),
                OrderSide::Sell,
            )),
            _ => None,
        };

        match order {
            Some(order) => {
                debug!(
                    symbol = %order.symbol,
                    side = %order.side,
                    quantity = order.quantity,
                    "order placed"
                );
                self.sender.send(order)
            }
            None => {
                debug!(symbol = %signal.symbol, direction = %signal.direction, position = quantity, "signal ignored");
                Ok(())
            }
        }
    }

    /// Apply a fill to cash and position, then revalue that holding.
    pub fn update_fill(&mut self, fill: &FillEvent, bars: &dyn LatestBar) -> Result<(), EngineError> {
        let holding = self
            .holdings
            .get_mut(&fill.symbol)
            .ok_or_else(|| EngineError::unknown_symbol(&fill.symbol))?;

        self.cash -= fill.cost;
        holding.quantity += fill.position_delta();
        let price = bars
            .latest_bar(&fill.symbol)
            .map_or(fill.fill_price, |bar| bar.close);
        holding.market_value = holding.quantity as f64 * price;

        self.total_commission += fill.commission;
        self.fills.push(fill.clone());
        debug!(
            symbol = %fill.symbol,
            side = %fill.side,
            quantity = fill.quantity,
            price = fill.fill_price,
            cash = self.cash,
            "fill applied"
        );
        Ok(())
    }

    /// The equity curve, in recording order.
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn into_equity_curve(self) -> Vec<EquityPoint> {
        self.equity_curve
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Signed share count, or `None` if the symbol is not tracked.
    pub fn position(&self, symbol: &str) -> Option<i64> {
        self.holdings.get(symbol).map(|h| h.quantity)
    }

    pub fn holdings_value(&self, symbol: &str) -> Option<f64> {
        self.holdings.get(symbol).map(|h| h.market_value)
    }

    pub fn holdings(&self) -> &BTreeMap<Symbol, Holding> {
        &self.holdings
    }

    pub fn total_holdings_value(&self) -> f64 {
        self.holdings.values().map(|h| h.market_value).sum()
    }

    /// Cash plus current holdings valuation.
    pub fn current_equity(&self) -> f64 {
        self.cash + self.total_holdings_value()
    }

    pub fn fills(&self) -> &[FillEvent] {
        &self.fills
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn granularity(&self) -> EquityGranularity {
        self.granularity
    }

    pub fn sizer(&self) -> &dyn OrderSizer {
        self.sizer.as_ref()
    }

    fn holding(&self, symbol: &str) -> Result<&Holding, EngineError> {
        self.holdings
            .get(symbol)
            .ok_or_else(|| EngineError::unknown_symbol(symbol))
    }
}
