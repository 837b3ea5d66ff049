//! Event — the single message type carried by the event bus.
//!
//! Four variants, one per stage of the causal pipeline:
//! Market (new bar) → Signal (strategy intent) → Order (portfolio request) → Fill (simulated execution).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::order::{OrderSide, OrderType, SignalDirection};
use super::Symbol;

/// A new bar arrived for `symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub timestamp: NaiveDate,
    pub symbol: Symbol,
    pub bar: Bar,
}

impl MarketEvent {
    /// Market event stamped with the bar's own date.
    pub fn new(symbol: impl Into<Symbol>, bar: Bar) -> Self {
        Self {
            timestamp: bar.date,
            symbol: symbol.into(),
            bar,
        }
    }
}

/// Strategy intent for `symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub timestamp: NaiveDate,
    pub symbol: Symbol,
    pub direction: SignalDirection,
    pub strength: f64,
}

impl SignalEvent {
    pub fn new(timestamp: NaiveDate, symbol: impl Into<Symbol>, direction: SignalDirection) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            direction,
            strength: 1.0,
        }
    }
}

/// Request to trade `quantity` shares. `quantity` is always positive; the side carries the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub timestamp: NaiveDate,
    pub symbol: Symbol,
    pub order_type: OrderType,
    pub quantity: u64,
    pub side: OrderSide,
}

impl OrderEvent {
    /// Market order.
    pub fn market(
        timestamp: NaiveDate,
        symbol: impl Into<Symbol>,
        quantity: u64,
        side: OrderSide,
    ) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            order_type: OrderType::Market,
            quantity,
            side,
        }
    }
}

/// Simulated execution of an order.
///
/// `cost` is the signed cash requirement: `quantity * fill_price + commission` for buys,
/// `-quantity * fill_price + commission` for sells. The portfolio debits it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub timestamp: NaiveDate,
    pub symbol: Symbol,
    pub quantity: u64,
    pub side: OrderSide,
    pub fill_price: f64,
    pub commission: f64,
    pub cost: f64,
}

impl FillEvent {
    pub fn new(
        timestamp: NaiveDate,
        symbol: impl Into<Symbol>,
        quantity: u64,
        side: OrderSide,
        fill_price: f64,
        commission: f64,
    ) -> Self {
        let notional = quantity as f64 * fill_price;
        let cost = match side {
            OrderSide::Buy => notional + commission,
            OrderSide::Sell => -notional + commission,
        };
        Self {
            timestamp,
            symbol: symbol.into(),
            quantity,
            side,
            fill_price,
            commission,
            cost,
        }
    }

    /// Signed share delta this fill applies to the position.
    pub fn position_delta(&self) -> i64 {
        self.side.sign() * self.quantity as i64
    }
}

/// Discriminant of [`Event`], used for stats and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Market,
    Signal,
    Order,
    Fill,
}

/// Tagged union of everything that travels through the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
        }
    }

    pub fn timestamp(&self) -> NaiveDate {
        match self {
            Event::Market(e) => e.timestamp,
            Event::Signal(e) => e.timestamp,
            Event::Order(e) => e.timestamp,
            Event::Fill(e) => e.timestamp,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Event::Market(e) => &e.symbol,
            Event::Signal(e) => &e.symbol,
            Event::Order(e) => &e.symbol,
            Event::Fill(e) => &e.symbol,
        }
    }
}

impl From<MarketEvent> for Event {
    fn from(e: MarketEvent) -> Self {
        Event::Market(e)
    }
}

impl From<SignalEvent> for Event {
    fn from(e: SignalEvent) -> Self {
        Event::Signal(e)
    }
}

impl From<OrderEvent> for Event {
    fn from(e: OrderEvent) -> Self {
        Event::Order(e)
    }
}

impl From<FillEvent> for Event {
    fn from(e: FillEvent) -> Self {
        Event::Fill(e)
    }
}
