//! Domain types for ReplayLab

pub mod bar;
pub mod equity;
pub mod event;
pub mod order;

pub use bar::Bar;
pub use equity::EquityPoint;
pub use event::{Event, EventKind, FillEvent, MarketEvent, OrderEvent, SignalEvent};
pub use order::{OrderSide, OrderType, SignalDirection};

/// Symbol type alias
pub type Symbol = String;
