//! Event-driven engine: the bus, the dispatch loop and fatal errors.

pub mod bus;
pub mod error;
pub mod event_loop;

pub use bus::{EventBus, EventSender};
pub use error::EngineError;
pub use event_loop::{Engine, EngineConfig, RunStats};
