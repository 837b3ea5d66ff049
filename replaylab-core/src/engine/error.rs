//! Fatal engine errors.
//!
//! Recoverable conditions (missing data files, malformed rows, orders without a bar
//! to fill against) are warnings and never surface here.

use thiserror::Error;

use crate::domain::EventKind;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown symbol '{symbol}': not part of the configured universe")]
    UnknownSymbol { symbol: String },

    #[error("event budget exceeded: more than {limit} events dispatched in feed step {step}")]
    EventBudgetExceeded { limit: usize, step: usize },

    #[error("no symbol in the universe has data")]
    EmptyUniverse,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("event bus closed: {0:?} event could not be delivered")]
    BusClosed(EventKind),
}

impl EngineError {
    pub fn unknown_symbol(symbol: &str) -> Self {
        Self::UnknownSymbol {
            symbol: symbol.to_string(),
        }
    }
}
