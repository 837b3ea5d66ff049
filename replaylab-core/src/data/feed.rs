//! Data feed traits.
//!
//! The core never reads storage directly. It asks a [`DataFeed`] to advance one
//! step (which enqueues Market events) and looks up the most recent bar per symbol
//! through [`LatestBar`].

use std::collections::{BTreeMap, HashMap};

use crate::domain::{Bar, Symbol};

/// Read-only view of the most recent bar seen per symbol.
pub trait LatestBar {
    /// Last bar pushed for `symbol`, or `None` if no bar has arrived yet.
    fn latest_bar(&self, symbol: &str) -> Option<&Bar>;
}

/// A source of ordered bars for a fixed symbol universe.
pub trait DataFeed: LatestBar {
    /// Active universe, in the order bars are pushed within a step.
    fn symbols(&self) -> &[Symbol];

    /// Push at most one bar per symbol onto the bus, all sharing one date that is
    /// never earlier than the previous step's.
    ///
    /// Returns true if at least one symbol produced a bar.
    fn advance(&mut self) -> bool;
}

impl LatestBar for HashMap<Symbol, Bar> {
    fn latest_bar(&self, symbol: &str) -> Option<&Bar> {
        self.get(symbol)
    }
}

impl LatestBar for BTreeMap<Symbol, Bar> {
    fn latest_bar(&self, symbol: &str) -> Option<&Bar> {
        self.get(symbol)
    }
}

impl<T: LatestBar + ?Sized> LatestBar for Box<T> {
    fn latest_bar(&self, symbol: &str) -> Option<&Bar> {
        (**self).latest_bar(symbol)
    }
}

impl<T: DataFeed + ?Sized> DataFeed for Box<T> {
    fn symbols(&self) -> &[Symbol] {
        (**self).symbols()
    }

    fn advance(&mut self) -> bool {
        (**self).advance()
    }
}
