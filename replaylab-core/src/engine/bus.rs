//! Event bus — the single FIFO queue shared by every component.
//!
//! Producers hold an [`EventSender`] handed to them at construction; the dispatch
//! loop owns the [`EventBus`] and pops from the head. All senders feed the same
//! channel, so dispatch order is exactly enqueue order across every producer.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::domain::Event;
use crate::engine::error::EngineError;

/// Owning end of the queue. Lives inside the engine.
#[derive(Debug)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// New producer handle onto this bus.
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Pop the head event, or `None` when the queue is empty.
    pub fn pop(&self) -> Option<Event> {
        // The bus keeps its own sender alive, so the channel never disconnects
        // while we can still be asked to pop.
        self.rx.try_recv().ok()
    }

    /// Pop everything currently queued, in order.
    pub fn drain_pending(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer handle: append an event to the tail of the bus.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<Event>,
}

impl EventSender {
    pub fn send(&self, event: impl Into<Event>) -> Result<(), EngineError> {
        let event = event.into();
        let kind = event.kind();
        self.tx.send(event).map_err(|_| EngineError::BusClosed(kind))
    }
}
