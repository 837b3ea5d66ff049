//! ReplayLab Core — event-driven backtesting engine.
//!
//! This crate contains:
//! - Domain types (bars, the four event kinds, equity points)
//! - A single FIFO event bus shared by every component
//! - Historical CSV replay feeds
//! - Strategy, portfolio and execution handlers
//! - The dispatch loop that drives them

pub mod data;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod portfolio;
pub mod strategy;
