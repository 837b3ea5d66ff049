//! Dual moving average crossover — golden cross opens, death cross exits.
//!
//! Fires LONG when the short SMA crosses above the long SMA.
//! Fires EXIT when the short SMA crosses below the long SMA.
//! A per-symbol debouncer suppresses a signal identical to the last one emitted.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::Strategy;
use crate::domain::{MarketEvent, SignalDirection, SignalEvent, Symbol};
use crate::engine::bus::EventSender;
use crate::engine::error::EngineError;

#[derive(Debug, Clone, Default)]
struct SymbolState {
    /// Most recent closes, oldest first, at most `long_window` long.
    closes: VecDeque<f64>,
    /// (short, long) SMA pair computed on the previous bar, if that bar had a full window.
    prev: Option<(f64, f64)>,
    /// Last direction emitted; `None` until the first signal.
    last_signal: Option<SignalDirection>,
}

/// Simple mean of the last `window` values.
fn trailing_mean(values: &VecDeque<f64>, window: usize) -> f64 {
    values.iter().rev().take(window).sum::<f64>() / window as f64
}

/// Dual SMA crossover signal generator.
#[derive(Debug)]
pub struct DualMaCrossover {
    short_window: usize,
    long_window: usize,
    state: HashMap<Symbol, SymbolState>,
    sender: EventSender,
}

impl DualMaCrossover {
    /// Every symbol the strategy will see must be listed up front.
    pub fn new(
        symbols: &[Symbol],
        short_window: usize,
        long_window: usize,
        sender: EventSender,
    ) -> Result<Self, EngineError> {
        if short_window == 0 {
            return Err(EngineError::InvalidParameters(
                "short_window must be >= 1".into(),
            ));
        }
        if long_window <= short_window {
            return Err(EngineError::InvalidParameters(format!(
                "long_window ({long_window}) must be greater than short_window ({short_window})"
            )));
        }

        let state = symbols
            .iter()
            .map(|s| {
                let st = SymbolState {
                    closes: VecDeque::with_capacity(long_window),
                    ..SymbolState::default()
                };
                (s.clone(), st)
            })
            .collect();

        Ok(Self {
            short_window,
            long_window,
            state,
            sender,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }

    /// Last direction emitted for `symbol`.
    pub fn last_signal(&self, symbol: &str) -> Option<SignalDirection> {
        self.state.get(symbol).and_then(|s| s.last_signal)
    }

    /// Number of closes currently retained for `symbol`.
    pub fn history_len(&self, symbol: &str) -> Option<usize> {
        self.state.get(symbol).map(|s| s.closes.len())
    }
}

impl Strategy for DualMaCrossover {
    fn name(&self) -> &str {
        "dual_ma_crossover"
    }

    fn calculate_signals(&mut self, event: &MarketEvent) -> Result<(), EngineError> {
        let state = self
            .state
            .get_mut(&event.symbol)
            .ok_or_else(|| EngineError::unknown_symbol(&event.symbol))?;

        state.closes.push_back(event.bar.close);
        while state.closes.len() > self.long_window {
            state.closes.pop_front();
        }
        if state.closes.len() < self.long_window {
            return Ok(());
        }

        let short_ma = trailing_mean(&state.closes, self.short_window);
        let long_ma = trailing_mean(&state.closes, self.long_window);
        let prev = state.prev.replace((short_ma, long_ma));

        let candidate = match prev {
            Some((prev_short, prev_long)) if short_ma > long_ma && prev_short <= prev_long => {
                Some(SignalDirection::Long)
            }
            Some((prev_short, prev_long)) if short_ma < long_ma && prev_short >= prev_long => {
                Some(SignalDirection::Exit)
            }
            _ => None,
        };

        let Some(direction) = candidate else {
            return Ok(());
        };
        if state.last_signal == Some(direction) {
            return Ok(());
        }

        debug!(
            symbol = %event.symbol,
            date = %event.timestamp,
            %direction,
            short_ma,
            long_ma,
            "crossover signal"
        );
        state.last_signal = Some(direction);
        self.sender
            .send(SignalEvent::new(event.timestamp, event.symbol.clone(), direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, Event};
    use crate::engine::bus::EventBus;
    use chrono::NaiveDate;

    fn market(symbol: &str, day_offset: i64, close: f64) -> MarketEvent {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(day_offset);
        MarketEvent::new(symbol, Bar::new(date, close, close, close, close, 1000))
    }

    fn signals(bus: &EventBus) -> Vec<SignalDirection> {
        bus.drain_pending()
            .into_iter()
            .filter_map(|e| match e {
                Event::Signal(s) => Some(s.direction),
                _ => None,
            })
            .collect()
    }

    fn feed(strategy: &mut DualMaCrossover, symbol: &str, closes: &[f64]) {
        for (i, &c) in closes.iter().enumerate() {
            strategy.calculate_signals(&market(symbol, i as i64, c)).unwrap();
        }
    }

    fn make(short: usize, long: usize, bus: &EventBus) -> DualMaCrossover {
        DualMaCrossover::new(&["X".to_string()], short, long, bus.sender()).unwrap()
    }

    #[test]
    fn rejects_bad_windows() {
        let bus = EventBus::new();
        assert!(DualMaCrossover::new(&[], 0, 2, bus.sender()).is_err());
        assert!(DualMaCrossover::new(&[], 3, 3, bus.sender()).is_err());
        assert!(DualMaCrossover::new(&[], 5, 2, bus.sender()).is_err());
    }

    #[test]
    fn no_signal_during_warmup() {
        let bus = EventBus::new();
        let mut s = make(2, 4, &bus);
        feed(&mut s, "X", &[1.0, 2.0, 3.0]);
        assert!(signals(&bus).is_empty());
        assert_eq!(s.history_len("X"), Some(3));
    }

    #[test]
    fn first_full_window_never_signals() {
        // The first full window has no prior pair to compare against.
        let bus = EventBus::new();
        let mut s = make(1, 2, &bus);
        feed(&mut s, "X", &[1.0, 5.0]);
        assert!(signals(&bus).is_empty());
    }

    #[test]
    fn upward_cross_emits_long() {
        // closes 10, 9, 11 with windows 1/2:
        // bar 2: short 9  <  long 9.5
        // bar 3: short 11 >  long 10  → golden cross
        let bus = EventBus::new();
        let mut s = make(1, 2, &bus);
        feed(&mut s, "X", &[10.0, 9.0, 11.0]);
        assert_eq!(signals(&bus), [SignalDirection::Long]);
        assert_eq!(s.last_signal("X"), Some(SignalDirection::Long));
    }

    #[test]
    fn downward_cross_emits_exit() {
        let bus = EventBus::new();
        let mut s = make(1, 2, &bus);
        feed(&mut s, "X", &[10.0, 11.0, 9.0]);
        assert_eq!(signals(&bus), [SignalDirection::Exit]);
    }

    #[test]
    fn repeated_cross_in_same_direction_is_debounced() {
        // up-cross, back to equal, up-cross again: the second LONG is suppressed.
        let bus = EventBus::new();
        let mut s = make(1, 2, &bus);
        feed(&mut s, "X", &[10.0, 9.0, 11.0, 11.0, 12.0]);
        // bar 4: short 11 == long 11 (no cross); bar 5: 12 > 11.5 and prev 11 <= 11 → LONG again
        assert_eq!(signals(&bus), [SignalDirection::Long]);
    }

    #[test]
    fn alternating_crosses_alternate_signals() {
        let bus = EventBus::new();
        let mut s = make(1, 2, &bus);
        feed(&mut s, "X", &[10.0, 9.0, 11.0, 8.0, 12.0]);
        assert_eq!(
            signals(&bus),
            [SignalDirection::Long, SignalDirection::Exit, SignalDirection::Long]
        );
    }

    #[test]
    fn history_is_capped_at_long_window() {
        let bus = EventBus::new();
        let mut s = make(2, 3, &bus);
        feed(&mut s, "X", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(s.history_len("X"), Some(3));
    }

    #[test]
    fn symbols_are_tracked_independently() {
        let bus = EventBus::new();
        let mut s =
            DualMaCrossover::new(&["A".to_string(), "B".to_string()], 1, 2, bus.sender()).unwrap();
        for (i, (a, b)) in [(10.0, 10.0), (9.0, 11.0), (11.0, 9.0)].into_iter().enumerate() {
            s.calculate_signals(&market("A", i as i64, a)).unwrap();
            s.calculate_signals(&market("B", i as i64, b)).unwrap();
        }
        assert_eq!(s.last_signal("A"), Some(SignalDirection::Long));
        assert_eq!(s.last_signal("B"), Some(SignalDirection::Exit));
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let bus = EventBus::new();
        let mut s = make(1, 2, &bus);
        let err = s.calculate_signals(&market("NOPE", 0, 1.0)).unwrap_err();
        assert!(matches!(err, EngineError::UnknownSymbol { .. }));
    }
}
