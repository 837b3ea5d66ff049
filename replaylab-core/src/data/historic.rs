//! Historical bar feed — replays pre-loaded bars one step at a time.
//!
//! Missing or unreadable symbol data degrades the universe instead of failing the
//! run: the symbol is dropped and a [`FeedWarning::MissingDataSource`] is recorded.
//! Exhausted symbols simply stop producing bars while the rest continue.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::csv_source::read_bars_csv;
use crate::data::feed::{DataFeed, LatestBar};
use crate::domain::{Bar, MarketEvent, Symbol};
use crate::engine::bus::EventSender;

/// Placeholder substituted with the symbol in file name patterns.
pub const SYMBOL_PLACEHOLDER: &str = "{symbol}";

/// Inclusive date filter applied when bars are loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// No filtering.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Non-fatal data problems reported while building the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedWarning {
    #[error("no data for '{symbol}' ({reason}); symbol removed from universe")]
    MissingDataSource { symbol: Symbol, reason: String },

    #[error("'{symbol}': skipped malformed row at line {line}: {reason}")]
    MalformedRow {
        symbol: Symbol,
        line: u64,
        reason: String,
    },

    #[error("'{symbol}': duplicate date {date}, keeping the first row")]
    DuplicateDate { symbol: Symbol, date: NaiveDate },
}

#[derive(Debug, Clone)]
struct SeriesCursor {
    bars: Vec<Bar>,
    next: usize,
}

impl SeriesCursor {
    fn remaining(&self) -> usize {
        self.bars.len() - self.next
    }
}

/// Replays per-symbol bar series onto the event bus.
#[derive(Debug)]
pub struct HistoricBarFeed {
    symbols: Vec<Symbol>,
    series: HashMap<Symbol, SeriesCursor>,
    latest: HashMap<Symbol, Bar>,
    warnings: Vec<FeedWarning>,
    sender: EventSender,
}

impl HistoricBarFeed {
    /// Build a feed from in-memory bars.
    ///
    /// Symbols in `symbols` without an entry in `bars` are removed with a warning.
    pub fn from_bars(
        symbols: &[Symbol],
        mut bars: HashMap<Symbol, Vec<Bar>>,
        range: DateRange,
        sender: EventSender,
    ) -> Self {
        let loaded = unique(symbols)
            .into_iter()
            .map(|symbol| {
                let data = bars
                    .remove(&symbol)
                    .ok_or_else(|| "no bars supplied".to_string());
                (symbol, data)
            })
            .collect();
        Self::build(loaded, range, Vec::new(), sender)
    }

    /// Build a feed from one CSV file per symbol under `dir`.
    ///
    /// `file_pattern` names the file, with `{symbol}` replaced by the symbol
    /// (e.g. `"{symbol}_1d.csv"`).
    pub fn from_csv_dir(
        dir: &Path,
        file_pattern: &str,
        symbols: &[Symbol],
        range: DateRange,
        sender: EventSender,
    ) -> Self {
        let mut warnings = Vec::new();
        let loaded = unique(symbols)
            .into_iter()
            .map(|symbol| {
                let path = dir.join(file_pattern.replace(SYMBOL_PLACEHOLDER, &symbol));
                let data = match read_bars_csv(&path) {
                    Ok(parsed) => {
                        for rejection in parsed.rejected {
                            let warning = FeedWarning::MalformedRow {
                                symbol: symbol.clone(),
                                line: rejection.line,
                                reason: rejection.reason,
                            };
                            warn!(%warning, "skipping row");
                            warnings.push(warning);
                        }
                        debug!(symbol = %symbol, path = %path.display(), bars = parsed.bars.len(), "loaded csv");
                        Ok(parsed.bars)
                    }
                    Err(err) => Err(err.to_string()),
                };
                (symbol, data)
            })
            .collect();
        Self::build(loaded, range, warnings, sender)
    }

    fn build(
        loaded: Vec<(Symbol, Result<Vec<Bar>, String>)>,
        range: DateRange,
        mut warnings: Vec<FeedWarning>,
        sender: EventSender,
    ) -> Self {
        let mut symbols = Vec::with_capacity(loaded.len());
        let mut series = HashMap::with_capacity(loaded.len());

        for (symbol, data) in loaded {
            match data {
                Ok(bars) => {
                    let bars = prepare_series(&symbol, bars, range, &mut warnings);
                    series.insert(symbol.clone(), SeriesCursor { bars, next: 0 });
                    symbols.push(symbol);
                }
                Err(reason) => {
                    let warning = FeedWarning::MissingDataSource { symbol, reason };
                    warn!(%warning, "degrading universe");
                    warnings.push(warning);
                }
            }
        }

        Self {
            symbols,
            series,
            latest: HashMap::new(),
            warnings,
            sender,
        }
    }

    /// Warnings collected while loading, in the order they occurred.
    pub fn warnings(&self) -> &[FeedWarning] {
        &self.warnings
    }

    /// Bars not yet pushed for `symbol`.
    pub fn remaining(&self, symbol: &str) -> Option<usize> {
        self.series.get(symbol).map(SeriesCursor::remaining)
    }

    /// True once every symbol's series has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.series.values().all(|s| s.remaining() == 0)
    }
}

impl LatestBar for HistoricBarFeed {
    fn latest_bar(&self, symbol: &str) -> Option<&Bar> {
        self.latest.get(symbol)
    }
}

impl DataFeed for HistoricBarFeed {
    fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    fn advance(&mut self) -> bool {
        // Only symbols whose next bar carries the earliest pending date move, so every
        // Market event of one step shares a timestamp even when calendars differ.
        let Some(step_date) = self
            .series
            .values()
            .filter_map(|c| c.bars.get(c.next).map(|b| b.date))
            .min()
        else {
            return false;
        };

        let mut advanced = false;
        for symbol in &self.symbols {
            let Some(cursor) = self.series.get_mut(symbol) else {
                continue;
            };
            let Some(bar) = cursor.bars.get(cursor.next).filter(|b| b.date == step_date).cloned()
            else {
                continue;
            };
            cursor.next += 1;

            self.latest.insert(symbol.clone(), bar.clone());
            if let Err(err) = self.sender.send(MarketEvent::new(symbol.clone(), bar)) {
                warn!(error = %err, "event bus closed; feed stops");
                return false;
            }
            advanced = true;
        }
        advanced
    }
}

/// Filter to `range`, sort chronologically, drop duplicate dates (first wins).
fn prepare_series(
    symbol: &str,
    bars: Vec<Bar>,
    range: DateRange,
    warnings: &mut Vec<FeedWarning>,
) -> Vec<Bar> {
    let mut bars: Vec<Bar> = bars.into_iter().filter(|b| range.contains(b.date)).collect();
    // Stable sort keeps file order among equal dates, so "first" means first in the source.
    bars.sort_by_key(|b| b.date);

    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        if out.last().is_some_and(|prev| prev.date == bar.date) {
            let warning = FeedWarning::DuplicateDate {
                symbol: symbol.to_string(),
                date: bar.date,
            };
            warn!(%warning, "dropping row");
            warnings.push(warning);
            continue;
        }
        out.push(bar);
    }
    out
}

fn unique(symbols: &[Symbol]) -> Vec<Symbol> {
    let mut out: Vec<Symbol> = Vec::with_capacity(symbols.len());
    for s in symbols {
        if !out.contains(s) {
            out.push(s.clone());
        }
    }
    out
}
