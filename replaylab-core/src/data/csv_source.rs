//! CSV bar parsing.
//!
//! ## Column contract (case-insensitive, order-independent)
//!
//! | Column      | Example      | Notes                                   |
//! |-------------|--------------|-----------------------------------------|
//! | `Date`      | `2024-01-02` | `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`   |
//! | `Open`      | `182.34`     |                                         |
//! | `High`      | `185.00`     |                                         |
//! | `Low`       | `181.00`     |                                         |
//! | `Close`     | `184.50`     |                                         |
//! | `Volume`    | `1000000`    | integer, or a float that is rounded     |
//! | `Adj Close` | `184.10`     | optional, defaults to `Close`           |
//!
//! Spaces, underscores and dashes in header names are ignored, so `Adj Close`,
//! `Adj_Close` and `adj-close` all resolve to the same column.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use thiserror::Error;

use crate::domain::Bar;

/// Errors that make a whole file unusable.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("data file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
}

/// A row that could not be turned into a bar.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRejection {
    /// 1-based line number in the source (header is line 1).
    pub line: u64,
    pub reason: String,
}

/// Bars in file order plus the rows that were skipped.
#[derive(Debug, Clone, Default)]
pub struct ParsedBars {
    pub bars: Vec<Bar>,
    pub rejected: Vec<RowRejection>,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    adj_close: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, FeedError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&normalize_header(h).as_str()))
        };
        let require = |names: &[&str], column: &'static str| {
            find(names).ok_or(FeedError::MissingColumn(column))
        };
        Ok(Self {
            date: require(&["date", "timestamp"], "Date")?,
            open: require(&["open"], "Open")?,
            high: require(&["high"], "High")?,
            low: require(&["low"], "Low")?,
            close: require(&["close"], "Close")?,
            volume: require(&["volume"], "Volume")?,
            adj_close: find(&["adjclose", "adjustedclose"]),
        })
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Read a bar file from disk.
pub fn read_bars_csv(path: &Path) -> Result<ParsedBars, FeedError> {
    let file = std::fs::File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            FeedError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            FeedError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    parse_bars_csv(file)
}

/// Parse bars from any CSV reader. Malformed rows are collected, not fatal.
pub fn parse_bars_csv<R: Read>(reader: R) -> Result<ParsedBars, FeedError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns = Columns::from_headers(rdr.headers()?)?;

    let mut parsed = ParsedBars::default();
    for (idx, record) in rdr.records().enumerate() {
        let fallback_line = idx as u64 + 2;
        match record {
            Ok(record) => {
                let line = record.position().map_or(fallback_line, |p| p.line());
                match parse_row(&record, &columns) {
                    Ok(bar) => parsed.bars.push(bar),
                    Err(reason) => parsed.rejected.push(RowRejection { line, reason }),
                }
            }
            Err(err) => parsed.rejected.push(RowRejection {
                line: fallback_line,
                reason: err.to_string(),
            }),
        }
    }
    Ok(parsed)
}

fn parse_row(record: &StringRecord, cols: &Columns) -> Result<Bar, String> {
    let field = |idx: usize, name: &str| {
        record
            .get(idx)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing {name}"))
    };
    let price = |idx: usize, name: &str| -> Result<f64, String> {
        let raw = field(idx, name)?;
        raw.parse::<f64>()
            .map_err(|_| format!("cannot parse {name} from '{raw}'"))
    };

    let date = parse_date(field(cols.date, "Date")?)?;
    let open = price(cols.open, "Open")?;
    let high = price(cols.high, "High")?;
    let low = price(cols.low, "Low")?;
    let close = price(cols.close, "Close")?;
    let volume = parse_volume(field(cols.volume, "Volume")?)?;
    let adj_close = match cols.adj_close {
        Some(idx) if record.get(idx).is_some_and(|s| !s.is_empty()) => price(idx, "Adj Close")?,
        _ => close,
    };

    let bar = Bar {
        date,
        open,
        high,
        low,
        close,
        volume,
        adj_close,
    };
    if bar.is_void() {
        return Err("non-finite price".into());
    }
    if !bar.is_sane() {
        return Err(format!(
            "inconsistent OHLC (open {open}, high {high}, low {low}, close {close})"
        ));
    }
    Ok(bar)
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .map_err(|_| format!("cannot parse Date from '{raw}'"))
}

fn parse_volume(raw: &str) -> Result<u64, String> {
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v.round() as u64),
        _ => Err(format!("cannot parse Volume from '{raw}'")),
    }
}
