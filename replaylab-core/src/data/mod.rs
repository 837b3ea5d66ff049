//! Data pipeline: feed traits, CSV parsing, historical replay.

pub mod csv_source;
pub mod feed;
pub mod historic;

pub use csv_source::{parse_bars_csv, read_bars_csv, FeedError, ParsedBars, RowRejection};
pub use feed::{DataFeed, LatestBar};
pub use historic::{DateRange, FeedWarning, HistoricBarFeed};
