//! Equity curve export (CSV).

use anyhow::{Context, Result};
use std::path::Path;

use replaylab_core::domain::EquityPoint;

/// Header: `timestamp,cash,holdings_value,total_equity`.
pub fn write_equity_csv(path: &Path, equity: &[EquityPoint]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create equity CSV {}", path.display()))?;
    for point in equity {
        writer
            .serialize(point)
            .with_context(|| format!("Failed to write equity row to {}", path.display()))?;
    }
    writer.flush().context("Failed to flush equity CSV")?;
    Ok(())
}

pub fn read_equity_csv(path: &Path) -> Result<Vec<EquityPoint>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open equity CSV {}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<EquityPoint>, _>>()
        .with_context(|| format!("Failed to parse equity CSV {}", path.display()))
}
