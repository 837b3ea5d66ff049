//! Writes run artifacts to disk.
//!
//! Layout: `<output_dir>/<run_id>/{equity.csv, result.json}`.

mod equity;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::result::BacktestResult;

pub use equity::{read_equity_csv, write_equity_csv};

/// Where `save_run` put each file.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub equity_csv: PathBuf,
    pub result_json: PathBuf,
}

/// Owns the output root; one subdirectory per run id.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .context("creating artifact output directory")?;
        Ok(Self { output_dir })
    }

    /// Write `equity.csv` and `result.json` under `<output_dir>/<run_id>/`.
    pub fn save_run(&self, result: &BacktestResult) -> Result<ArtifactPaths> {
        let run_dir = self.output_dir.join(&result.run_id);
        std::fs::create_dir_all(&run_dir).context("creating run directory")?;

        let equity_csv = run_dir.join("equity.csv");
        write_equity_csv(&equity_csv, &result.equity_curve)?;

        let result_json = run_dir.join("result.json");
        let json = result.to_json().context("serializing backtest result")?;
        std::fs::write(&result_json, json)
            .with_context(|| format!("writing {}", result_json.display()))?;

        Ok(ArtifactPaths {
            run_dir,
            equity_csv,
            result_json,
        })
    }
}
