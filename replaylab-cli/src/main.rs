//! ReplayLab CLI — run event-driven backtests.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file or from flags
//! - `init-config`: print (or write) a default TOML config

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use replaylab_core::portfolio::EquityGranularity;
use replaylab_runner::{render_summary, run_backtest, ArtifactManager, BacktestConfig, SizingConfig};

#[derive(Parser)]
#[command(
    name = "replaylab",
    about = "ReplayLab CLI: event-driven backtesting over historical bars"
)]
struct Cli {
    /// Debug-level logging unless RUST_LOG is set.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file or from flags.
    Run {
        /// Path to a TOML config file.
        #[arg(long, conflicts_with_all = ["symbols", "csv_dir", "file_pattern", "start", "end", "capital", "short", "long", "quantity", "commission", "slippage", "per_event"])]
        config: Option<PathBuf>,

        /// Symbols to trade, comma separated (e.g. AAPL,MSFT).
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Directory with one CSV per symbol. Defaults to ./data.
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// File name pattern; {symbol} is substituted. Defaults to {symbol}_1d.csv.
        #[arg(long)]
        file_pattern: Option<String>,

        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        end: Option<String>,

        /// Initial capital. Defaults to 100000.
        #[arg(long)]
        capital: Option<f64>,

        /// Short moving average window. Defaults to 20.
        #[arg(long)]
        short: Option<usize>,

        /// Long moving average window. Defaults to 50.
        #[arg(long)]
        long: Option<usize>,

        /// Shares per entry. Defaults to 100.
        #[arg(long)]
        quantity: Option<u64>,

        /// Commission per share. Defaults to 0.001.
        #[arg(long)]
        commission: Option<f64>,

        /// Slippage fraction, e.g. 0.0005 = 5 bps. Defaults to 0.0005.
        #[arg(long)]
        slippage: Option<f64>,

        /// Record one equity point per Market event instead of per timestamp.
        #[arg(long, default_value_t = false)]
        per_event: bool,

        /// Output directory for equity.csv and result.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip writing artifacts.
        #[arg(long, default_value_t = false)]
        no_export: bool,

        /// Print the full result as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print a default TOML config, or write it to a file.
    InitConfig {
        /// Write to this path instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Flag values for a config-less run.
#[derive(Default)]
struct RunFlags {
    symbols: Vec<String>,
    csv_dir: Option<PathBuf>,
    file_pattern: Option<String>,
    start: Option<String>,
    end: Option<String>,
    capital: Option<f64>,
    short: Option<usize>,
    long: Option<usize>,
    quantity: Option<u64>,
    commission: Option<f64>,
    slippage: Option<f64>,
    per_event: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            symbols,
            csv_dir,
            file_pattern,
            start,
            end,
            capital,
            short,
            long,
            quantity,
            commission,
            slippage,
            per_event,
            output_dir,
            no_export,
            json,
        } => {
            let backtest_config = match config {
                Some(path) => BacktestConfig::from_file(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => build_config_from_flags(RunFlags {
                    symbols,
                    csv_dir,
                    file_pattern,
                    start,
                    end,
                    capital,
                    short,
                    long,
                    quantity,
                    commission,
                    slippage,
                    per_event,
                })?,
            };
            run_backtest_cmd(&backtest_config, output_dir, no_export, json)
        }
        Commands::InitConfig { output, force } => run_init_config(output, force),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_backtest_cmd(
    config: &BacktestConfig,
    output_dir: PathBuf,
    no_export: bool,
    json: bool,
) -> Result<()> {
    let started = Instant::now();
    let result = run_backtest(config)?;
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        run_id = %result.run_id,
        "backtest finished"
    );
    println!(
        "Backtest finished in {:.2} seconds.",
        started.elapsed().as_secs_f64()
    );

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("serializing result")?
        );
    } else {
        print!("{}", render_summary(&result));
    }

    if !no_export {
        let manager = ArtifactManager::new(&output_dir)?;
        let paths = manager.save_run(&result)?;
        println!("Artifacts saved to: {}", paths.run_dir.display());
    }

    Ok(())
}

fn build_config_from_flags(flags: RunFlags) -> Result<BacktestConfig> {
    if flags.symbols.is_empty() {
        bail!("one of --config or --symbols is required");
    }
    let mut config = BacktestConfig::default();

    config.data.symbols = flags.symbols.iter().map(|s| s.trim().to_string()).collect();
    if let Some(dir) = flags.csv_dir {
        config.data.csv_dir = dir;
    }
    if let Some(pattern) = flags.file_pattern {
        config.data.file_pattern = pattern;
    }
    config.data.start_date = flags.start.as_deref().map(parse_date).transpose()?;
    config.data.end_date = flags.end.as_deref().map(parse_date).transpose()?;

    if let Some(capital) = flags.capital {
        config.portfolio.initial_capital = capital;
    }
    if let Some(quantity) = flags.quantity {
        config.sizing = SizingConfig::FixedQuantity { quantity };
    }
    if let Some(short) = flags.short {
        config.strategy.short_window = short;
    }
    if let Some(long) = flags.long {
        config.strategy.long_window = long;
    }
    if let Some(commission) = flags.commission {
        config.execution.commission_per_share = commission;
    }
    if let Some(slippage) = flags.slippage {
        config.execution.slippage_pct = slippage;
    }
    if flags.per_event {
        config.engine.equity_granularity = EquityGranularity::PerEvent;
    }

    // Same rules as a config file.
    config.validate().context("invalid run flags")?;
    Ok(config)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn run_init_config(output: Option<PathBuf>, force: bool) -> Result<()> {
    let text = BacktestConfig::default().to_toml()?;
    match output {
        None => print!("{text}"),
        Some(path) => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            std::fs::write(&path, text)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use replaylab_runner::ConfigError;

    fn flags(symbols: &[&str]) -> RunFlags {
        RunFlags {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            ..RunFlags::default()
        }
    }

    #[test]
    fn flags_override_defaults() {
        let config = build_config_from_flags(RunFlags {
            capital: Some(50_000.0),
            short: Some(5),
            long: Some(10),
            quantity: Some(7),
            start: Some("2024-01-02".into()),
            per_event: true,
            ..flags(&[" AAPL ", "MSFT"])
        })
        .unwrap();

        assert_eq!(config.data.symbols, ["AAPL", "MSFT"]);
        assert_eq!(config.portfolio.initial_capital, 50_000.0);
        assert_eq!(config.strategy.short_window, 5);
        assert_eq!(config.strategy.long_window, 10);
        assert_eq!(config.sizing, SizingConfig::FixedQuantity { quantity: 7 });
        assert_eq!(config.data.start_date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(config.engine.equity_granularity, EquityGranularity::PerEvent);
    }

    #[test]
    fn unusual_symbol_and_path_characters_are_kept_verbatim() {
        let config = build_config_from_flags(RunFlags {
            csv_dir: Some(PathBuf::from("data\\raw \"quotes\"")),
            ..flags(&["BRK.B\u{200b}"])
        })
        .unwrap();
        assert_eq!(config.data.symbols, ["BRK.B\u{200b}"]);
        assert_eq!(config.data.csv_dir, PathBuf::from("data\\raw \"quotes\""));
    }

    #[test]
    fn non_finite_flag_values_are_config_errors() {
        let err = build_config_from_flags(RunFlags {
            capital: Some(f64::NAN),
            ..flags(&["AAPL"])
        })
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Invalid(msg)) if msg.contains("initial_capital")
        ));
    }

    #[test]
    fn symbols_are_required_without_config() {
        assert!(build_config_from_flags(RunFlags::default()).is_err());
    }

    #[test]
    fn bad_date_is_rejected() {
        let err = build_config_from_flags(RunFlags {
            end: Some("2024-13-01".into()),
            ..flags(&["AAPL"])
        })
        .unwrap_err();
        assert!(err.to_string().contains("invalid date"));
    }
}
