//! ValueLab CLI: run, sweep, and synthetic-data commands.
//!
//! Commands:
//! - `run` executes one backtest from a TOML config and saves its artifacts
//! - `sweep` runs a parameter grid against the same inputs and ranks the results
//! - `synth` writes a seeded synthetic dataset plus a ready-to-run config

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use valuelab_runner::export::{export_sweep_csv, format_ratio, format_summary, save_artifacts};
use valuelab_runner::{
    generate_synthetic, load_inputs, prepare_engine_config, run_from_config, run_sweep,
    write_dataset, BacktestConfig, ParamGrid, RankMetric, SynthOptions,
};

#[derive(Parser)]
#[command(
    name = "valuelab",
    about = "ValueLab CLI: signal-driven portfolio backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Buy threshold; overrides the config and any threshold artifact.
        #[arg(long)]
        threshold: Option<f64>,

        /// Output directory for artifacts. Defaults to the config's `[output].dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the summary without writing artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Run a parameter grid and rank the results.
    Sweep {
        /// Path to a TOML config file providing inputs and base parameters.
        #[arg(long)]
        config: PathBuf,

        /// Buy thresholds to try (comma separated).
        #[arg(long, value_delimiter = ',')]
        thresholds: Vec<f64>,

        /// Per-stock allocations to try.
        #[arg(long, value_delimiter = ',')]
        allocations: Vec<f64>,

        /// Trailing-stop percents to try.
        #[arg(long, value_delimiter = ',')]
        trail_stops: Vec<f64>,

        /// Minimum profits that arm the trailing stop.
        #[arg(long, value_delimiter = ',')]
        min_profits: Vec<f64>,

        /// Position caps to try.
        #[arg(long, value_delimiter = ',')]
        max_positions: Vec<usize>,

        /// Ranking metric: total_return, sharpe, max_drawdown, win_rate, profit_factor.
        #[arg(long, default_value = "sharpe")]
        rank_by: RankMetric,

        /// Number of ranked results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Run configurations one after another instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Directory for `sweep.csv`. Defaults to the config's `[output].dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write a synthetic dataset and matching config.
    Synth {
        /// Destination directory.
        #[arg(long)]
        out: PathBuf,

        /// Number of tickers.
        #[arg(long, default_value_t = 30)]
        tickers: usize,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2018-01-01")]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long, default_value = "2023-12-31")]
        end: String,

        /// Random seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            threshold,
            output_dir,
            no_save,
        } => run_cmd(config, threshold, output_dir, no_save),
        Commands::Sweep {
            config,
            thresholds,
            allocations,
            trail_stops,
            min_profits,
            max_positions,
            rank_by,
            top,
            sequential,
            output_dir,
        } => {
            let grid = ParamGrid {
                buy_thresholds: thresholds,
                allocations,
                trail_stop_percents: trail_stops,
                min_profits_for_trail: min_profits,
                max_positions,
            };
            sweep_cmd(config, grid, rank_by, top, !sequential, output_dir)
        }
        Commands::Synth {
            out,
            tickers,
            start,
            end,
            seed,
        } => synth_cmd(out, tickers, &start, &end, seed),
    }
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    BacktestConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

fn run_cmd(
    config_path: PathBuf,
    threshold: Option<f64>,
    output_dir: Option<PathBuf>,
    no_save: bool,
) -> Result<()> {
    let config = load_config(&config_path)?;
    let result = run_from_config(&config, threshold)?;

    print!("{}", format_summary(&result));

    if !no_save {
        let dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
        let run_dir = save_artifacts(&result, &dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    Ok(())
}

fn sweep_cmd(
    config_path: PathBuf,
    grid: ParamGrid,
    rank_by: RankMetric,
    top: usize,
    parallel: bool,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(&config_path)?;
    let inputs = load_inputs(&config.inputs)?;
    let (base, base_threshold) = prepare_engine_config(&config, None);

    let sweep = run_sweep(&grid, &base, base_threshold, &inputs, parallel)?;
    if sweep.is_empty() {
        bail!("sweep produced no results");
    }

    println!("=== Sweep: {} runs, ranked by {rank_by} ===", sweep.len());
    println!(
        "{:>4} {:>9} {:>12} {:>7} {:>7} {:>5} {:>9} {:>7} {:>8} {:>6}",
        "Rank", "Threshold", "Allocation", "Trail", "MinPft", "MaxP", "Return", "Sharpe", "MaxDD",
        "PF"
    );
    println!("{}", "-".repeat(84));
    for (rank, r) in sweep.ranked_by(rank_by).into_iter().take(top).enumerate() {
        let c = &r.config;
        let m = &r.metrics;
        println!(
            "{:>4} {:>9.4} {:>12.0} {:>7.3} {:>7.3} {:>5} {:>8.2}% {:>7.2} {:>7.2}% {:>6}",
            rank + 1,
            c.buy_threshold,
            c.allocation_per_stock,
            c.trail_stop_percent,
            c.min_profit_for_trail,
            c.max_positions,
            m.total_return * 100.0,
            m.sharpe,
            m.max_drawdown * 100.0,
            format_ratio(m.profit_factor),
        );
    }

    let dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join("sweep.csv");
    std::fs::write(&path, export_sweep_csv(&sweep, rank_by)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Sweep table saved to: {}", path.display());

    Ok(())
}

fn synth_cmd(out: PathBuf, tickers: usize, start: &str, end: &str, seed: u64) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid start date '{start}'"))?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
        .with_context(|| format!("invalid end date '{end}'"))?;
    if end <= start {
        bail!("end date {end} must be after start date {start}");
    }
    if tickers == 0 {
        bail!("--tickers must be at least 1");
    }

    let dataset = generate_synthetic(&SynthOptions {
        tickers,
        start,
        end,
        seed,
    });
    let paths = write_dataset(&dataset, &out)?;

    println!(
        "Wrote {} price rows and {} signal rows for {tickers} tickers",
        dataset.prices.len(),
        dataset.signals.len()
    );
    println!("Config: {}", paths.config.display());
    println!(
        "Run it with: valuelab run --config {}",
        paths.config.display()
    );

    Ok(())
}
