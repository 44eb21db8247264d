//! Synthetic dataset generator for smoke tests and demos.
//!
//! Produces a one-factor market: a random-walk index plus tickers whose daily
//! returns load on it with a random beta. Signal probabilities are a noisy
//! logistic of each ticker's forward return, so the strategy has something
//! to find. Everything is seeded, so the same options give the same files.
//!
//! Results on this data are tagged `has_synthetic`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use valuelab_core::data::{IndexRow, PriceRow, SignalRow};
use valuelab_core::engine::EngineConfig;

use crate::config::{BacktestConfig, InputsConfig, OutputConfig};
use crate::data_loader::write_rows_csv;

/// Trading days ahead used to build the signal.
const SIGNAL_HORIZON: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct SynthOptions {
    pub tickers: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub seed: u64,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            tickers: 30,
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDataset {
    pub prices: Vec<PriceRow>,
    pub signals: Vec<SignalRow>,
    pub index: Vec<IndexRow>,
}

/// Files written by [`write_dataset`].
#[derive(Debug, Clone)]
pub struct SyntheticPaths {
    pub prices: PathBuf,
    pub signals: PathBuf,
    pub index: PathBuf,
    pub config: PathBuf,
}

/// Weekdays between `start` and `end`, inclusive.
fn trading_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn generate(opts: &SynthOptions) -> SyntheticDataset {
    // Deterministic seed from the user-facing seed value
    let seed = blake3::hash(format!("valuelab-synth:{}", opts.seed).as_bytes());
    let mut rng = StdRng::from_seed(*seed.as_bytes());

    let dates = trading_days(opts.start, opts.end);
    let n = dates.len();
    let market: Vec<f64> = (0..n).map(|_| rng.gen_range(-0.015..0.0155)).collect();

    let mut level = 1_000.0_f64;
    let index = dates
        .iter()
        .zip(&market)
        .map(|(&date, r)| {
            level *= 1.0 + r;
            IndexRow {
                date,
                close: round2(level),
            }
        })
        .collect();

    let mut prices = Vec::with_capacity(n * opts.tickers);
    let mut signals = Vec::with_capacity(n * opts.tickers);
    for t in 0..opts.tickers {
        let ticker = format!("SYN{t:03}");
        let beta: f64 = rng.gen_range(0.6..1.4);
        let mut price: f64 = rng.gen_range(10.0..120.0);
        let closes: Vec<f64> = market
            .iter()
            .map(|m| {
                price = (price * (1.0 + beta * m + rng.gen_range(-0.02..0.02))).max(0.5);
                round2(price)
            })
            .collect();

        for (i, &date) in dates.iter().enumerate() {
            let ahead = (i + SIGNAL_HORIZON).min(n - 1);
            let forward = closes[ahead] / closes[i] - 1.0;
            let noise: f64 = rng.gen_range(-1.0..1.0);
            let probability = 1.0 / (1.0 + (-(6.0 * forward + noise)).exp());
            prices.push(PriceRow {
                date,
                ticker: ticker.clone(),
                close: closes[i],
            });
            signals.push(SignalRow {
                date,
                ticker: ticker.clone(),
                probability: (probability * 1e4).round() / 1e4,
            });
        }
    }

    SyntheticDataset {
        prices,
        signals,
        index,
    }
}

/// Write the dataset as CSVs plus a ready-to-run `backtest.toml` into `dir`.
///
/// The config scales capital to the synthetic price level and marks the
/// inputs as synthetic.
pub fn write_dataset(dataset: &SyntheticDataset, dir: &Path) -> Result<SyntheticPaths> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let paths = SyntheticPaths {
        prices: dir.join("prices.csv"),
        signals: dir.join("signals.csv"),
        index: dir.join("index.csv"),
        config: dir.join("backtest.toml"),
    };
    write_rows_csv(&paths.prices, &dataset.prices)?;
    write_rows_csv(&paths.signals, &dataset.signals)?;
    write_rows_csv(&paths.index, &dataset.index)?;

    let config = BacktestConfig {
        threshold: None,
        inputs: InputsConfig {
            prices: PathBuf::from("prices.csv"),
            signals: PathBuf::from("signals.csv"),
            index: Some(PathBuf::from("index.csv")),
            threshold_artifact: None,
            synthetic: true,
        },
        strategy: EngineConfig {
            initial_capital: 1_000_000.0,
            allocation_per_stock: 100_000.0,
            ..EngineConfig::default()
        },
        output: OutputConfig {
            dir: PathBuf::from("results"),
        },
    };
    let toml = config
        .to_toml_string()
        .context("failed to serialize synthetic config")?;
    std::fs::write(&paths.config, toml)
        .with_context(|| format!("failed to write {}", paths.config.display()))?;

    info!(
        dir = %dir.display(),
        prices = dataset.prices.len(),
        signals = dataset.signals.len(),
        "synthetic dataset written"
    );
    Ok(paths)
}
