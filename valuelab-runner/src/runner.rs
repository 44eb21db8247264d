//! Backtest runner: wires together inputs, engine, and metrics.
//!
//! Entry points:
//! - `run_from_config()`: loads inputs from a `BacktestConfig`, then runs. Used by the CLI.
//! - `run_backtest()`: takes pre-loaded inputs. Used by sweeps to avoid re-reading files.
//! - `run_backtest_with_cancel()`: same, with a cooperative cancel flag.

use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use valuelab_core::domain::{Snapshot, TradeRecord};
use valuelab_core::engine::{EngineConfig, RunDiagnostics, Simulation, SimulationError};

use crate::config::{run_id, BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_inputs, LoadError, LoadedInputs};
use crate::metrics::{benchmark_curve, drawdown_series, PerformanceMetrics};
use crate::threshold::{resolve_buy_threshold, ThresholdResolution, ThresholdSource};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// Engine parameters as run, with the resolved threshold applied.
    pub config: EngineConfig,
    pub threshold: ThresholdResolution,
    pub metrics: PerformanceMetrics,
    pub snapshots: Vec<Snapshot>,
    pub trades: Vec<TradeRecord>,
    /// `value / running_max - 1` per snapshot.
    pub drawdown: Vec<f64>,
    /// Index rescaled to initial capital, per snapshot; `None` where missing.
    pub benchmark: Vec<Option<f64>>,
    /// Positions still open after the last period.
    pub open_positions: usize,
    pub diagnostics: RunDiagnostics,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load inputs named by `config` and run one backtest.
///
/// `threshold_override` (e.g. from the command line) wins over the config's
/// own explicit threshold.
pub fn run_from_config(
    config: &BacktestConfig,
    threshold_override: Option<f64>,
) -> Result<BacktestResult, RunError> {
    let inputs = load_inputs(&config.inputs)?;
    let (engine, threshold) = prepare_engine_config(config, threshold_override);
    run_backtest(engine, threshold, &inputs)
}

/// Resolve the buy threshold and apply it to the strategy parameters.
pub fn prepare_engine_config(
    config: &BacktestConfig,
    threshold_override: Option<f64>,
) -> (EngineConfig, ThresholdResolution) {
    let threshold = resolve_buy_threshold(
        threshold_override.or(config.threshold),
        config.inputs.threshold_artifact.as_deref(),
        config.strategy.buy_threshold,
    );
    let mut engine = config.strategy.clone();
    engine.buy_threshold = threshold.value;
    (engine, threshold)
}

/// Run a backtest with pre-loaded inputs (no I/O).
pub fn run_backtest(
    config: EngineConfig,
    threshold: ThresholdResolution,
    inputs: &LoadedInputs,
) -> Result<BacktestResult, RunError> {
    run_backtest_with_cancel(config, threshold, inputs, None)
}

/// Run a backtest, checking `cancel` before every period.
///
/// A cancelled run yields `RunError::Simulation(Aborted)` and no result.
pub fn run_backtest_with_cancel(
    mut config: EngineConfig,
    threshold: ThresholdResolution,
    inputs: &LoadedInputs,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestResult, RunError> {
    config.buy_threshold = threshold.value;
    let id = run_id(&config);
    let short_id = &id[..12];
    info!(run_id = %short_id, threshold = threshold.value, source = ?threshold.source, "running backtest");

    let result =
        Simulation::new(config.clone(), &inputs.market, &inputs.signals)?.run_with_cancel(cancel)?;

    let metrics = PerformanceMetrics::compute(
        &result.snapshots,
        &result.trades,
        config.initial_capital,
        config.granularity.periods_per_year(),
    );
    let values: Vec<f64> = result.snapshots.iter().map(|s| s.portfolio_value).collect();
    let drawdown = drawdown_series(&values);
    let benchmark = match inputs.market.index() {
        Some(index) => benchmark_curve(&result.snapshots, index, config.initial_capital),
        None => vec![None; result.snapshots.len()],
    };

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: id,
        dataset_hash: inputs.dataset_hash.clone(),
        has_synthetic: inputs.has_synthetic,
        config,
        threshold,
        metrics,
        snapshots: result.snapshots,
        trades: result.trades,
        drawdown,
        benchmark,
        open_positions: result.open_positions,
        diagnostics: result.diagnostics,
    })
}

/// Threshold resolution for a value chosen by the caller.
pub fn explicit_threshold(value: f64) -> ThresholdResolution {
    ThresholdResolution {
        value,
        source: ThresholdSource::Explicit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputsConfig;
    use std::path::PathBuf;

    fn config(threshold: Option<f64>) -> BacktestConfig {
        BacktestConfig {
            threshold,
            inputs: InputsConfig {
                prices: PathBuf::from("p.csv"),
                signals: PathBuf::from("s.csv"),
                index: None,
                threshold_artifact: None,
                synthetic: false,
            },
            strategy: EngineConfig::default(),
            output: Default::default(),
        }
    }

    #[test]
    fn override_beats_config_threshold() {
        let (engine, t) = prepare_engine_config(&config(Some(0.6)), Some(0.7));
        assert_eq!(engine.buy_threshold, 0.7);
        assert_eq!(t.source, ThresholdSource::Explicit);
    }

    #[test]
    fn config_threshold_is_explicit() {
        let (engine, t) = prepare_engine_config(&config(Some(0.6)), None);
        assert_eq!(engine.buy_threshold, 0.6);
        assert_eq!(t.source, ThresholdSource::Explicit);
    }

    #[test]
    fn strategy_value_is_the_default() {
        let (engine, t) = prepare_engine_config(&config(None), None);
        assert_eq!(engine.buy_threshold, 0.5399);
        assert_eq!(t.source, ThresholdSource::Default);
    }
}
