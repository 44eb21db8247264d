//! ValueLab Runner: input loading, run orchestration, metrics, sweeps, export.
//!
//! This crate builds on `valuelab-core` to provide:
//! - TOML run configuration and buy-threshold resolution
//! - CSV/Parquet loading into market and signal views
//! - Single-run orchestration with performance metrics
//! - Parallel parameter sweeps with ranking
//! - JSON/CSV artifacts and a console summary
//! - A seeded synthetic dataset generator

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;
pub mod synthetic;
pub mod threshold;

pub use config::{run_id, BacktestConfig, ConfigError, InputsConfig, OutputConfig, RunId};
pub use data_loader::{load_inputs, LoadError, LoadedInputs};
pub use metrics::PerformanceMetrics;
pub use runner::{
    explicit_threshold, prepare_engine_config, run_backtest, run_backtest_with_cancel,
    run_from_config, BacktestResult, RunError, SCHEMA_VERSION,
};
pub use sweep::{run_sweep, ParamGrid, RankMetric, SweepResults};
pub use synthetic::{generate as generate_synthetic, write_dataset, SynthOptions, SyntheticDataset};
pub use threshold::{resolve_buy_threshold, ThresholdResolution, ThresholdSource};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_metrics_is_send_sync() {
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn loaded_inputs_is_send_sync() {
        assert_send::<LoadedInputs>();
        assert_sync::<LoadedInputs>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<ParamGrid>();
        assert_sync::<ParamGrid>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
