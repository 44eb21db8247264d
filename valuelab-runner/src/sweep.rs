//! Parameter sweeps: independent runs over a grid, executed in parallel.
//!
//! Every run owns its own ledger and only reads the shared inputs, so the
//! grid is fanned out with rayon and needs no synchronization.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use valuelab_core::engine::EngineConfig;

use crate::data_loader::LoadedInputs;
use crate::runner::{run_backtest, BacktestResult, RunError};
use crate::threshold::{ThresholdResolution, ThresholdSource};

/// Parameter grid.
///
/// An empty axis keeps the base config's value for that parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub buy_thresholds: Vec<f64>,
    pub allocations: Vec<f64>,
    pub trail_stop_percents: Vec<f64>,
    pub min_profits_for_trail: Vec<f64>,
    pub max_positions: Vec<usize>,
}

fn axis<T: Copy>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

impl ParamGrid {
    /// Total number of configurations in this grid.
    pub fn size(&self) -> usize {
        [
            self.buy_thresholds.len(),
            self.allocations.len(),
            self.trail_stop_percents.len(),
            self.min_profits_for_trail.len(),
            self.max_positions.len(),
        ]
        .iter()
        .map(|&n| n.max(1))
        .product()
    }

    /// All configurations in grid order (thresholds vary slowest).
    pub fn generate_configs(&self, base: &EngineConfig) -> Vec<EngineConfig> {
        let mut configs = Vec::with_capacity(self.size());

        for &threshold in &axis(&self.buy_thresholds, base.buy_threshold) {
            for &allocation in &axis(&self.allocations, base.allocation_per_stock) {
                for &trail in &axis(&self.trail_stop_percents, base.trail_stop_percent) {
                    for &min_profit in &axis(&self.min_profits_for_trail, base.min_profit_for_trail) {
                        for &max_positions in &axis(&self.max_positions, base.max_positions) {
                            configs.push(EngineConfig {
                                buy_threshold: threshold,
                                allocation_per_stock: allocation,
                                trail_stop_percent: trail,
                                min_profit_for_trail: min_profit,
                                max_positions,
                                ..base.clone()
                            });
                        }
                    }
                }
            }
        }

        configs
    }
}

/// Metric used to rank sweep results. Higher ranks first for every metric;
/// max drawdown is non-positive, so shallower drawdowns rank higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    TotalReturn,
    Sharpe,
    MaxDrawdown,
    WinRate,
    ProfitFactor,
}

impl RankMetric {
    pub fn extract(&self, result: &BacktestResult) -> f64 {
        let m = &result.metrics;
        match self {
            RankMetric::TotalReturn => m.total_return,
            RankMetric::Sharpe => m.sharpe,
            RankMetric::MaxDrawdown => m.max_drawdown,
            RankMetric::WinRate => m.win_rate,
            RankMetric::ProfitFactor => m.profit_factor,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RankMetric::TotalReturn => "total_return",
            RankMetric::Sharpe => "sharpe",
            RankMetric::MaxDrawdown => "max_drawdown",
            RankMetric::WinRate => "win_rate",
            RankMetric::ProfitFactor => "profit_factor",
        }
    }
}

impl fmt::Display for RankMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RankMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total_return" => Ok(RankMetric::TotalReturn),
            "sharpe" => Ok(RankMetric::Sharpe),
            "max_drawdown" => Ok(RankMetric::MaxDrawdown),
            "win_rate" => Ok(RankMetric::WinRate),
            "profit_factor" => Ok(RankMetric::ProfitFactor),
            other => Err(format!("unknown rank metric '{other}'")),
        }
    }
}

/// Results of a sweep, in grid order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResults {
    pub results: Vec<BacktestResult>,
}

impl SweepResults {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results ordered best-first by `metric`. NaN values rank last; ties
    /// keep grid order.
    pub fn ranked_by(&self, metric: RankMetric) -> Vec<&BacktestResult> {
        let mut ranked: Vec<&BacktestResult> = self.results.iter().collect();
        ranked.sort_by(|a, b| {
            let (x, y) = (metric.extract(a), metric.extract(b));
            match (x.is_nan(), y.is_nan()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                (false, false) => y.total_cmp(&x),
            }
        });
        ranked
    }

    pub fn best_by(&self, metric: RankMetric) -> Option<&BacktestResult> {
        self.ranked_by(metric).into_iter().next()
    }
}

/// Run every configuration in `grid` against the same inputs.
///
/// Grid thresholds are explicit; when the grid has no threshold axis the
/// base resolution is reused. The first failing run aborts the sweep.
pub fn run_sweep(
    grid: &ParamGrid,
    base: &EngineConfig,
    base_threshold: ThresholdResolution,
    inputs: &LoadedInputs,
    parallel: bool,
) -> Result<SweepResults, RunError> {
    let configs = grid.generate_configs(base);
    info!(runs = configs.len(), parallel, "starting parameter sweep");

    let run_one = |config: &EngineConfig| {
        let threshold = if grid.buy_thresholds.is_empty() {
            base_threshold
        } else {
            ThresholdResolution {
                value: config.buy_threshold,
                source: ThresholdSource::Explicit,
            }
        };
        run_backtest(config.clone(), threshold, inputs)
    };

    let results: Vec<BacktestResult> = if parallel {
        configs
            .par_iter()
            .map(run_one)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        configs.iter().map(run_one).collect::<Result<Vec<_>, _>>()?
    };

    info!(runs = results.len(), "sweep finished");
    Ok(SweepResults { results })
}
