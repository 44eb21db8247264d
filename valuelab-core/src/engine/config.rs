//! Engine configuration: fixed at construction, never mutated mid-run.

use crate::data::Granularity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Buy-confidence threshold used when no calibrated value is available.
pub const DEFAULT_BUY_THRESHOLD: f64 = 0.5399;

/// Invalid engine parameters.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("initial_capital must be positive and finite, got {0}")]
    InitialCapital(f64),

    #[error("allocation_per_stock must be positive and finite, got {0}")]
    Allocation(f64),

    #[error("max_positions must be >= 1")]
    MaxPositions,

    #[error("transaction_cost must be in [0, 1), got {0}")]
    TransactionCost(f64),

    #[error("buy_threshold must be in [0, 1], got {0}")]
    BuyThreshold(f64),

    #[error("max_holding_years must be positive and finite, got {0}")]
    MaxHoldingYears(f64),

    #[error("min_profit_for_trail must be >= 0 and finite, got {0}")]
    MinProfitForTrail(f64),

    #[error("trail_stop_percent must be in (0, 1), got {0}")]
    TrailStopPercent(f64),

    #[error("regime_ma_period must be >= 1")]
    RegimeMaPeriod,
}

/// Parameters for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Fixed notional spent on each new position.
    pub allocation_per_stock: f64,
    pub max_positions: usize,
    /// Proportional cost charged on both buys and sells.
    pub transaction_cost: f64,
    /// Signals must be strictly above this probability to qualify.
    pub buy_threshold: f64,
    /// Positions are force-closed after `max_holding_years × 365` calendar days.
    pub max_holding_years: f64,
    /// Trailing stop is armed only once the return reaches this level.
    pub min_profit_for_trail: f64,
    pub trail_stop_percent: f64,
    pub regime_ma_period: usize,
    pub regime_ma_min_periods: usize,
    pub granularity: Granularity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000_000_000.0,
            allocation_per_stock: 100_000_000.0,
            max_positions: 10,
            transaction_cost: 0.0025,
            buy_threshold: DEFAULT_BUY_THRESHOLD,
            max_holding_years: 2.0,
            min_profit_for_trail: 0.20,
            trail_stop_percent: 0.15,
            regime_ma_period: 200,
            regime_ma_min_periods: 100,
            granularity: Granularity::weekly(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(ConfigError::InitialCapital(self.initial_capital));
        }
        if !(self.allocation_per_stock.is_finite() && self.allocation_per_stock > 0.0) {
            return Err(ConfigError::Allocation(self.allocation_per_stock));
        }
        if self.max_positions == 0 {
            return Err(ConfigError::MaxPositions);
        }
        if !(0.0..1.0).contains(&self.transaction_cost) {
            return Err(ConfigError::TransactionCost(self.transaction_cost));
        }
        if !(0.0..=1.0).contains(&self.buy_threshold) {
            return Err(ConfigError::BuyThreshold(self.buy_threshold));
        }
        if !(self.max_holding_years.is_finite() && self.max_holding_years > 0.0) {
            return Err(ConfigError::MaxHoldingYears(self.max_holding_years));
        }
        if !(self.min_profit_for_trail.is_finite() && self.min_profit_for_trail >= 0.0) {
            return Err(ConfigError::MinProfitForTrail(self.min_profit_for_trail));
        }
        if !(self.trail_stop_percent > 0.0 && self.trail_stop_percent < 1.0) {
            return Err(ConfigError::TrailStopPercent(self.trail_stop_percent));
        }
        if self.regime_ma_period == 0 {
            return Err(ConfigError::RegimeMaPeriod);
        }
        Ok(())
    }

    /// Holding period limit in calendar days.
    pub fn max_holding_days(&self) -> i64 {
        (self.max_holding_years * 365.0).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_holding_days(), 730);
        assert_eq!(cfg.buy_threshold, 0.5399);
    }

    #[test]
    fn rejects_each_bad_parameter() {
        let cases: [(fn(&mut EngineConfig), ConfigError); 9] = [
            (|c| c.initial_capital = 0.0, ConfigError::InitialCapital(0.0)),
            (|c| c.allocation_per_stock = -1.0, ConfigError::Allocation(-1.0)),
            (|c| c.max_positions = 0, ConfigError::MaxPositions),
            (|c| c.transaction_cost = 1.0, ConfigError::TransactionCost(1.0)),
            (|c| c.buy_threshold = 1.5, ConfigError::BuyThreshold(1.5)),
            (|c| c.max_holding_years = 0.0, ConfigError::MaxHoldingYears(0.0)),
            (|c| c.min_profit_for_trail = -0.1, ConfigError::MinProfitForTrail(-0.1)),
            (|c| c.trail_stop_percent = 0.0, ConfigError::TrailStopPercent(0.0)),
            (|c| c.regime_ma_period = 0, ConfigError::RegimeMaPeriod),
        ];
        for (mutate, expected) in cases {
            let mut cfg = EngineConfig::default();
            mutate(&mut cfg);
            assert_eq!(cfg.validate().unwrap_err(), expected);
        }
    }

    #[test]
    fn partial_document_fills_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"max_positions": 3}"#).unwrap();
        assert_eq!(cfg.max_positions, 3);
        assert_eq!(cfg.trail_stop_percent, 0.15);
        assert_eq!(cfg.granularity, Granularity::weekly());
    }
}
