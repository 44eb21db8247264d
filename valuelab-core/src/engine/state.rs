//! Run result and fatal engine errors.

use crate::data::ViewError;
use crate::domain::{Snapshot, TradeRecord};
use crate::engine::config::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conditions that stop a run before it produces a result.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid engine config: {0}")]
    Config(#[from] ConfigError),

    #[error("input views: {0}")]
    View(#[from] ViewError),

    /// The run was cancelled; partial state is discarded.
    #[error("run aborted after {completed} of {total} periods")]
    Aborted { completed: usize, total: usize },
}

/// Counters collected while stepping, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Periods where the regime gate blocked entries.
    pub bearish_periods: usize,
    /// Candidates passed over because `open` failed.
    pub skipped_entries: usize,
    /// Open positions with no quote on a period, priced at entry.
    pub stale_marks: usize,
}

/// Output of a completed simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// One snapshot per simulated period, in date order.
    pub snapshots: Vec<Snapshot>,
    /// Closed trades in the order they were closed.
    pub trades: Vec<TradeRecord>,
    /// Positions still open after the last period.
    pub open_positions: usize,
    pub final_cash: f64,
    pub diagnostics: RunDiagnostics,
}

impl RunResult {
    pub fn final_value(&self) -> Option<f64> {
        self.snapshots.last().map(|s| s.portfolio_value)
    }

    pub fn period_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.snapshots.first().map(|s| s.date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.snapshots.last().map(|s| s.date)
    }
}
