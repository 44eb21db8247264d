//! Snapshot: one portfolio measurement per simulated period.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Portfolio state at the end of one period.
///
/// `portfolio_value == cash + Σ(shares × close-or-entry-price)` for the open
/// positions at the time the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    pub cash: f64,
    pub open_positions: usize,
}
