//! Exit rules: trailing stop armed after a minimum profit, then max holding period.
//!
//! Checks run in that fixed order and the first match wins, so a position
//! meeting both conditions in the same period closes as `TrailingStop`.

use crate::domain::{ExitReason, Position};
use crate::engine::config::EngineConfig;
use chrono::NaiveDate;

/// A close decided from a read-only view of the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitAction {
    pub ticker: String,
    pub price: f64,
    pub reason: ExitReason,
}

#[derive(Debug, Clone, Copy)]
pub struct ExitRules {
    pub min_profit_for_trail: f64,
    pub trail_stop_percent: f64,
    pub max_holding_days: i64,
}

impl ExitRules {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            min_profit_for_trail: config.min_profit_for_trail,
            trail_stop_percent: config.trail_stop_percent,
            max_holding_days: config.max_holding_days(),
        }
    }

    /// Exit reason for `position` quoted at `price` on `date`, if any.
    ///
    /// Expects `highest_price` to already include `price`.
    pub fn evaluate(&self, position: &Position, price: f64, date: NaiveDate) -> Option<ExitReason> {
        let current_return = position.current_return(price);
        let stop = position.trailing_stop_price(self.trail_stop_percent);

        if current_return >= self.min_profit_for_trail && price < stop {
            Some(ExitReason::TrailingStop)
        } else if position.holding_days(date) >= self.max_holding_days {
            Some(ExitReason::MaxHoldingPeriod)
        } else {
            None
        }
    }
}
