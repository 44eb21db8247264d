//! TradeRecord: the immutable log entry written when a position closes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    TrailingStop,
    MaxHoldingPeriod,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TrailingStop => "TrailingStop",
            ExitReason::MaxHoldingPeriod => "MaxHoldingPeriod",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed round trip: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Exit ──
    pub exit_date: NaiveDate,
    pub ticker: String,
    /// exit_price / entry_price - 1, before transaction costs.
    pub pnl_percent: f64,
    pub reason: ExitReason,

    // ── Entry ──
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Fill ──
    pub exit_price: f64,
    pub shares: u64,
    pub holding_days: i64,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl_percent > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade(pnl_percent: f64) -> TradeRecord {
        TradeRecord {
            exit_date: NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(),
            ticker: "HPG".into(),
            pnl_percent,
            reason: ExitReason::TrailingStop,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            entry_price: 100.0,
            exit_price: 100.0 * (1.0 + pnl_percent),
            shares: 1_000,
            holding_days: 154,
        }
    }

    #[test]
    fn winner_requires_strictly_positive_pnl() {
        assert!(sample_trade(0.1).is_winner());
        assert!(!sample_trade(0.0).is_winner());
        assert!(!sample_trade(-0.05).is_winner());
    }

    #[test]
    fn reason_renders_variant_name() {
        assert_eq!(ExitReason::TrailingStop.to_string(), "TrailingStop");
        assert_eq!(ExitReason::MaxHoldingPeriod.to_string(), "MaxHoldingPeriod");
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade(0.25);
        let json = serde_json::to_string(&trade).unwrap();
        let deser: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
