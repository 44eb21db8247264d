//! Performance analyzer: pure functions over the snapshot and trade streams.
//!
//! Every metric is a pure function: value series and/or trade list in, scalar
//! or series out. Nothing here touches the ledger or the engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use valuelab_core::data::IndexSeries;
use valuelab_core::domain::{Snapshot, TradeRecord};

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// NaN with no trades, +inf with wins and no losses.
    #[serde(with = "non_finite")]
    pub profit_factor: f64,
    pub trade_count: usize,
    pub period_count: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Periods per year used to annualize the Sharpe ratio.
    pub annualization_factor: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from the snapshot history and closed trades.
    pub fn compute(
        snapshots: &[Snapshot],
        trades: &[TradeRecord],
        initial_capital: f64,
        annualization_factor: f64,
    ) -> Self {
        let values: Vec<f64> = snapshots.iter().map(|s| s.portfolio_value).collect();
        let final_value = values.last().copied().unwrap_or(initial_capital);
        let returns = period_returns(&values);

        Self {
            initial_capital,
            final_value,
            total_return: total_return(final_value, initial_capital),
            sharpe: sharpe_ratio(&returns, annualization_factor),
            max_drawdown: max_drawdown(&values),
            win_rate: win_rate(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            period_count: snapshots.len(),
            start_date: snapshots.first().map(|s| s.date),
            end_date: snapshots.last().map(|s| s.date),
            annualization_factor,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction of starting capital.
pub fn total_return(final_value: f64, initial_capital: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    final_value / initial_capital - 1.0
}

/// Period-over-period simple returns. Steps from a non-positive value are dropped.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Annualized Sharpe ratio with a zero risk-free rate.
///
/// Sharpe = mean(returns) × af / (std(returns) × √af), sample std.
/// Returns 0.0 for fewer than two returns or zero variance.
pub fn sharpe_ratio(returns: &[f64], annualization_factor: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) * annualization_factor / (std * annualization_factor.sqrt())
}

/// Drawdown from the running peak at each point: `value / peak - 1`.
pub fn drawdown_series(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            peak = peak.max(v);
            if peak > 0.0 {
                v / peak - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Maximum drawdown as a non-positive fraction (-0.15 = 15% drawdown).
///
/// Returns 0.0 for an empty or never-declining series.
pub fn max_drawdown(values: &[f64]) -> f64 {
    drawdown_series(values).into_iter().fold(0.0, f64::min)
}

/// Fraction of trades with positive pnl. 0.0 with no trades.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Mean pnl of winning trades. 0.0 if there are none.
pub fn avg_win(trades: &[TradeRecord]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.pnl_percent)
        .collect();
    mean_f64(&wins)
}

/// Mean pnl of non-winning trades (pnl ≤ 0). 0.0 if there are none.
pub fn avg_loss(trades: &[TradeRecord]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.pnl_percent)
        .collect();
    mean_f64(&losses)
}

/// Sum of positive pnl over |sum of non-positive pnl|.
///
/// NaN with no trades, or when both sums are zero. +inf when there are
/// gains and the losses sum to zero.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return f64::NAN;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.pnl_percent)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.pnl_percent)
        .sum::<f64>()
        .abs();

    if gross_loss == 0.0 {
        return if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            f64::NAN
        };
    }
    gross_profit / gross_loss
}

/// Index closes rescaled so the first snapshot date with an index value
/// equals `initial_capital`. `None` where the index has no close.
pub fn benchmark_curve(
    snapshots: &[Snapshot],
    index: &IndexSeries,
    initial_capital: f64,
) -> Vec<Option<f64>> {
    let base = snapshots
        .iter()
        .find_map(|s| index.close_on(s.date))
        .filter(|c| *c > 0.0);

    snapshots
        .iter()
        .map(|s| {
            let base = base?;
            index.close_on(s.date).map(|c| c * initial_capital / base)
        })
        .collect()
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Serde adapter that keeps NaN and ±inf distinguishable in JSON.
///
/// Finite values are plain numbers; others are the strings `"NaN"`,
/// `"inf"` and `"-inf"`.
pub mod non_finite {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) => match s.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::custom(format!("invalid float literal '{other}'"))),
            },
        }
    }
}
