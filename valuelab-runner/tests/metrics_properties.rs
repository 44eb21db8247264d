//! Property tests for the performance analyzer.
//!
//! 1. Drawdowns lie in [-1, 0] and max drawdown is their minimum
//! 2. Win rate is a fraction and matches the winner count
//! 3. Sharpe is finite and scale-invariant in the value series

use chrono::NaiveDate;
use proptest::prelude::*;
use valuelab_core::domain::{ExitReason, TradeRecord};
use valuelab_runner::metrics::{
    drawdown_series, max_drawdown, period_returns, profit_factor, sharpe_ratio, win_rate,
};

fn arb_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..1e9_f64, 0..80)
}

fn trade(pnl_percent: f64) -> TradeRecord {
    let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    TradeRecord {
        exit_date: date,
        ticker: "AAA".into(),
        pnl_percent,
        reason: ExitReason::MaxHoldingPeriod,
        entry_date: date,
        entry_price: 100.0,
        exit_price: 100.0 * (1.0 + pnl_percent),
        shares: 1,
        holding_days: 0,
    }
}

proptest! {
    #[test]
    fn drawdown_bounds(values in arb_values()) {
        let dd = drawdown_series(&values);
        prop_assert_eq!(dd.len(), values.len());
        for &x in &dd {
            prop_assert!((-1.0..=0.0).contains(&x));
        }
        let min = dd.iter().copied().fold(0.0, f64::min);
        prop_assert_eq!(max_drawdown(&values), min);
    }

    #[test]
    fn win_rate_counts_winners(pnls in prop::collection::vec(-0.9..2.0_f64, 1..50)) {
        let trades: Vec<TradeRecord> = pnls.iter().map(|&p| trade(p)).collect();
        let winners = pnls.iter().filter(|&&p| p > 0.0).count();
        let rate = win_rate(&trades);
        prop_assert!((0.0..=1.0).contains(&rate));
        prop_assert!((rate - winners as f64 / pnls.len() as f64).abs() < 1e-12);

        let pf = profit_factor(&trades);
        if winners == 0 {
            prop_assert!(pf == 0.0 || pf.is_nan());
        } else {
            prop_assert!(pf > 0.0);
        }
    }

    #[test]
    fn sharpe_finite_and_scale_invariant(values in arb_values(), scale in 0.5..20.0_f64) {
        let returns = period_returns(&values);
        let s = sharpe_ratio(&returns, 52.0);
        prop_assert!(s.is_finite());

        let scaled: Vec<f64> = values.iter().map(|v| v * scale).collect();
        let s2 = sharpe_ratio(&period_returns(&scaled), 52.0);
        prop_assert!((s - s2).abs() <= 1e-6 * s.abs().max(1.0));
    }
}
