//! Simulation calendar: common price/signal dates sampled at the run granularity.

use super::market::MarketDataView;
use super::signal::SignalView;
use super::ViewError;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How often the decision loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Granularity {
    /// Every common trading date.
    Daily,
    /// Common trading dates falling on `anchor` (W-FRI sampling by default).
    Weekly { anchor: Weekday },
}

impl Granularity {
    pub fn weekly() -> Self {
        Granularity::Weekly {
            anchor: Weekday::Fri,
        }
    }

    /// Periods per year, used to annualize period returns.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Granularity::Daily => 252.0,
            Granularity::Weekly { .. } => 52.0,
        }
    }

    fn keeps(&self, date: NaiveDate) -> bool {
        match self {
            Granularity::Daily => true,
            Granularity::Weekly { anchor } => date.weekday() == *anchor,
        }
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Self::weekly()
    }
}

/// Dates the engine will simulate, ascending.
///
/// Fails with `NoCommonDates` when the intersection is empty, so a misaligned
/// input is reported before any period runs.
pub fn simulation_dates(
    market: &MarketDataView,
    signals: &SignalView,
    granularity: Granularity,
) -> Result<Vec<NaiveDate>, ViewError> {
    let signal_dates: BTreeSet<NaiveDate> = signals.dates().iter().copied().collect();
    let dates: Vec<NaiveDate> = market
        .dates()
        .iter()
        .copied()
        .filter(|d| signal_dates.contains(d) && granularity.keeps(*d))
        .collect();

    if dates.is_empty() {
        return Err(ViewError::NoCommonDates);
    }
    Ok(dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PriceRow, SignalRow};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn views(price_dates: &[&str], signal_dates: &[&str]) -> (MarketDataView, SignalView) {
        let prices: Vec<PriceRow> = price_dates
            .iter()
            .map(|s| PriceRow { date: d(s), ticker: "FPT".into(), close: 100.0 })
            .collect();
        let signals: Vec<SignalRow> = signal_dates
            .iter()
            .map(|s| SignalRow { date: d(s), ticker: "FPT".into(), probability: 0.5 })
            .collect();
        (
            MarketDataView::from_rows(&prices, None).unwrap(),
            SignalView::from_rows(&signals).unwrap(),
        )
    }

    #[test]
    fn weekly_keeps_common_fridays() {
        // 2024-01-05 and 2024-01-12 are Fridays.
        let (m, s) = views(
            &["2024-01-04", "2024-01-05", "2024-01-11", "2024-01-12", "2024-01-19"],
            &["2024-01-05", "2024-01-11", "2024-01-12"],
        );
        let dates = simulation_dates(&m, &s, Granularity::weekly()).unwrap();
        assert_eq!(dates, vec![d("2024-01-05"), d("2024-01-12")]);
    }

    #[test]
    fn daily_keeps_all_common_dates() {
        let (m, s) = views(&["2024-01-04", "2024-01-05"], &["2024-01-04", "2024-01-05"]);
        let dates = simulation_dates(&m, &s, Granularity::Daily).unwrap();
        assert_eq!(dates.len(), 2);
    }

    #[test]
    fn disjoint_inputs_are_a_configuration_error() {
        let (m, s) = views(&["2024-01-05"], &["2024-01-12"]);
        assert_eq!(
            simulation_dates(&m, &s, Granularity::weekly()).unwrap_err(),
            ViewError::NoCommonDates
        );
    }

    #[test]
    fn weekly_with_no_anchor_day_is_a_configuration_error() {
        // 2024-01-04 is a Thursday.
        let (m, s) = views(&["2024-01-04"], &["2024-01-04"]);
        assert!(simulation_dates(&m, &s, Granularity::weekly()).is_err());
    }

    #[test]
    fn periods_per_year() {
        assert_eq!(Granularity::weekly().periods_per_year(), 52.0);
        assert_eq!(Granularity::Daily.periods_per_year(), 252.0);
    }
}
