//! Market regime indicator: gates new entries by trend of the broad index.
//!
//! Bullish when the index close is at or above its long moving average.
//! Missing index data never blocks trading: an absent series, a date the
//! index did not trade, or a warm-up row without a defined average all
//! read as bullish.

use crate::data::IndexSeries;
use crate::indicators::rolling_mean;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Precomputed regime state per index date.
#[derive(Debug, Clone, Default)]
pub struct RegimeIndicator {
    /// date → (close, moving average). NaN average means undefined.
    by_date: HashMap<NaiveDate, (f64, f64)>,
}

impl RegimeIndicator {
    /// Indicator that reports bullish on every date.
    pub fn always_bullish() -> Self {
        Self::default()
    }

    /// Compute the moving average over the daily index series.
    pub fn from_series(series: &IndexSeries, period: usize, min_periods: usize) -> Self {
        let ma = rolling_mean(series.closes(), period, min_periods);
        let by_date = series
            .dates()
            .iter()
            .zip(series.closes())
            .zip(ma)
            .map(|((d, c), m)| (*d, (*c, m)))
            .collect();
        Self { by_date }
    }

    pub fn is_bullish(&self, date: NaiveDate) -> bool {
        match self.by_date.get(&date) {
            Some(&(close, ma)) if !ma.is_nan() => close >= ma,
            _ => true,
        }
    }

    /// Moving average on `date`, if the index traded and the average is defined.
    pub fn moving_average(&self, date: NaiveDate) -> Option<f64> {
        self.by_date
            .get(&date)
            .map(|&(_, ma)| ma)
            .filter(|ma| !ma.is_nan())
    }

    pub fn has_data(&self) -> bool {
        !self.by_date.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::IndexRow;

    fn series(closes: &[f64]) -> IndexSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        IndexSeries::from_rows(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| IndexRow {
                    date: base + chrono::Duration::days(i as i64),
                    close,
                })
                .collect(),
        )
    }

    fn day(i: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i)
    }

    #[test]
    fn close_above_average_is_bullish() {
        let r = RegimeIndicator::from_series(&series(&[10.0, 10.0, 10.0, 13.0]), 3, 3);
        // ma(3) at day 3 = (10 + 10 + 13) / 3 = 11
        assert!(r.is_bullish(day(3)));
        assert_eq!(r.moving_average(day(3)), Some(11.0));
    }

    #[test]
    fn close_below_average_is_bearish() {
        let r = RegimeIndicator::from_series(&series(&[10.0, 10.0, 10.0, 7.0]), 3, 3);
        assert!(!r.is_bullish(day(3)));
    }

    #[test]
    fn close_equal_to_average_is_bullish() {
        let r = RegimeIndicator::from_series(&series(&[10.0, 10.0, 10.0]), 3, 3);
        assert!(r.is_bullish(day(2)));
    }

    #[test]
    fn warmup_rows_default_to_bullish() {
        let r = RegimeIndicator::from_series(&series(&[10.0, 5.0]), 3, 3);
        assert!(r.is_bullish(day(1)));
        assert_eq!(r.moving_average(day(1)), None);
    }

    #[test]
    fn dates_without_index_data_default_to_bullish() {
        let r = RegimeIndicator::from_series(&series(&[10.0, 10.0, 1.0]), 2, 2);
        assert!(!r.is_bullish(day(2)));
        assert!(r.is_bullish(day(30)));
        assert!(RegimeIndicator::always_bullish().is_bullish(day(2)));
        assert!(!RegimeIndicator::always_bullish().has_data());
    }
}
