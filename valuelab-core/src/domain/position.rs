//! Position: a single open holding.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One open holding.
///
/// Entry fields and `shares` are fixed at creation. Only `highest_price`
/// moves, and it never decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub shares: u64,
    /// Running maximum of observed closes since entry (starts at the entry price).
    pub highest_price: f64,
}

impl Position {
    pub fn new(ticker: impl Into<String>, entry_price: f64, entry_date: NaiveDate, shares: u64) -> Self {
        Self {
            ticker: ticker.into(),
            entry_price,
            entry_date,
            shares,
            highest_price: entry_price,
        }
    }

    /// Raise the high watermark if `price` exceeds it.
    pub fn observe(&mut self, price: f64) {
        if price > self.highest_price {
            self.highest_price = price;
        }
    }

    /// Value of the holding at `price`, or at the entry price when there is no quote.
    pub fn market_value(&self, price: Option<f64>) -> f64 {
        self.shares as f64 * price.unwrap_or(self.entry_price)
    }

    /// Calendar days elapsed since entry.
    pub fn holding_days(&self, date: NaiveDate) -> i64 {
        (date - self.entry_date).num_days()
    }

    pub fn current_return(&self, price: f64) -> f64 {
        price / self.entry_price - 1.0
    }

    /// Price below which the trailing stop fires.
    pub fn trailing_stop_price(&self, trail_stop_percent: f64) -> f64 {
        self.highest_price * (1.0 - trail_stop_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn high_watermark_only_rises() {
        let mut pos = Position::new("FPT", 100.0, d(2024, 1, 5), 10);
        pos.observe(120.0);
        pos.observe(110.0);
        assert_eq!(pos.highest_price, 120.0);
    }

    #[test]
    fn market_value_falls_back_to_entry_price() {
        let pos = Position::new("FPT", 100.0, d(2024, 1, 5), 10);
        assert_eq!(pos.market_value(Some(110.0)), 1_100.0);
        assert_eq!(pos.market_value(None), 1_000.0);
    }

    #[test]
    fn holding_days_counts_calendar_days() {
        let pos = Position::new("FPT", 100.0, d(2024, 1, 5), 10);
        assert_eq!(pos.holding_days(d(2024, 1, 12)), 7);
        assert_eq!(pos.holding_days(d(2025, 1, 5)), 366);
    }

    #[test]
    fn trailing_stop_price_tracks_peak() {
        let mut pos = Position::new("FPT", 100.0, d(2024, 1, 5), 10);
        pos.observe(130.0);
        assert!((pos.trailing_stop_price(0.15) - 110.5).abs() < 1e-12);
    }
}
