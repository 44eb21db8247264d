//! Market Data View: closing prices per ticker per date, plus the market index.

use super::align::Panel;
use super::rows::{IndexRow, PriceRow};
use super::ViewError;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Closes available on one date, keyed by ticker.
pub type Quotes = HashMap<String, f64>;

/// Daily closes of the broad market index, sorted by date.
#[derive(Debug, Clone, Default)]
pub struct IndexSeries {
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
}

impl IndexSeries {
    /// Build from rows in any order. Non-finite closes are dropped; on
    /// duplicate dates the first row wins.
    pub fn from_rows(rows: Vec<IndexRow>) -> Self {
        let mut rows: Vec<IndexRow> = rows.into_iter().filter(|r| r.close.is_finite()).collect();
        rows.sort_by_key(|r| r.date);
        rows.dedup_by_key(|r| r.date);
        Self {
            dates: rows.iter().map(|r| r.date).collect(),
            closes: rows.iter().map(|r| r.close).collect(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.closes[i])
    }
}

/// Read-only aligned price matrix and optional index series.
#[derive(Debug, Clone)]
pub struct MarketDataView {
    prices: Panel,
    index: Option<IndexSeries>,
}

impl MarketDataView {
    pub fn from_rows(rows: &[PriceRow], index: Option<IndexSeries>) -> Result<Self, ViewError> {
        let prices = Panel::pivot(rows.iter().map(|r| (r.date, r.ticker.as_str(), r.close)))?;
        if prices.is_empty() || prices.observation_count() == 0 {
            return Err(ViewError::EmptyPrices);
        }
        Ok(Self {
            prices,
            index: index.filter(|s| !s.is_empty()),
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        self.prices.dates()
    }

    pub fn tickers(&self) -> &[String] {
        self.prices.tickers()
    }

    pub fn panel(&self) -> &Panel {
        &self.prices
    }

    pub fn close(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        self.prices.get(date, ticker)
    }

    /// All closes quoted on `date`; tickers without a quote are absent.
    pub fn quotes_on(&self, date: NaiveDate) -> Quotes {
        self.prices
            .row(date)
            .into_iter()
            .map(|(t, p)| (t.to_string(), p))
            .collect()
    }

    pub fn index(&self) -> Option<&IndexSeries> {
        self.index.as_ref()
    }
}
