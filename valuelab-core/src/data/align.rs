//! Date × ticker alignment.
//!
//! Rows are pivoted onto the union of their dates and tickers, both sorted
//! ascending. Missing cells are NaN; nothing is forward-filled.

use super::ViewError;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Dense date × ticker matrix.
#[derive(Debug, Clone)]
pub struct Panel {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    /// One row per date, one column per ticker.
    values: Vec<Vec<f64>>,
    date_index: HashMap<NaiveDate, usize>,
}

impl Panel {
    /// Pivot `(date, ticker, value)` triples. Non-finite values are treated as gaps.
    pub fn pivot<'a, I>(rows: I) -> Result<Self, ViewError>
    where
        I: IntoIterator<Item = (NaiveDate, &'a str, f64)>,
    {
        let rows: Vec<(NaiveDate, &str, f64)> = rows.into_iter().collect();

        let dates: Vec<NaiveDate> = rows
            .iter()
            .map(|(d, _, _)| *d)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let tickers: Vec<String> = rows
            .iter()
            .map(|(_, t, _)| *t)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let date_index: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let ticker_index: HashMap<&str, usize> = tickers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let mut values = vec![vec![f64::NAN; tickers.len()]; dates.len()];
        let mut seen = vec![vec![false; tickers.len()]; dates.len()];

        for (date, ticker, value) in rows {
            let r = date_index[&date];
            let c = ticker_index[ticker];
            if seen[r][c] {
                return Err(ViewError::DuplicateRow {
                    ticker: ticker.to_string(),
                    date,
                });
            }
            seen[r][c] = true;
            if value.is_finite() {
                values[r][c] = value;
            }
        }

        Ok(Self {
            dates,
            tickers,
            values,
            date_index,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.tickers.is_empty()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.date_index.contains_key(&date)
    }

    /// Cell value, `None` for an unknown date/ticker or a gap.
    pub fn get(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        let r = *self.date_index.get(&date)?;
        let c = self.tickers.iter().position(|t| t == ticker)?;
        let v = self.values[r][c];
        (!v.is_nan()).then_some(v)
    }

    /// Non-gap cells on `date`, in ticker order.
    pub fn row(&self, date: NaiveDate) -> Vec<(&str, f64)> {
        let Some(&r) = self.date_index.get(&date) else {
            return Vec::new();
        };
        self.tickers
            .iter()
            .zip(&self.values[r])
            .filter(|(_, v)| !v.is_nan())
            .map(|(t, v)| (t.as_str(), *v))
            .collect()
    }

    /// Count of non-gap cells.
    pub fn observation_count(&self) -> usize {
        self.values
            .iter()
            .map(|row| row.iter().filter(|v| !v.is_nan()).count())
            .sum()
    }
}
