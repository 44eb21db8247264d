//! Signal View: buy probability per ticker per date from the external classifier.

use super::align::Panel;
use super::rows::SignalRow;
use super::ViewError;
use chrono::NaiveDate;

/// Read-only aligned probability matrix.
#[derive(Debug, Clone)]
pub struct SignalView {
    probabilities: Panel,
}

impl SignalView {
    pub fn from_rows(rows: &[SignalRow]) -> Result<Self, ViewError> {
        for r in rows {
            if r.probability.is_finite() && !(0.0..=1.0).contains(&r.probability) {
                return Err(ViewError::ProbabilityOutOfRange {
                    ticker: r.ticker.clone(),
                    date: r.date,
                    value: r.probability,
                });
            }
        }
        let probabilities =
            Panel::pivot(rows.iter().map(|r| (r.date, r.ticker.as_str(), r.probability)))?;
        if probabilities.is_empty() || probabilities.observation_count() == 0 {
            return Err(ViewError::EmptySignals);
        }
        Ok(Self { probabilities })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        self.probabilities.dates()
    }

    pub fn tickers(&self) -> &[String] {
        self.probabilities.tickers()
    }

    pub fn panel(&self) -> &Panel {
        &self.probabilities
    }

    /// Probabilities available on `date`, in ticker order.
    pub fn signals_on(&self, date: NaiveDate) -> Vec<(&str, f64)> {
        self.probabilities.row(date)
    }
}
