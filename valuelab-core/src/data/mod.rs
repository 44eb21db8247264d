//! Read-only input views.
//!
//! Raw `(date, ticker, value)` rows are pivoted into date × ticker panels
//! (`align`), wrapped as the market data and signal views the engine reads,
//! and sampled onto the simulation calendar (`calendar`).

pub mod align;
pub mod calendar;
pub mod market;
pub mod rows;
pub mod signal;

pub use align::Panel;
pub use calendar::{simulation_dates, Granularity};
pub use market::{IndexSeries, MarketDataView, Quotes};
pub use rows::{IndexRow, PriceRow, SignalRow};
pub use signal::SignalView;

use chrono::NaiveDate;
use thiserror::Error;

/// Fatal input problems, surfaced before the first period is simulated.
#[derive(Debug, Error, PartialEq)]
pub enum ViewError {
    #[error("price table is empty")]
    EmptyPrices,

    #[error("signal table is empty")]
    EmptySignals,

    #[error("price and signal tables share no dates for the requested granularity")]
    NoCommonDates,

    #[error("duplicate row for '{ticker}' on {date}")]
    DuplicateRow { ticker: String, date: NaiveDate },

    #[error("probability {value} for '{ticker}' on {date} is outside [0, 1]")]
    ProbabilityOutOfRange {
        ticker: String,
        date: NaiveDate,
        value: f64,
    },
}
