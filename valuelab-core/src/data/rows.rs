//! Row types handed over by the ingestion collaborators.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One closing price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
}

/// One classifier output: probability that `ticker` is a buy on `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub probability: f64,
}

/// One market index close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRow {
    pub date: NaiveDate,
    pub close: f64,
}
