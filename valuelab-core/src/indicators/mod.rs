//! Indicators over plain value series.

pub mod sma;

pub use sma::rolling_mean;
