//! Domain types for valuelab

pub mod position;
pub mod snapshot;
pub mod trade;

pub use position::Position;
pub use snapshot::Snapshot;
pub use trade::{ExitReason, TradeRecord};

/// Instrument identifier.
pub type Ticker = String;
