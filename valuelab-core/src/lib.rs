//! ValueLab Core: input views, position ledger, regime filter and the
//! weekly simulation engine.
//!
//! This crate contains the deterministic heart of a backtest:
//! - Domain types (positions, trade records, snapshots)
//! - Market data and signal views pivoted into date × ticker panels
//! - Market regime indicator over a long moving average of an index
//! - Position ledger with capital accounting
//! - Period-by-period simulation loop (mark, exits, regime gate, entries, snapshot)

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod ledger;
pub mod regime;
