//! Entry candidate selection.
//!
//! Qualifying signals are strictly above the threshold, for tickers never
//! bought before in this run and not currently held. Candidates are ranked
//! by probability, highest first; equal probabilities keep ticker order.

use crate::ledger::PositionLedger;

/// A ticker eligible for a new position this period.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryCandidate {
    pub ticker: String,
    pub probability: f64,
}

/// Rank this period's signals into entry candidates.
///
/// `signals` must be in the view's ticker order; the sort is stable so that
/// order breaks ties deterministically.
pub fn select_candidates(
    signals: &[(&str, f64)],
    threshold: f64,
    ledger: &PositionLedger,
) -> Vec<EntryCandidate> {
    let mut candidates: Vec<EntryCandidate> = signals
        .iter()
        .filter(|(_, p)| *p > threshold)
        .filter(|(t, _)| !ledger.was_recommended(t) && !ledger.is_held(t))
        .map(|(t, p)| EntryCandidate {
            ticker: t.to_string(),
            probability: *p,
        })
        .collect();

    candidates.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    candidates
}
