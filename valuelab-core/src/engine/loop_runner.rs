//! Period-by-period simulation loop.
//!
//! Each period runs five phases against the ledger, strictly in order:
//!
//! 1. Mark: update running peaks from the period's closes
//! 2. Exits: decide closes from a read-only view, then apply them
//! 3. Regime gate: skip entries while the index is below its moving average
//! 4. Entries: rank qualifying signals and open up to the position cap
//! 5. Snapshot: record cash + marked position value

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::data::{simulation_dates, MarketDataView, Quotes, SignalView};
use crate::domain::Snapshot;
use crate::engine::config::EngineConfig;
use crate::engine::entry::select_candidates;
use crate::engine::exit::{ExitAction, ExitRules};
use crate::engine::state::{RunDiagnostics, RunResult, SimulationError};
use crate::ledger::PositionLedger;
use crate::regime::RegimeIndicator;

/// A single backtest run over borrowed, immutable input views.
///
/// Owns its ledger, so independent runs can share the same views across
/// threads.
pub struct Simulation<'a> {
    config: EngineConfig,
    market: &'a MarketDataView,
    signals: &'a SignalView,
    regime: RegimeIndicator,
    exit_rules: ExitRules,
    calendar: Vec<NaiveDate>,
    ledger: PositionLedger,
    snapshots: Vec<Snapshot>,
    diagnostics: RunDiagnostics,
}

impl<'a> Simulation<'a> {
    /// Validate the config and build the period calendar.
    ///
    /// Fails before any period is simulated if the config is invalid or the
    /// views share no dates.
    pub fn new(
        config: EngineConfig,
        market: &'a MarketDataView,
        signals: &'a SignalView,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let calendar = simulation_dates(market, signals, config.granularity)?;

        let regime = match market.index() {
            Some(index) => RegimeIndicator::from_series(
                index,
                config.regime_ma_period,
                config.regime_ma_min_periods,
            ),
            None => {
                warn!("no market index series; regime filter treats every period as bullish");
                RegimeIndicator::always_bullish()
            }
        };

        let ledger = PositionLedger::new(
            config.initial_capital,
            config.allocation_per_stock,
            config.transaction_cost,
        );

        Ok(Self {
            exit_rules: ExitRules::from_config(&config),
            config,
            market,
            signals,
            regime,
            calendar,
            ledger,
            snapshots: Vec::new(),
            diagnostics: RunDiagnostics::default(),
        })
    }

    /// Dates this run will simulate, in order.
    pub fn calendar(&self) -> &[NaiveDate] {
        &self.calendar
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn diagnostics(&self) -> &RunDiagnostics {
        &self.diagnostics
    }

    /// Simulate one period and record its snapshot.
    ///
    /// Callers must step dates in ascending order; [`Simulation::run`] does
    /// this over the whole calendar.
    pub fn step(&mut self, date: NaiveDate) -> Snapshot {
        let quotes = self.market.quotes_on(date);

        // 1. Mark
        self.ledger.mark_to_market(&quotes);
        self.diagnostics.stale_marks += self
            .ledger
            .positions()
            .iter()
            .filter(|p| !quotes.contains_key(&p.ticker))
            .count();

        // 2. Exits
        for action in self.exit_actions(&quotes, date) {
            match self
                .ledger
                .close(&action.ticker, action.price, date, action.reason)
            {
                Ok(trade) => debug!(
                    %date,
                    ticker = %trade.ticker,
                    reason = %trade.reason,
                    pnl = trade.pnl_percent,
                    "closed position"
                ),
                Err(e) => debug!(%date, error = %e, "close skipped"),
            }
        }

        // 3. Regime gate, 4. Entries
        if self.regime.is_bullish(date) {
            self.execute_entries(&quotes, date);
        } else {
            self.diagnostics.bearish_periods += 1;
            debug!(%date, "bearish regime; entries skipped");
        }

        // 5. Snapshot
        let snapshot = Snapshot {
            date,
            portfolio_value: self.ledger.portfolio_value(&quotes),
            cash: self.ledger.cash(),
            open_positions: self.ledger.open_count(),
        };
        self.snapshots.push(snapshot.clone());
        snapshot
    }

    /// Closes due this period. Positions without a quote are not evaluated.
    fn exit_actions(&self, quotes: &Quotes, date: NaiveDate) -> Vec<ExitAction> {
        self.ledger
            .positions()
            .iter()
            .filter_map(|pos| {
                let price = *quotes.get(&pos.ticker)?;
                self.exit_rules
                    .evaluate(pos, price, date)
                    .map(|reason| ExitAction {
                        ticker: pos.ticker.clone(),
                        price,
                        reason,
                    })
            })
            .collect()
    }

    fn execute_entries(&mut self, quotes: &Quotes, date: NaiveDate) {
        let signals = self.signals.signals_on(date);
        let candidates = select_candidates(&signals, self.config.buy_threshold, &self.ledger);

        for candidate in candidates {
            if self.ledger.open_count() >= self.config.max_positions {
                break;
            }
            let Some(&price) = quotes.get(&candidate.ticker) else {
                self.diagnostics.skipped_entries += 1;
                debug!(%date, ticker = %candidate.ticker, "no quote; entry skipped");
                continue;
            };
            match self.ledger.open(&candidate.ticker, price, date) {
                Ok(pos) => debug!(
                    %date,
                    ticker = %pos.ticker,
                    shares = pos.shares,
                    price,
                    probability = candidate.probability,
                    "opened position"
                ),
                Err(e) => {
                    self.diagnostics.skipped_entries += 1;
                    debug!(%date, error = %e, "entry skipped");
                }
            }
        }
    }

    /// Run every period in the calendar.
    pub fn run(self) -> Result<RunResult, SimulationError> {
        self.run_with_cancel(None)
    }

    /// Run every period, checking `cancel` before each one.
    ///
    /// A cancelled run returns [`SimulationError::Aborted`] and no partial
    /// result.
    pub fn run_with_cancel(
        mut self,
        cancel: Option<&AtomicBool>,
    ) -> Result<RunResult, SimulationError> {
        let total = self.calendar.len();
        info!(
            periods = total,
            tickers = self.market.tickers().len(),
            threshold = self.config.buy_threshold,
            "starting simulation"
        );

        let calendar = std::mem::take(&mut self.calendar);
        for (completed, &date) in calendar.iter().enumerate() {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                warn!(completed, total, "simulation cancelled");
                return Err(SimulationError::Aborted { completed, total });
            }
            self.step(date);
        }

        let result = RunResult {
            open_positions: self.ledger.open_count(),
            final_cash: self.ledger.cash(),
            snapshots: self.snapshots,
            trades: self.ledger.into_trades(),
            diagnostics: self.diagnostics,
        };
        info!(
            periods = result.period_count(),
            trades = result.trades.len(),
            final_value = result.final_value().unwrap_or(f64::NAN),
            "simulation finished"
        );
        Ok(result)
    }
}

/// Convenience wrapper: build a [`Simulation`] and run it to completion.
pub fn run_simulation(
    config: EngineConfig,
    market: &MarketDataView,
    signals: &SignalView,
) -> Result<RunResult, SimulationError> {
    Simulation::new(config, market, signals)?.run()
}
