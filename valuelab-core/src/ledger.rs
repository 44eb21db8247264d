//! Position Ledger: cash, open positions, and the set of tickers ever bought.
//!
//! Accounting identity at every point between calls:
//! `portfolio_value == cash + Σ(shares × quote-or-entry-price)`.
//! Cash never goes negative: `open` refuses a buy it cannot pay for in full,
//! transaction costs included.

use crate::data::Quotes;
use crate::domain::{ExitReason, Position, TradeRecord};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use thiserror::Error;

/// Local, non-fatal ledger failures. The engine skips the action and moves on.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("insufficient capital for '{ticker}': cash {cash:.2} < required {required:.2}")]
    InsufficientCapital {
        ticker: String,
        cash: f64,
        required: f64,
    },

    #[error("'{ticker}' is already held")]
    AlreadyHeld { ticker: String },

    #[error("'{ticker}' is not held")]
    NotHeld { ticker: String },

    #[error("allocation {allocation:.2} buys zero shares of '{ticker}' at {price}")]
    ZeroShares {
        ticker: String,
        price: f64,
        allocation: f64,
    },

    #[error("invalid fill price {price} for '{ticker}'")]
    InvalidPrice { ticker: String, price: f64 },
}

/// Mutable portfolio state for one run.
#[derive(Debug, Clone)]
pub struct PositionLedger {
    cash: f64,
    allocation_per_stock: f64,
    transaction_cost: f64,
    /// Open positions in the order they were opened.
    positions: Vec<Position>,
    /// Every ticker ever opened; only grows.
    recommended: BTreeSet<String>,
    trades: Vec<TradeRecord>,
}

impl PositionLedger {
    pub fn new(initial_capital: f64, allocation_per_stock: f64, transaction_cost: f64) -> Self {
        Self {
            cash: initial_capital,
            allocation_per_stock,
            transaction_cost,
            positions: Vec::new(),
            recommended: BTreeSet::new(),
            trades: Vec::new(),
        }
    }

    /// Open a position worth at most one allocation.
    ///
    /// `shares = floor(allocation / price)`; cash is debited
    /// `shares × price × (1 + transaction_cost)`.
    pub fn open(&mut self, ticker: &str, price: f64, date: NaiveDate) -> Result<Position, LedgerError> {
        if self.cash < self.allocation_per_stock {
            return Err(LedgerError::InsufficientCapital {
                ticker: ticker.to_string(),
                cash: self.cash,
                required: self.allocation_per_stock,
            });
        }
        if self.is_held(ticker) {
            return Err(LedgerError::AlreadyHeld {
                ticker: ticker.to_string(),
            });
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(LedgerError::InvalidPrice {
                ticker: ticker.to_string(),
                price,
            });
        }

        let shares = (self.allocation_per_stock / price).floor() as u64;
        if shares == 0 {
            return Err(LedgerError::ZeroShares {
                ticker: ticker.to_string(),
                price,
                allocation: self.allocation_per_stock,
            });
        }

        let debit = shares as f64 * price * (1.0 + self.transaction_cost);
        if debit > self.cash {
            return Err(LedgerError::InsufficientCapital {
                ticker: ticker.to_string(),
                cash: self.cash,
                required: debit,
            });
        }

        self.cash -= debit;
        let position = Position::new(ticker, price, date, shares);
        self.positions.push(position.clone());
        self.recommended.insert(ticker.to_string());
        Ok(position)
    }

    /// Close the whole position in `ticker`, crediting
    /// `shares × price × (1 - transaction_cost)`.
    pub fn close(
        &mut self,
        ticker: &str,
        price: f64,
        date: NaiveDate,
        reason: ExitReason,
    ) -> Result<TradeRecord, LedgerError> {
        let idx = self
            .positions
            .iter()
            .position(|p| p.ticker == ticker)
            .ok_or_else(|| LedgerError::NotHeld {
                ticker: ticker.to_string(),
            })?;
        if !price.is_finite() || price < 0.0 {
            return Err(LedgerError::InvalidPrice {
                ticker: ticker.to_string(),
                price,
            });
        }

        let position = self.positions.remove(idx);
        self.cash += position.shares as f64 * price * (1.0 - self.transaction_cost);

        let trade = TradeRecord {
            exit_date: date,
            ticker: position.ticker.clone(),
            pnl_percent: position.current_return(price),
            reason,
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_price: price,
            shares: position.shares,
            holding_days: position.holding_days(date),
        };
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Raise each quoted position's high watermark and return the portfolio value.
    pub fn mark_to_market(&mut self, quotes: &Quotes) -> f64 {
        for position in &mut self.positions {
            if let Some(&price) = quotes.get(&position.ticker) {
                position.observe(price);
            }
        }
        self.portfolio_value(quotes)
    }

    /// Cash plus open positions valued at their quote, or entry price when unquoted.
    pub fn portfolio_value(&self, quotes: &Quotes) -> f64 {
        self.cash + self.positions_value(quotes)
    }

    pub fn positions_value(&self, quotes: &Quotes) -> f64 {
        self.positions
            .iter()
            .map(|p| p.market_value(quotes.get(&p.ticker).copied()))
            .sum()
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn get(&self, ticker: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.ticker == ticker)
    }

    pub fn is_held(&self, ticker: &str) -> bool {
        self.get(ticker).is_some()
    }

    /// Whether `ticker` has ever been opened in this run.
    pub fn was_recommended(&self, ticker: &str) -> bool {
        self.recommended.contains(ticker)
    }

    pub fn recommended(&self) -> &BTreeSet<String> {
        &self.recommended
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<TradeRecord> {
        self.trades
    }
}
