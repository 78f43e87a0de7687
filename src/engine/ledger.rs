//! Executed-trade ledger: append-only, persisted, reversible entry by entry.

use crate::engine::error::EngineError;
use crate::engine::storage::StateStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// One executed fill between a buyer and a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedTrade {
    /// Globally unique opaque id (uuid v4), assigned by the ledger.
    pub trade_id: String,
    /// Ticker the fill occurred on.
    pub ticker: String,
    /// Execution price.
    pub price: f64,
    /// Filled quantity.
    pub quantity: f64,
    /// The buying account.
    pub buy_account_id: String,
    /// The selling account.
    pub sell_account_id: String,
    /// When the fill executed.
    pub timestamp: DateTime<Utc>,
}

impl ExecutedTrade {
    /// Cash that changed hands: `price × quantity`.
    #[must_use]
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

/// A fill reported by the matching engine, before it has a trade id.
#[derive(Debug, Clone)]
pub struct Fill {
    /// Ticker the fill occurred on.
    pub ticker: String,
    /// Execution price.
    pub price: f64,
    /// Filled quantity.
    pub quantity: f64,
    /// The buying account.
    pub buy_account_id: String,
    /// The selling account.
    pub sell_account_id: String,
    /// When the fill executed.
    pub timestamp: DateTime<Utc>,
}

/// The persisted append-only trade log.
#[derive(Debug)]
pub struct TradeLedger {
    trades: Vec<ExecutedTrade>,
    store: Arc<dyn StateStore>,
}

impl TradeLedger {
    /// Loads the ledger from `store`. A missing file yields an empty log.
    pub(crate) fn load(store: Arc<dyn StateStore>) -> Result<Self, EngineError> {
        let trades = store.load_trades()?;
        Ok(Self { trades, store })
    }

    /// Assigns a fresh trade id to `fill`, appends it, and persists.
    ///
    /// Returns the new trade id.
    pub fn record(&mut self, fill: Fill) -> Result<String, EngineError> {
        let trade_id = Uuid::new_v4().to_string();
        debug!(
            "recording trade {}: {} x{} @ {} ({} -> {})",
            trade_id, fill.ticker, fill.quantity, fill.price, fill.sell_account_id,
            fill.buy_account_id
        );
        self.trades.push(ExecutedTrade {
            trade_id: trade_id.clone(),
            ticker: fill.ticker,
            price: fill.price,
            quantity: fill.quantity,
            buy_account_id: fill.buy_account_id,
            sell_account_id: fill.sell_account_id,
            timestamp: fill.timestamp,
        });
        self.persist()?;
        Ok(trade_id)
    }

    /// All recorded trades, oldest first.
    #[must_use]
    pub fn list(&self) -> &[ExecutedTrade] {
        &self.trades
    }

    /// Looks up a trade by id.
    #[must_use]
    pub fn get(&self, trade_id: &str) -> Option<&ExecutedTrade> {
        self.trades.iter().find(|trade| trade.trade_id == trade_id)
    }

    /// Removes a trade by id and persists.
    ///
    /// # Errors
    /// [`EngineError::TradeNotFound`] when no trade carries `trade_id`.
    pub fn remove(&mut self, trade_id: &str) -> Result<ExecutedTrade, EngineError> {
        let index = self
            .trades
            .iter()
            .position(|trade| trade.trade_id == trade_id)
            .ok_or_else(|| EngineError::TradeNotFound(trade_id.to_string()))?;
        let trade = self.trades.remove(index);
        debug!("removed trade {}", trade_id);
        self.persist()?;
        Ok(trade)
    }

    /// Drops every trade from memory. The caller clears persisted state.
    pub(crate) fn clear(&mut self) {
        self.trades.clear();
    }

    fn persist(&self) -> Result<(), EngineError> {
        self.store.save_trades(&self.trades)?;
        Ok(())
    }
}
