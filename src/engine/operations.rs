//! The engine facade: order lifecycle, queries, reversal, and reset.
//!
//! [`Engine`] owns all mutable state (reference data, accounts, ledger,
//! books) and is the single entry point a shell or test drives. All
//! operations run to completion on the calling thread; persistence happens
//! before each mutating call returns.

use crate::engine::account::{Account, AccountStore};
use crate::engine::book::BookState;
use crate::engine::config::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::ledger::{ExecutedTrade, TradeLedger};
use crate::engine::order::{Order, OrderTypeTag, Side};
use crate::engine::reference::ReferenceData;
use crate::engine::snapshot::BookSnapshot;
use crate::engine::storage::{JsonFileStore, MemoryStore, StateStore};
use crate::engine::validation;
use crate::utils::{Clock, SystemClock, epoch_seconds};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// A submission as the shell hands it over: untyped prices, unchecked
/// fields. [`Engine::submit_order`] validates it into a typed [`Order`].
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Buy or sell.
    pub action: Side,
    /// Submitting account.
    pub account_id: String,
    /// Ticker symbol.
    pub ticker: String,
    /// Requested quantity.
    pub quantity: f64,
    /// Requested order type.
    pub order_type: OrderTypeTag,
    /// Limit price, when the type takes one.
    pub price: Option<f64>,
    /// Trigger price, when the type takes one.
    pub stop_price: Option<f64>,
    /// Submission time as reported by the caller.
    pub timestamp: DateTime<Utc>,
}

/// The simulated exchange: books, accounts, ledger, and matching.
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) reference: ReferenceData,
    pub(super) accounts: AccountStore,
    pub(super) ledger: TradeLedger,
    pub(super) books: BookState,
    pub(super) store: Arc<dyn StateStore>,
    pub(super) clock: Arc<dyn Clock>,
    order_seq: u64,
}

impl Engine {
    /// Builds an engine over an explicit store, clock, and ticker universe,
    /// loading any persisted state.
    ///
    /// Orders that were persisted without an id are back-filled and the
    /// repaired book file is written back immediately.
    ///
    /// # Errors
    /// Propagates storage failures from the initial load.
    pub fn new(
        config: EngineConfig,
        reference: ReferenceData,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        let accounts = AccountStore::load(
            Arc::clone(&store),
            config.default_balance,
            config.strict_accounts,
        )?;
        let ledger = TradeLedger::load(Arc::clone(&store))?;
        let (books, backfilled) = BookState::restore(store.load_books()?);
        let engine = Self {
            config,
            reference,
            accounts,
            ledger,
            books,
            store,
            clock,
            order_seq: 0,
        };
        if backfilled > 0 {
            info!("back-filled {} order ids on load", backfilled);
            engine.persist_books()?;
        }
        Ok(engine)
    }

    /// Opens an engine over JSON files in `dir` with the default universe,
    /// config, and wall clock.
    ///
    /// # Errors
    /// Propagates storage failures from directory creation or the load.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        Self::open_with_config(dir, EngineConfig::default())
    }

    /// Opens an engine over JSON files in `dir` with an explicit config.
    ///
    /// # Errors
    /// Propagates storage failures from directory creation or the load.
    pub fn open_with_config(
        dir: impl AsRef<Path>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let store = JsonFileStore::new(dir)?;
        Self::new(
            config,
            ReferenceData::default_universe(),
            Arc::new(store),
            Arc::new(SystemClock),
        )
    }

    /// An engine over in-memory storage, for tests and demos.
    ///
    /// # Errors
    /// Never fails in practice; the signature matches [`Engine::new`].
    pub fn in_memory(config: EngineConfig) -> Result<Self, EngineError> {
        Self::new(
            config,
            ReferenceData::default_universe(),
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
        )
    }

    // ─── Order lifecycle ────────────────────────────────────────────────

    /// Validates and books a new order, returning its assigned id.
    ///
    /// Stop orders park in their side-queue. Anything else enters the
    /// resting book and the matching loop runs immediately, which may fill
    /// the order (fully or partially), trigger stops, and cascade further
    /// fills before this call returns.
    ///
    /// # Errors
    /// Any of the validation rejections (quantity, price consistency,
    /// ticker, position coverage, timestamp), or a storage failure.
    pub fn submit_order(&mut self, request: OrderRequest) -> Result<String, EngineError> {
        let now = self.clock.now();
        let kind = validation::validate_submission(
            &request,
            &self.reference,
            &mut self.accounts,
            &self.books,
            &self.config,
            now,
        )?;
        let order_id = self.next_order_id(&request);
        let ticker = request.ticker.clone();
        let order = Order {
            order_id: order_id.clone(),
            account_id: request.account_id,
            ticker: request.ticker,
            action: request.action,
            kind,
            quantity: request.quantity,
            timestamp: request.timestamp,
        };
        trace!("accepted order {}", order);

        if kind.is_stop() {
            self.books.insert_stop(order);
            self.persist_books()?;
        } else {
            self.books.insert_resting(order);
            self.persist_books()?;
            self.run_matching(&ticker)?;
        }
        Ok(order_id)
    }

    /// Cancels a resting order, or a stop order when `is_stop` is set.
    ///
    /// Returns the removed order. Cancellation produces no trade record.
    ///
    /// # Errors
    /// [`EngineError::OrderNotFound`] when no order matches
    /// `(account_id, order_id)` on the indicated side.
    pub fn cancel_order(
        &mut self,
        account_id: &str,
        order_id: &str,
        is_stop: bool,
    ) -> Result<Order, EngineError> {
        let Some(order) = self.books.take(account_id, order_id, is_stop) else {
            return Err(EngineError::OrderNotFound(order_id.to_string()));
        };
        debug!("cancelled order {}", order);
        self.persist_books()?;
        Ok(order)
    }

    /// Reverses an executed trade: cash returns to the buyer, shares to the
    /// seller, and the trade leaves the ledger. The originating orders are
    /// not re-created.
    ///
    /// # Errors
    /// [`EngineError::TradeNotFound`] for an unknown id;
    /// [`EngineError::ReversalConflict`] when undoing the trade would drive
    /// a balance or position negative (ledger and accounts unchanged).
    pub fn reverse_trade(&mut self, trade_id: &str) -> Result<ExecutedTrade, EngineError> {
        let Some(trade) = self.ledger.get(trade_id).cloned() else {
            return Err(EngineError::TradeNotFound(trade_id.to_string()));
        };
        let mut buyer = self.accounts.get(&trade.buy_account_id)?;
        let mut seller = self.accounts.get(&trade.sell_account_id)?;
        let notional = trade.notional();

        let held = buyer.position(&trade.ticker);
        if held < trade.quantity {
            return Err(EngineError::ReversalConflict {
                trade_id: trade_id.to_string(),
                message: format!(
                    "buyer {} holds {} {} but the reversal removes {}",
                    trade.buy_account_id, held, trade.ticker, trade.quantity
                ),
            });
        }
        if seller.balance < notional {
            return Err(EngineError::ReversalConflict {
                trade_id: trade_id.to_string(),
                message: format!(
                    "seller {} has {} but the reversal removes {}",
                    trade.sell_account_id, seller.balance, notional
                ),
            });
        }

        buyer.balance += notional;
        buyer.debit_shares(&trade.ticker, trade.quantity);
        seller.balance -= notional;
        seller.credit_shares(&trade.ticker, trade.quantity);

        self.accounts.update(&trade.buy_account_id, buyer)?;
        self.accounts.update(&trade.sell_account_id, seller)?;
        info!("reversed trade {}", trade_id);
        self.ledger.remove(trade_id)
    }

    /// Drops all books and trades (in memory and on disk) and resets every
    /// known account to `default_balance` with no positions.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub fn clear_all(&mut self, default_balance: f64) -> Result<(), EngineError> {
        info!("clearing all state; accounts reset to {}", default_balance);
        self.books = BookState::default();
        self.ledger.clear();
        self.store.clear()?;
        self.accounts.reset_all(default_balance)
    }

    // ─── Queries ────────────────────────────────────────────────────────

    /// Snapshot of the resting books, optionally restricted to one ticker.
    #[must_use]
    pub fn orders(&self, ticker: Option<&str>) -> BookSnapshot {
        let mut snapshot = self.books.snapshot();
        snapshot.stop_buy_orders.clear();
        snapshot.stop_sell_orders.clear();
        match ticker {
            Some(ticker) => snapshot.for_ticker(ticker),
            None => snapshot,
        }
    }

    /// Snapshot of the stop side-queues, optionally restricted to one
    /// ticker.
    #[must_use]
    pub fn stop_orders(&self, ticker: Option<&str>) -> BookSnapshot {
        let mut snapshot = self.books.snapshot();
        snapshot.buy_orders.clear();
        snapshot.sell_orders.clear();
        match ticker {
            Some(ticker) => snapshot.for_ticker(ticker),
            None => snapshot,
        }
    }

    /// All executed trades, oldest first.
    #[must_use]
    pub fn trades(&self) -> &[ExecutedTrade] {
        self.ledger.list()
    }

    /// The account for `account_id`, auto-created unless strict mode is on.
    ///
    /// # Errors
    /// [`EngineError::UnknownAccount`] in strict mode.
    pub fn account(&mut self, account_id: &str) -> Result<Account, EngineError> {
        self.accounts.get(account_id)
    }

    /// Read access to the account store, for diagnostics.
    #[must_use]
    pub fn account_store(&self) -> &AccountStore {
        &self.accounts
    }

    /// Best resting limit prices: `(bid, ask)`.
    #[must_use]
    pub fn best_bid_ask(&self, ticker: &str) -> (Option<f64>, Option<f64>) {
        (self.books.best_bid(ticker), self.books.best_ask(ticker))
    }

    /// The price an `action` order would reasonably see on `ticker`:
    /// best opposite limit, else last trade price, else the seed price.
    /// `None` only for tickers outside the universe.
    #[must_use]
    pub fn best_price(&self, action: Side, ticker: &str) -> Option<f64> {
        self.books.best_price(action, ticker, &self.reference)
    }

    /// Price of the most recent fill on `ticker` this run.
    #[must_use]
    pub fn last_trade_price(&self, ticker: &str) -> Option<f64> {
        self.books.last_trade_price(ticker)
    }

    /// The ticker universe this engine trades.
    #[must_use]
    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    // ─── Internals ──────────────────────────────────────────────────────

    /// Canonical id plus a monotonic counter, since epoch-second timestamps
    /// alone collide for rapid submissions.
    fn next_order_id(&mut self, request: &OrderRequest) -> String {
        self.order_seq += 1;
        format!(
            "{}_{}_{}_{}",
            request.account_id,
            request.ticker,
            epoch_seconds(&request.timestamp),
            self.order_seq
        )
    }

    pub(super) fn persist_books(&self) -> Result<(), EngineError> {
        self.store.save_books(&self.books.snapshot())?;
        Ok(())
    }
}
