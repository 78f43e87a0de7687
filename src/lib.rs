//! # Simulated Equities Trading Engine
//!
//! A single-process matching engine for a fixed universe of ticker symbols.
//! Buy and sell orders match under price-time priority, participant accounts
//! settle atomically with each fill, unmatched orders and executed trades
//! survive restarts, and stop orders activate when the last traded price
//! crosses their trigger.
//!
//! ## Key Features
//!
//! - **Four order types**: market, limit, stop-market, and stop-limit, with
//!   validation made total by a tagged order-kind type; a limit order
//!   without a price is unrepresentable.
//!
//! - **Price-time priority matching**: market orders ahead of limit orders,
//!   better prices ahead of worse, earlier arrivals ahead of later. Pair
//!   selection is deterministic, so identical inputs produce bit-identical
//!   books, trades, and accounts across runs.
//!
//! - **Self-trade prevention**: a candidate pair whose buyer and seller
//!   share an account never matches; the scan advances to the next pair in
//!   priority order. The check applies uniformly at match time, including
//!   to orders that entered the book through stop activation.
//!
//! - **Cash-covered accounting**: sellers must hold the shares they offer
//!   at submit; buyers are checked for funds at match time and evicted from
//!   the book when they cannot pay (optionally checked at submit instead).
//!   No balance or position ever goes negative.
//!
//! - **Stop activation**: each fill re-scans the ticker's stop side-queues
//!   with inclusive trigger comparison; triggered stops convert to market
//!   or limit orders, keep their original timestamps, and re-enter the
//!   matching loop immediately.
//!
//! - **Trade ledger with reversal**: every fill appends a uuid-identified
//!   trade; a reversal restores both accounts exactly and removes the
//!   record, refusing to run if it would drive anything negative.
//!
//! - **Restart-safe persistence**: books, accounts, and trades live in
//!   three JSON files behind a storage trait (with an in-memory test
//!   implementation). Every mutating operation persists before returning;
//!   files are written whole and renamed into place.
//!
//! ## Scheduling Model
//!
//! Single-threaded and cooperative: every operation runs to completion on
//! the calling thread, and the engine assumes no concurrent mutators.
//! Submissions are processed in arrival order.
//!
//! ## Layout
//!
//! The [`engine`] module holds everything: the [`engine::Engine`] facade,
//! the book/matching/stop core, the account store and trade ledger, and the
//! storage layer. The [`prelude`] re-exports the common surface.

pub mod engine;
pub mod prelude;
mod utils;

pub use engine::{
    Account, AccountStore, BookSnapshot, BookState, Engine, EngineConfig, EngineError,
    ExecutedTrade, Fill, JsonFileStore, MemoryStore, Order, OrderKind, OrderRequest, OrderTypeTag,
    ReferenceData, Side, StateStore, StorageError, TradeLedger,
};
pub use utils::{Clock, FixedClock, SystemClock, epoch_seconds};
