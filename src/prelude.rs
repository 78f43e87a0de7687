//! Prelude module that re-exports commonly used types and traits.
//!
//! Instead of importing each type individually, you can use:
//!
//! ```rust
//! use tradebook_rs::prelude::*;
//! ```
//!
//! This imports everything needed to drive the engine.

// Engine facade and configuration
pub use crate::engine::Engine;
pub use crate::engine::EngineConfig;
pub use crate::engine::EngineError;

// Order model
pub use crate::engine::{Order, OrderKind, OrderRequest, OrderTypeTag, Side};

// Accounts and trades
pub use crate::engine::{Account, AccountStore, ExecutedTrade, Fill, TradeLedger};

// Books and reference data
pub use crate::engine::{BookSnapshot, BookState, ReferenceData};

// Storage backends
pub use crate::engine::{JsonFileStore, MemoryStore, StateStore, StorageError};

// Clock abstraction
pub use crate::utils::{Clock, FixedClock, SystemClock};
