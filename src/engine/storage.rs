//! Persistent state repository.
//!
//! The three persisted aggregates (books, accounts, trades) sit behind the
//! [`StateStore`] trait so the engine core never touches the filesystem
//! directly. [`JsonFileStore`] is the production implementation (one JSON
//! file per aggregate, written whole via temp-file-then-rename);
//! [`MemoryStore`] backs tests.

use crate::engine::account::Account;
use crate::engine::ledger::ExecutedTrade;
use crate::engine::snapshot::BookSnapshot;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::trace;

/// File name for the unmatched-order books aggregate.
pub const BOOKS_FILE: &str = "unmatched_orders.json";
/// File name for the executed-trades aggregate.
pub const TRADES_FILE: &str = "trades.json";
/// File name for the accounts aggregate.
pub const ACCOUNTS_FILE: &str = "accounts.json";

/// Errors raised by a [`StateStore`] implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Reading or writing a persisted file failed.
    #[error("storage I/O error at {}: {message}", .path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error message.
        message: String,
    },

    /// An aggregate could not be serialized.
    #[error("failed to encode {what}: {message}")]
    Encode {
        /// Which aggregate failed.
        what: &'static str,
        /// The underlying serialization error message.
        message: String,
    },

    /// A persisted file could not be deserialized.
    #[error("failed to decode {}: {message}", .path.display())]
    Decode {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying deserialization error message.
        message: String,
    },
}

/// Load/save access to the three persisted aggregates.
///
/// A missing aggregate loads as empty state. After any successful `save_*`
/// the persisted form equals the argument; there is no caching layer.
pub trait StateStore: std::fmt::Debug {
    /// Loads the unmatched-order books.
    fn load_books(&self) -> Result<BookSnapshot, StorageError>;

    /// Persists the unmatched-order books.
    fn save_books(&self, books: &BookSnapshot) -> Result<(), StorageError>;

    /// Loads all accounts.
    fn load_accounts(&self) -> Result<BTreeMap<String, Account>, StorageError>;

    /// Persists all accounts.
    fn save_accounts(&self, accounts: &BTreeMap<String, Account>) -> Result<(), StorageError>;

    /// Loads the executed-trade log.
    fn load_trades(&self) -> Result<Vec<ExecutedTrade>, StorageError>;

    /// Persists the executed-trade log.
    fn save_trades(&self, trades: &[ExecutedTrade]) -> Result<(), StorageError>;

    /// Removes the persisted books and trades, so the next load sees empty
    /// state. Accounts are left in place; `clear_all` rewrites them.
    fn clear(&self) -> Result<(), StorageError>;
}

// ─── JSON files ─────────────────────────────────────────────────────────────

/// One JSON file per aggregate under a data directory.
///
/// Saves write the whole file to a `.tmp` sibling and rename it into place,
/// so a crash mid-write leaves the previous consistent file intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] when the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StorageError::Io {
            path: dir.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { dir })
    }

    /// The directory this store writes into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn read<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StorageError> {
        let path = self.path(file);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => {
                return Err(StorageError::Io {
                    path,
                    message: e.to_string(),
                });
            }
        };
        serde_json::from_str(&text).map_err(|e| StorageError::Decode {
            path,
            message: e.to_string(),
        })
    }

    fn write<T: Serialize>(&self, file: &str, what: &'static str, value: &T) -> Result<(), StorageError> {
        let path = self.path(file);
        let text = serde_json::to_string_pretty(value).map_err(|e| StorageError::Encode {
            what,
            message: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| StorageError::Io {
            path: tmp.clone(),
            message: e.to_string(),
        })?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        trace!("persisted {} to {}", what, path.display());
        Ok(())
    }

    fn remove(&self, file: &str) -> Result<(), StorageError> {
        let path = self.path(file);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io {
                path,
                message: e.to_string(),
            }),
        }
    }
}

impl StateStore for JsonFileStore {
    fn load_books(&self) -> Result<BookSnapshot, StorageError> {
        self.read(BOOKS_FILE)
    }

    fn save_books(&self, books: &BookSnapshot) -> Result<(), StorageError> {
        self.write(BOOKS_FILE, "books", books)
    }

    fn load_accounts(&self) -> Result<BTreeMap<String, Account>, StorageError> {
        self.read(ACCOUNTS_FILE)
    }

    fn save_accounts(&self, accounts: &BTreeMap<String, Account>) -> Result<(), StorageError> {
        self.write(ACCOUNTS_FILE, "accounts", accounts)
    }

    fn load_trades(&self) -> Result<Vec<ExecutedTrade>, StorageError> {
        self.read(TRADES_FILE)
    }

    fn save_trades(&self, trades: &[ExecutedTrade]) -> Result<(), StorageError> {
        self.write(TRADES_FILE, "trades", &trades)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.remove(BOOKS_FILE)?;
        self.remove(TRADES_FILE)
    }
}

// ─── In-memory ──────────────────────────────────────────────────────────────

/// In-memory [`StateStore`] for tests; never fails.
#[derive(Debug, Default)]
pub struct MemoryStore {
    books: Mutex<BookSnapshot>,
    accounts: Mutex<BTreeMap<String, Account>>,
    trades: Mutex<Vec<ExecutedTrade>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load_books(&self) -> Result<BookSnapshot, StorageError> {
        Ok(self.books.lock().expect("store lock").clone())
    }

    fn save_books(&self, books: &BookSnapshot) -> Result<(), StorageError> {
        *self.books.lock().expect("store lock") = books.clone();
        Ok(())
    }

    fn load_accounts(&self) -> Result<BTreeMap<String, Account>, StorageError> {
        Ok(self.accounts.lock().expect("store lock").clone())
    }

    fn save_accounts(&self, accounts: &BTreeMap<String, Account>) -> Result<(), StorageError> {
        *self.accounts.lock().expect("store lock") = accounts.clone();
        Ok(())
    }

    fn load_trades(&self) -> Result<Vec<ExecutedTrade>, StorageError> {
        Ok(self.trades.lock().expect("store lock").clone())
    }

    fn save_trades(&self, trades: &[ExecutedTrade]) -> Result<(), StorageError> {
        *self.trades.lock().expect("store lock") = trades.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.books.lock().expect("store lock") = BookSnapshot::default();
        self.trades.lock().expect("store lock").clear();
        Ok(())
    }
}
