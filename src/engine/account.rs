//! Accounts: cash balances and share positions, persisted on every mutation.

use crate::engine::error::EngineError;
use crate::engine::storage::StateStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// A participant account: cash plus per-ticker share positions.
///
/// Positions hold strictly positive quantities; a position that reaches
/// exactly zero drops its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Cash balance, never negative.
    pub balance: f64,
    /// Shares held, keyed by ticker.
    #[serde(default)]
    pub positions: BTreeMap<String, f64>,
}

impl Account {
    /// A fresh account with `balance` cash and no positions.
    #[must_use]
    pub fn new(balance: f64) -> Self {
        Self {
            balance,
            positions: BTreeMap::new(),
        }
    }

    /// Shares held in `ticker`; zero when no position exists.
    #[must_use]
    pub fn position(&self, ticker: &str) -> f64 {
        self.positions.get(ticker).copied().unwrap_or(0.0)
    }

    /// Adds `quantity` shares of `ticker`.
    pub(crate) fn credit_shares(&mut self, ticker: &str, quantity: f64) {
        *self.positions.entry(ticker.to_string()).or_insert(0.0) += quantity;
    }

    /// Removes `quantity` shares of `ticker`, dropping the key at zero.
    ///
    /// Callers check coverage first; this only applies the arithmetic.
    pub(crate) fn debit_shares(&mut self, ticker: &str, quantity: f64) {
        if let Some(held) = self.positions.get_mut(ticker) {
            *held -= quantity;
            if *held == 0.0 {
                self.positions.remove(ticker);
            }
        }
    }
}

/// All accounts, kept consistent with the persisted accounts file.
///
/// Every mutating call persists before returning, so the file always equals
/// the in-memory map at quiescent points.
#[derive(Debug)]
pub struct AccountStore {
    accounts: BTreeMap<String, Account>,
    store: Arc<dyn StateStore>,
    default_balance: f64,
    strict: bool,
}

impl AccountStore {
    /// Loads accounts from `store`. A missing file yields an empty map.
    pub(crate) fn load(
        store: Arc<dyn StateStore>,
        default_balance: f64,
        strict: bool,
    ) -> Result<Self, EngineError> {
        let accounts = store.load_accounts()?;
        Ok(Self {
            accounts,
            store,
            default_balance,
            strict,
        })
    }

    /// Returns the account for `account_id`.
    ///
    /// Unknown accounts are created with the default balance and persisted
    /// immediately, unless strict mode is on.
    ///
    /// # Errors
    /// [`EngineError::UnknownAccount`] in strict mode.
    pub fn get(&mut self, account_id: &str) -> Result<Account, EngineError> {
        if let Some(account) = self.accounts.get(account_id) {
            return Ok(account.clone());
        }
        if self.strict {
            return Err(EngineError::UnknownAccount(account_id.to_string()));
        }
        debug!(
            "auto-creating account {} with balance {}",
            account_id, self.default_balance
        );
        let account = Account::new(self.default_balance);
        self.accounts
            .insert(account_id.to_string(), account.clone());
        self.persist()?;
        Ok(account)
    }

    /// Replaces the stored record for `account_id` and persists.
    pub fn update(&mut self, account_id: &str, account: Account) -> Result<(), EngineError> {
        trace!(
            "updating account {}: balance {}, {} positions",
            account_id,
            account.balance,
            account.positions.len()
        );
        self.accounts.insert(account_id.to_string(), account);
        self.persist()
    }

    /// All accounts, for diagnostics.
    pub fn all(&self) -> impl Iterator<Item = (&str, &Account)> {
        self.accounts
            .iter()
            .map(|(id, account)| (id.as_str(), account))
    }

    /// Whether `account_id` exists without creating it.
    #[must_use]
    pub fn contains(&self, account_id: &str) -> bool {
        self.accounts.contains_key(account_id)
    }

    /// Resets every known account to `default_balance` with no positions
    /// and persists the result.
    pub(crate) fn reset_all(&mut self, default_balance: f64) -> Result<(), EngineError> {
        for account in self.accounts.values_mut() {
            *account = Account::new(default_balance);
        }
        self.persist()
    }

    fn persist(&self) -> Result<(), EngineError> {
        self.store.save_accounts(&self.accounts)?;
        Ok(())
    }
}
