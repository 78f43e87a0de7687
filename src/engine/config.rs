//! Engine configuration.

/// Tunable behavior of the [`crate::engine::Engine`].
///
/// The defaults mirror the historical behavior of the simulator: unknown
/// accounts are auto-created with a 10 000.00 starting balance, and buyer
/// funds are only checked at match time (an under-funded buy order rests
/// and is evicted when it would fill).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Starting balance for auto-created accounts and for `clear_all`.
    pub default_balance: f64,

    /// When `true`, accessing an unknown account fails with
    /// `UnknownAccount` instead of creating it.
    pub strict_accounts: bool,

    /// When `true`, buy submissions are rejected up front if the account
    /// cannot cover `quantity × price` (limit price for priced orders,
    /// the best-price fallback chain for market orders). When `false`,
    /// the check happens at match time and evicts the resting order.
    pub check_funds_at_submit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_balance: 10_000.0,
            strict_accounts: false,
            check_funds_at_submit: false,
        }
    }
}

impl EngineConfig {
    /// Sets the starting balance for auto-created accounts.
    #[must_use]
    pub fn with_default_balance(mut self, balance: f64) -> Self {
        self.default_balance = balance;
        self
    }

    /// Enables or disables strict account mode.
    #[must_use]
    pub fn with_strict_accounts(mut self, strict: bool) -> Self {
        self.strict_accounts = strict;
        self
    }

    /// Enables or disables the submit-time buyer funds check.
    #[must_use]
    pub fn with_check_funds_at_submit(mut self, check: bool) -> Self {
        self.check_funds_at_submit = check;
        self
    }
}
