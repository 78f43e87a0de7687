//! Submit-time validation.
//!
//! Every rejection reason is checked here, before any state changes: a
//! rejected submission leaves books, accounts, and files untouched.

use crate::engine::account::AccountStore;
use crate::engine::book::BookState;
use crate::engine::config::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::operations::OrderRequest;
use crate::engine::order::{OrderKind, Side, kind_from_parts};
use crate::engine::reference::ReferenceData;
use chrono::{DateTime, Utc};

/// Validates a submission and returns its typed [`OrderKind`].
///
/// Checks, in order: required fields, quantity, ticker, price/stop-price
/// consistency with the order type, timestamp not in the future, seller
/// position coverage (no shorting), and, only when
/// [`EngineConfig::check_funds_at_submit`] is set, buyer cash coverage.
///
/// In auto-create mode the position/funds checks may create the account,
/// matching the historical first-touch behavior.
pub(crate) fn validate_submission(
    request: &OrderRequest,
    reference: &ReferenceData,
    accounts: &mut AccountStore,
    books: &BookState,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<OrderKind, EngineError> {
    if request.account_id.is_empty() {
        return Err(EngineError::MissingField("account_id"));
    }
    if request.ticker.is_empty() {
        return Err(EngineError::MissingField("ticker"));
    }
    if !request.quantity.is_finite() || request.quantity <= 0.0 {
        return Err(EngineError::InvalidQuantity {
            quantity: request.quantity,
        });
    }
    if !reference.is_valid_ticker(&request.ticker) {
        return Err(EngineError::UnknownTicker(request.ticker.clone()));
    }
    let kind = kind_from_parts(request.order_type, request.price, request.stop_price)?;
    if request.timestamp > now {
        return Err(EngineError::TimestampInFuture {
            timestamp: request.timestamp,
        });
    }

    match request.action {
        Side::Sell => {
            let account = accounts.get(&request.account_id)?;
            let held = account.position(&request.ticker);
            if held < request.quantity {
                return Err(EngineError::InsufficientShares {
                    account_id: request.account_id.clone(),
                    ticker: request.ticker.clone(),
                    requested: request.quantity,
                    held,
                });
            }
        }
        Side::Buy => {
            if config.check_funds_at_submit {
                let account = accounts.get(&request.account_id)?;
                // Priced orders check against their own limit; market orders
                // against the best-price fallback chain, which always
                // resolves for a valid ticker.
                let price = kind
                    .limit_price()
                    .or_else(|| books.best_price(Side::Buy, &request.ticker, reference))
                    .unwrap_or_default();
                let required = request.quantity * price;
                if account.balance < required {
                    return Err(EngineError::InsufficientFunds {
                        account_id: request.account_id.clone(),
                        required,
                        available: account.balance,
                    });
                }
            } else {
                // First-touch account creation still happens on buys in
                // auto-create mode, as the original simulator did.
                accounts.get(&request.account_id)?;
            }
        }
    }

    Ok(kind)
}
