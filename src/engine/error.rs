//! Engine error types.

use crate::engine::order::OrderTypeTag;
use crate::engine::storage::StorageError;
use chrono::{DateTime, Utc};
use std::fmt;

/// Errors surfaced by the trading engine.
///
/// Every non-storage variant is local to the operation that raised it and
/// leaves engine state unchanged; storage failures abort the operation and
/// propagate.
#[derive(Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// Order quantity is not a strictly positive finite number.
    InvalidQuantity {
        /// The rejected quantity.
        quantity: f64,
    },

    /// A priced order type arrived without its limit price.
    MissingPrice {
        /// The order type that requires a price.
        order_type: OrderTypeTag,
    },

    /// Limit price is not a strictly positive finite number.
    InvalidPrice {
        /// The rejected price.
        price: f64,
    },

    /// An unpriced order type arrived carrying a limit price.
    UnexpectedPrice {
        /// The order type that must not carry a price.
        order_type: OrderTypeTag,
    },

    /// A stop order type arrived without its trigger price.
    MissingStopPrice {
        /// The order type that requires a stop price.
        order_type: OrderTypeTag,
    },

    /// Stop price is not a strictly positive finite number.
    InvalidStopPrice {
        /// The rejected stop price.
        stop_price: f64,
    },

    /// A non-stop order type arrived carrying a stop price.
    UnexpectedStopPrice {
        /// The order type that must not carry a stop price.
        order_type: OrderTypeTag,
    },

    /// A required field was empty or absent.
    MissingField(&'static str),

    /// Ticker is not part of the reference-data universe.
    UnknownTicker(String),

    /// Submission timestamp lies strictly in the future.
    TimestampInFuture {
        /// The rejected timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Account does not exist and the store is running in strict mode.
    UnknownAccount(String),

    /// Seller does not hold enough shares to cover the order.
    InsufficientShares {
        /// The selling account.
        account_id: String,
        /// The ticker being sold.
        ticker: String,
        /// Quantity the order asks for.
        requested: f64,
        /// Quantity the account holds.
        held: f64,
    },

    /// Buyer cannot cover the order at the checked price.
    InsufficientFunds {
        /// The buying account.
        account_id: String,
        /// Cash the order requires.
        required: f64,
        /// Cash the account holds.
        available: f64,
    },

    /// Cancel target was not found on the indicated side.
    OrderNotFound(String),

    /// Reversal target was not found in the trade ledger.
    TradeNotFound(String),

    /// Reversal would drive a balance or position negative.
    ReversalConflict {
        /// The trade that could not be reversed.
        trade_id: String,
        /// What the reversal would have violated.
        message: String,
    },

    /// Underlying storage failed; the operation did not happen.
    Storage(StorageError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidQuantity { quantity } => {
                write!(f, "invalid quantity: {quantity} (must be positive)")
            }
            EngineError::MissingPrice { order_type } => {
                write!(f, "{order_type} order requires a positive price")
            }
            EngineError::InvalidPrice { price } => {
                write!(f, "invalid price: {price} (must be positive)")
            }
            EngineError::UnexpectedPrice { order_type } => {
                write!(f, "{order_type} order must not carry a price")
            }
            EngineError::MissingStopPrice { order_type } => {
                write!(f, "{order_type} order requires a positive stop price")
            }
            EngineError::InvalidStopPrice { stop_price } => {
                write!(f, "invalid stop price: {stop_price} (must be positive)")
            }
            EngineError::UnexpectedStopPrice { order_type } => {
                write!(f, "{order_type} order must not carry a stop price")
            }
            EngineError::MissingField(field) => write!(f, "missing required field: {field}"),
            EngineError::UnknownTicker(ticker) => write!(f, "unknown ticker: {ticker}"),
            EngineError::TimestampInFuture { timestamp } => {
                write!(f, "timestamp {timestamp} lies in the future")
            }
            EngineError::UnknownAccount(account_id) => {
                write!(f, "unknown account: {account_id}")
            }
            EngineError::InsufficientShares {
                account_id,
                ticker,
                requested,
                held,
            } => {
                write!(
                    f,
                    "account {account_id} holds {held} {ticker} but the order needs {requested}"
                )
            }
            EngineError::InsufficientFunds {
                account_id,
                required,
                available,
            } => {
                write!(
                    f,
                    "account {account_id} has {available} but the order needs {required}"
                )
            }
            EngineError::OrderNotFound(order_id) => write!(f, "order not found: {order_id}"),
            EngineError::TradeNotFound(trade_id) => write!(f, "trade not found: {trade_id}"),
            EngineError::ReversalConflict { trade_id, message } => {
                write!(f, "cannot reverse trade {trade_id}: {message}")
            }
            EngineError::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        EngineError::Storage(err)
    }
}
