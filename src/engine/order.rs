//! Order model: sides, order kinds, and the on-disk record shape.
//!
//! Orders carry their type-specific prices in the [`OrderKind`] variant, so
//! the rest of the engine never has to reason about "a limit order without a
//! price": such a record cannot be constructed. Serialization goes through
//! the flat [`OrderRecord`] bridge so persisted files keep the
//! `price`/`stop_price` nullable-column shape.

use crate::engine::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way an order trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Take shares in, pay cash out.
    Buy,
    /// Give shares out, take cash in.
    Sell,
}

impl Side {
    /// The opposing side.
    #[must_use]
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Wire-level order type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderTypeTag {
    /// Execute at the best available price.
    Market,
    /// Execute at `price` or better.
    Limit,
    /// Becomes a market order once the last trade price crosses `stop_price`.
    StopMarket,
    /// Becomes a limit order once the last trade price crosses `stop_price`.
    StopLimit,
}

impl fmt::Display for OrderTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderTypeTag::Market => write!(f, "market"),
            OrderTypeTag::Limit => write!(f, "limit"),
            OrderTypeTag::StopMarket => write!(f, "stop_market"),
            OrderTypeTag::StopLimit => write!(f, "stop_limit"),
        }
    }
}

/// Type-specific order payload.
///
/// The variant carries exactly the prices its type requires, which makes
/// validation total: there is no representable "stop order without a stop
/// price".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderKind {
    /// No price constraint.
    Market,
    /// Resting limit order at `price`.
    Limit {
        /// The limit price.
        price: f64,
    },
    /// Stop order that converts to a market order on trigger.
    StopMarket {
        /// The trigger price.
        stop_price: f64,
    },
    /// Stop order that converts to a limit order on trigger.
    StopLimit {
        /// The trigger price.
        stop_price: f64,
        /// The post-trigger limit price.
        price: f64,
    },
}

impl OrderKind {
    /// The wire-level discriminant for this kind.
    #[must_use]
    pub fn tag(&self) -> OrderTypeTag {
        match self {
            OrderKind::Market => OrderTypeTag::Market,
            OrderKind::Limit { .. } => OrderTypeTag::Limit,
            OrderKind::StopMarket { .. } => OrderTypeTag::StopMarket,
            OrderKind::StopLimit { .. } => OrderTypeTag::StopLimit,
        }
    }

    /// The limit price, when this kind carries one.
    #[must_use]
    pub fn limit_price(&self) -> Option<f64> {
        match self {
            OrderKind::Limit { price } | OrderKind::StopLimit { price, .. } => Some(*price),
            OrderKind::Market | OrderKind::StopMarket { .. } => None,
        }
    }

    /// The trigger price, when this kind carries one.
    #[must_use]
    pub fn stop_price(&self) -> Option<f64> {
        match self {
            OrderKind::StopMarket { stop_price } | OrderKind::StopLimit { stop_price, .. } => {
                Some(*stop_price)
            }
            OrderKind::Market | OrderKind::Limit { .. } => None,
        }
    }

    /// Whether this order waits in a stop side-queue until triggered.
    #[must_use]
    #[inline]
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            OrderKind::StopMarket { .. } | OrderKind::StopLimit { .. }
        )
    }

    /// The resting kind a stop order converts to when triggered.
    ///
    /// `StopMarket` drops both prices; `StopLimit` keeps its limit price.
    /// Non-stop kinds convert to themselves.
    #[must_use]
    pub fn triggered(&self) -> OrderKind {
        match *self {
            OrderKind::StopMarket { .. } => OrderKind::Market,
            OrderKind::StopLimit { price, .. } => OrderKind::Limit { price },
            other => other,
        }
    }
}

/// A single order, resting or stopped.
///
/// `quantity` is the remaining quantity and is decremented by fills; an
/// order whose quantity reaches exactly zero leaves the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OrderRecord", into = "OrderRecord")]
pub struct Order {
    /// Unique within an engine run; assigned on first entry into the book.
    pub order_id: String,
    /// Owning account.
    pub account_id: String,
    /// Ticker symbol from the reference-data universe.
    pub ticker: String,
    /// Buy or sell.
    pub action: Side,
    /// Type-specific payload.
    pub kind: OrderKind,
    /// Remaining quantity, strictly positive while in the book.
    pub quantity: f64,
    /// Arrival time; preserved across stop conversion so time priority holds.
    pub timestamp: DateTime<Utc>,
}

impl Order {
    /// The wire-level order type of this order.
    #[must_use]
    #[inline]
    pub fn order_type(&self) -> OrderTypeTag {
        self.kind.tag()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} x{}",
            self.order_id,
            self.action,
            self.order_type(),
            self.ticker,
            self.quantity
        )
    }
}

/// Flat serialization shape for [`Order`].
///
/// Matches the persisted file format: `price` and `stop_price` are nullable
/// columns, and `order_id` may be absent in hand-edited or legacy files (it
/// is back-filled on load).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OrderRecord {
    #[serde(default)]
    pub order_id: String,
    pub account_id: String,
    pub ticker: String,
    pub action: Side,
    pub order_type: OrderTypeTag,
    pub quantity: f64,
    pub price: Option<f64>,
    pub stop_price: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl From<Order> for OrderRecord {
    fn from(order: Order) -> Self {
        OrderRecord {
            price: order.kind.limit_price(),
            stop_price: order.kind.stop_price(),
            order_type: order.kind.tag(),
            order_id: order.order_id,
            account_id: order.account_id,
            ticker: order.ticker,
            action: order.action,
            quantity: order.quantity,
            timestamp: order.timestamp,
        }
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = EngineError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let kind = kind_from_parts(record.order_type, record.price, record.stop_price)?;
        if !record.quantity.is_finite() || record.quantity <= 0.0 {
            return Err(EngineError::InvalidQuantity {
                quantity: record.quantity,
            });
        }
        Ok(Order {
            order_id: record.order_id,
            account_id: record.account_id,
            ticker: record.ticker,
            action: record.action,
            kind,
            quantity: record.quantity,
            timestamp: record.timestamp,
        })
    }
}

/// Builds an [`OrderKind`] from the flat `(order_type, price, stop_price)`
/// triple, rejecting every inconsistent combination.
pub(crate) fn kind_from_parts(
    order_type: OrderTypeTag,
    price: Option<f64>,
    stop_price: Option<f64>,
) -> Result<OrderKind, EngineError> {
    let require_price = |price: Option<f64>| -> Result<f64, EngineError> {
        match price {
            None => Err(EngineError::MissingPrice { order_type }),
            Some(p) if !p.is_finite() || p <= 0.0 => Err(EngineError::InvalidPrice { price: p }),
            Some(p) => Ok(p),
        }
    };
    let require_stop = |stop: Option<f64>| -> Result<f64, EngineError> {
        match stop {
            None => Err(EngineError::MissingStopPrice { order_type }),
            Some(p) if !p.is_finite() || p <= 0.0 => {
                Err(EngineError::InvalidStopPrice { stop_price: p })
            }
            Some(p) => Ok(p),
        }
    };

    match order_type {
        OrderTypeTag::Market => {
            if price.is_some() {
                return Err(EngineError::UnexpectedPrice { order_type });
            }
            if stop_price.is_some() {
                return Err(EngineError::UnexpectedStopPrice { order_type });
            }
            Ok(OrderKind::Market)
        }
        OrderTypeTag::Limit => {
            if stop_price.is_some() {
                return Err(EngineError::UnexpectedStopPrice { order_type });
            }
            Ok(OrderKind::Limit {
                price: require_price(price)?,
            })
        }
        OrderTypeTag::StopMarket => {
            if price.is_some() {
                return Err(EngineError::UnexpectedPrice { order_type });
            }
            Ok(OrderKind::StopMarket {
                stop_price: require_stop(stop_price)?,
            })
        }
        OrderTypeTag::StopLimit => Ok(OrderKind::StopLimit {
            stop_price: require_stop(stop_price)?,
            price: require_price(price)?,
        }),
    }
}
