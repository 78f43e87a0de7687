//! Persisted book-file shape and snapshot queries.

use crate::engine::order::Order;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The serialized state of every book: four ticker-keyed order maps.
///
/// This is the exact shape of the unmatched-orders file. Resting queues are
/// written in priority order, so a reloaded snapshot reproduces match order
/// bit for bit. The last trade price is deliberately not part of the file;
/// it resets across restarts and the best-price fallback chain ends at the
/// reference seed price instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Resting buy orders per ticker, best-first.
    #[serde(default)]
    pub buy_orders: BTreeMap<String, Vec<Order>>,

    /// Resting sell orders per ticker, best-first.
    #[serde(default)]
    pub sell_orders: BTreeMap<String, Vec<Order>>,

    /// Untriggered stop-buy orders per ticker.
    #[serde(default)]
    pub stop_buy_orders: BTreeMap<String, Vec<Order>>,

    /// Untriggered stop-sell orders per ticker.
    #[serde(default)]
    pub stop_sell_orders: BTreeMap<String, Vec<Order>>,
}

impl BookSnapshot {
    /// Whether the snapshot holds no orders at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order_count() == 0
    }

    /// Total number of orders across all four maps.
    #[must_use]
    pub fn order_count(&self) -> usize {
        [
            &self.buy_orders,
            &self.sell_orders,
            &self.stop_buy_orders,
            &self.stop_sell_orders,
        ]
        .into_iter()
        .flat_map(BTreeMap::values)
        .map(Vec::len)
        .sum()
    }

    /// The highest resting buy-limit price for `ticker`, if any.
    ///
    /// Market orders carry no price and are excluded.
    #[must_use]
    pub fn best_bid(&self, ticker: &str) -> Option<f64> {
        Self::best_limit(self.buy_orders.get(ticker), f64::max)
    }

    /// The lowest resting sell-limit price for `ticker`, if any.
    #[must_use]
    pub fn best_ask(&self, ticker: &str) -> Option<f64> {
        Self::best_limit(self.sell_orders.get(ticker), f64::min)
    }

    fn best_limit(orders: Option<&Vec<Order>>, pick: fn(f64, f64) -> f64) -> Option<f64> {
        orders?
            .iter()
            .filter_map(|order| order.kind.limit_price())
            .reduce(pick)
    }

    /// A copy of the snapshot restricted to a single ticker.
    #[must_use]
    pub fn for_ticker(&self, ticker: &str) -> BookSnapshot {
        let pick = |map: &BTreeMap<String, Vec<Order>>| {
            map.get(ticker)
                .filter(|orders| !orders.is_empty())
                .map(|orders| (ticker.to_string(), orders.clone()))
                .into_iter()
                .collect()
        };
        BookSnapshot {
            buy_orders: pick(&self.buy_orders),
            sell_orders: pick(&self.sell_orders),
            stop_buy_orders: pick(&self.stop_buy_orders),
            stop_sell_orders: pick(&self.stop_sell_orders),
        }
    }
}
