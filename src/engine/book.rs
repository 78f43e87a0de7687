//! Book state: per-ticker resting queues, stop side-queues, last trade price.
//!
//! Resting queues are kept in priority order at all times: market orders
//! first, then limit orders by price (descending for buys, ascending for
//! sells), ties broken by earlier timestamp and then by arrival order.
//! Because the persisted file stores queues in this order, a reload
//! reproduces matching decisions exactly.

use crate::engine::order::{Order, Side};
use crate::engine::reference::ReferenceData;
use crate::engine::snapshot::BookSnapshot;
use crate::utils::epoch_seconds;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// In-memory state of every per-ticker book.
#[derive(Debug, Default)]
pub struct BookState {
    /// Resting buy orders per ticker, best-first.
    pub(super) buys: BTreeMap<String, Vec<Order>>,
    /// Resting sell orders per ticker, best-first.
    pub(super) sells: BTreeMap<String, Vec<Order>>,
    /// Untriggered stop-buy orders per ticker.
    pub(super) stop_buys: BTreeMap<String, Vec<Order>>,
    /// Untriggered stop-sell orders per ticker.
    pub(super) stop_sells: BTreeMap<String, Vec<Order>>,
    /// Price of the most recent fill per ticker. Not persisted.
    pub(super) last_trade_price: BTreeMap<String, f64>,
}

/// Priority comparator for resting buy orders: market first, then higher
/// limit price, then earlier timestamp.
pub(super) fn buy_priority(a: &Order, b: &Order) -> Ordering {
    match (a.kind.limit_price(), b.kind.limit_price()) {
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(pa), Some(pb)) => pb
            .partial_cmp(&pa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.timestamp.cmp(&b.timestamp)),
        (None, None) => a.timestamp.cmp(&b.timestamp),
    }
}

/// Priority comparator for resting sell orders: market first, then lower
/// limit price, then earlier timestamp.
pub(super) fn sell_priority(a: &Order, b: &Order) -> Ordering {
    match (a.kind.limit_price(), b.kind.limit_price()) {
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(pa), Some(pb)) => pa
            .partial_cmp(&pb)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.timestamp.cmp(&b.timestamp)),
        (None, None) => a.timestamp.cmp(&b.timestamp),
    }
}

impl BookState {
    /// Inserts `order` into its resting queue at the priority-correct
    /// position. Equal-priority orders keep arrival order.
    pub(super) fn insert_resting(&mut self, order: Order) {
        let (queue, cmp): (&mut Vec<Order>, fn(&Order, &Order) -> Ordering) = match order.action {
            Side::Buy => (self.buys.entry(order.ticker.clone()).or_default(), buy_priority),
            Side::Sell => (
                self.sells.entry(order.ticker.clone()).or_default(),
                sell_priority,
            ),
        };
        let position = queue
            .iter()
            .position(|existing| cmp(&order, existing) == Ordering::Less)
            .unwrap_or(queue.len());
        trace!("resting {} at queue position {}", order, position);
        queue.insert(position, order);
    }

    /// Adds `order` to its stop side-queue.
    pub(super) fn insert_stop(&mut self, order: Order) {
        let queue = match order.action {
            Side::Buy => self.stop_buys.entry(order.ticker.clone()).or_default(),
            Side::Sell => self.stop_sells.entry(order.ticker.clone()).or_default(),
        };
        trace!("parking stop order {}", order);
        queue.push(order);
    }

    /// Removes the order matching `(account_id, order_id)` from the resting
    /// queues or, when `is_stop` is set, from the stop side-queues.
    pub(super) fn take(&mut self, account_id: &str, order_id: &str, is_stop: bool) -> Option<Order> {
        let maps: [&mut BTreeMap<String, Vec<Order>>; 2] = if is_stop {
            [&mut self.stop_buys, &mut self.stop_sells]
        } else {
            [&mut self.buys, &mut self.sells]
        };
        for map in maps {
            for queue in map.values_mut() {
                if let Some(index) = queue
                    .iter()
                    .position(|o| o.account_id == account_id && o.order_id == order_id)
                {
                    return Some(queue.remove(index));
                }
            }
        }
        None
    }

    /// Resting buy orders for `ticker`, best-first.
    #[must_use]
    pub fn buys(&self, ticker: &str) -> &[Order] {
        self.buys.get(ticker).map_or(&[], Vec::as_slice)
    }

    /// Resting sell orders for `ticker`, best-first.
    #[must_use]
    pub fn sells(&self, ticker: &str) -> &[Order] {
        self.sells.get(ticker).map_or(&[], Vec::as_slice)
    }

    /// The highest resting buy-limit price, ignoring market orders.
    #[must_use]
    pub fn best_bid(&self, ticker: &str) -> Option<f64> {
        self.buys(ticker)
            .iter()
            .filter_map(|o| o.kind.limit_price())
            .reduce(f64::max)
    }

    /// The lowest resting sell-limit price, ignoring market orders.
    #[must_use]
    pub fn best_ask(&self, ticker: &str) -> Option<f64> {
        self.sells(ticker)
            .iter()
            .filter_map(|o| o.kind.limit_price())
            .reduce(f64::min)
    }

    /// The price a marketable order on `action` would reasonably see:
    /// the best opposite-side limit, else the last trade price, else the
    /// reference seed price.
    #[must_use]
    pub fn best_price(&self, action: Side, ticker: &str, reference: &ReferenceData) -> Option<f64> {
        let opposite_best = match action {
            Side::Buy => self.best_ask(ticker),
            Side::Sell => self.best_bid(ticker),
        };
        opposite_best
            .or_else(|| self.last_trade_price(ticker))
            .or_else(|| reference.initial_price(ticker))
    }

    /// Price of the most recent fill on `ticker`, if any this run.
    #[must_use]
    pub fn last_trade_price(&self, ticker: &str) -> Option<f64> {
        self.last_trade_price.get(ticker).copied()
    }

    pub(super) fn set_last_trade_price(&mut self, ticker: &str, price: f64) {
        self.last_trade_price.insert(ticker.to_string(), price);
    }

    /// A serializable copy of all four order maps, with empty queues pruned.
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        let prune = |map: &BTreeMap<String, Vec<Order>>| {
            map.iter()
                .filter(|(_, orders)| !orders.is_empty())
                .map(|(ticker, orders)| (ticker.clone(), orders.clone()))
                .collect()
        };
        BookSnapshot {
            buy_orders: prune(&self.buys),
            sell_orders: prune(&self.sells),
            stop_buy_orders: prune(&self.stop_buys),
            stop_sell_orders: prune(&self.stop_sells),
        }
    }

    /// Rebuilds book state from a loaded snapshot.
    ///
    /// Resting queues are re-sorted by priority (stable, so a file written
    /// by this engine is reproduced unchanged) and orders without an
    /// `order_id` are back-filled with the canonical
    /// `{account}_{ticker}_{epoch}` id, counter-suffixed on collision.
    /// Returns the number of back-filled ids.
    pub(super) fn restore(snapshot: BookSnapshot) -> (Self, usize) {
        let mut state = Self {
            buys: snapshot.buy_orders,
            sells: snapshot.sell_orders,
            stop_buys: snapshot.stop_buy_orders,
            stop_sells: snapshot.stop_sell_orders,
            last_trade_price: BTreeMap::new(),
        };
        for queue in state.buys.values_mut() {
            queue.sort_by(buy_priority);
        }
        for queue in state.sells.values_mut() {
            queue.sort_by(sell_priority);
        }
        let backfilled = state.backfill_order_ids();
        (state, backfilled)
    }

    fn backfill_order_ids(&mut self) -> usize {
        let mut used: BTreeSet<String> = self
            .all_orders()
            .filter(|o| !o.order_id.is_empty())
            .map(|o| o.order_id.clone())
            .collect();
        let mut backfilled = 0;
        for map in [
            &mut self.buys,
            &mut self.sells,
            &mut self.stop_buys,
            &mut self.stop_sells,
        ] {
            for order in map.values_mut().flatten() {
                if !order.order_id.is_empty() {
                    continue;
                }
                let base = format!(
                    "{}_{}_{}",
                    order.account_id,
                    order.ticker,
                    epoch_seconds(&order.timestamp)
                );
                let mut candidate = base.clone();
                let mut suffix = 1u64;
                while used.contains(&candidate) {
                    candidate = format!("{base}_{suffix}");
                    suffix += 1;
                }
                used.insert(candidate.clone());
                order.order_id = candidate;
                backfilled += 1;
            }
        }
        backfilled
    }

    fn all_orders(&self) -> impl Iterator<Item = &Order> {
        [&self.buys, &self.sells, &self.stop_buys, &self.stop_sells]
            .into_iter()
            .flat_map(BTreeMap::values)
            .flatten()
    }
}
