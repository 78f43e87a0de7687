//! Stop activation: promoting triggered stops into the resting book.

use crate::engine::error::EngineError;
use crate::engine::operations::Engine;
use crate::engine::order::Order;
use tracing::debug;

impl Engine {
    /// Scans the stop side-queues for `ticker` against the last trade
    /// price and promotes every crossing into the resting book.
    ///
    /// Comparisons are inclusive: a stop-buy triggers when
    /// `stop_price ≤ last`, a stop-sell when `stop_price ≥ last`.
    /// Converted orders keep their original timestamp, so they queue
    /// behind nothing they would have beaten as plain orders. The caller
    /// (the matching loop) re-matches them on its next iteration;
    /// activation can only shrink the stop queues, which bounds that
    /// recursion.
    ///
    /// Returns the number of promoted orders. A ticker with no trades yet
    /// triggers nothing.
    pub(super) fn activate_stops(&mut self, ticker: &str) -> Result<usize, EngineError> {
        let Some(last) = self.books.last_trade_price(ticker) else {
            return Ok(0);
        };

        let mut triggered: Vec<Order> = Vec::new();
        if let Some(queue) = self.books.stop_buys.get_mut(ticker) {
            let (hit, keep): (Vec<Order>, Vec<Order>) = queue
                .drain(..)
                .partition(|order| order.kind.stop_price().is_some_and(|stop| stop <= last));
            *queue = keep;
            triggered.extend(hit);
        }
        if let Some(queue) = self.books.stop_sells.get_mut(ticker) {
            let (hit, keep): (Vec<Order>, Vec<Order>) = queue
                .drain(..)
                .partition(|order| order.kind.stop_price().is_some_and(|stop| stop >= last));
            *queue = keep;
            triggered.extend(hit);
        }
        if triggered.is_empty() {
            return Ok(0);
        }

        let promoted = triggered.len();
        for mut order in triggered {
            debug!("stop order {} triggered at {}", order, last);
            order.kind = order.kind.triggered();
            self.books.insert_resting(order);
        }
        self.persist_books()?;
        Ok(promoted)
    }
}
