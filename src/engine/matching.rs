//! The matching loop: price-time priority, self-trade skip, match-time
//! resource checks, and atomic settlement.
//!
//! Matching runs inside every submit of a non-stop order and keeps going
//! until no executable pair remains. Each iteration either transfers
//! quantity, evicts an order that failed a funds/shares check, or
//! terminates, so the loop always ends.

use crate::engine::error::EngineError;
use crate::engine::ledger::Fill;
use crate::engine::operations::Engine;
use crate::engine::order::Side;
use tracing::debug;

/// The highest-priority executable pair found in one scan.
struct MatchCandidate {
    buy_index: usize,
    sell_index: usize,
    price: f64,
}

impl Engine {
    /// Runs the matching loop for `ticker` until quiescent.
    ///
    /// Books and accounts are persisted after every fill and every
    /// eviction, and triggered stops are promoted into the resting book
    /// between iterations; the next iteration of this same loop is their
    /// re-match.
    pub(super) fn run_matching(&mut self, ticker: &str) -> Result<(), EngineError> {
        loop {
            let Some(candidate) = self.find_executable_pair(ticker) else {
                break;
            };

            let buy = &self.books.buys(ticker)[candidate.buy_index];
            let sell = &self.books.sells(ticker)[candidate.sell_index];
            let quantity = buy.quantity.min(sell.quantity);
            let notional = quantity * candidate.price;
            let buyer_id = buy.account_id.clone();
            let seller_id = sell.account_id.clone();
            let buy_order_id = buy.order_id.clone();
            let sell_order_id = sell.order_id.clone();

            // Resource checks happen at match time; a failing order is
            // evicted and the scan restarts without it.
            let mut buyer = self.accounts.get(&buyer_id)?;
            if buyer.balance < notional {
                debug!(
                    "evicting buy {}: needs {} but {} has {}",
                    buy_order_id, notional, buyer_id, buyer.balance
                );
                self.remove_resting(ticker, Side::Buy, candidate.buy_index);
                self.persist_books()?;
                continue;
            }
            let mut seller = self.accounts.get(&seller_id)?;
            if seller.position(ticker) < quantity {
                debug!(
                    "evicting sell {}: needs {} {} but {} holds {}",
                    sell_order_id,
                    quantity,
                    ticker,
                    seller_id,
                    seller.position(ticker)
                );
                self.remove_resting(ticker, Side::Sell, candidate.sell_index);
                self.persist_books()?;
                continue;
            }

            // Settle: cash moves one way, shares the other.
            buyer.balance -= notional;
            buyer.credit_shares(ticker, quantity);
            seller.balance += notional;
            seller.debit_shares(ticker, quantity);

            self.decrement_resting(ticker, Side::Buy, candidate.buy_index, quantity);
            self.decrement_resting(ticker, Side::Sell, candidate.sell_index, quantity);
            self.books.set_last_trade_price(ticker, candidate.price);

            debug!(
                "fill {} x{} @ {}: {} buys from {}",
                ticker, quantity, candidate.price, buyer_id, seller_id
            );

            // Accounts persist before the trade is recorded, so a persisted
            // trade never precedes its balance effects.
            self.accounts.update(&buyer_id, buyer)?;
            self.accounts.update(&seller_id, seller)?;
            let timestamp = self.clock.now();
            self.ledger.record(Fill {
                ticker: ticker.to_string(),
                price: candidate.price,
                quantity,
                buy_account_id: buyer_id,
                sell_account_id: seller_id,
                timestamp,
            })?;
            self.persist_books()?;

            self.activate_stops(ticker)?;
        }
        Ok(())
    }

    /// Scans buy×sell pairs in priority order and returns the first
    /// executable one.
    ///
    /// Same-account pairs are skipped (self-trade prevention, applied
    /// uniformly to stop-originated orders as well). A market×market pair
    /// with no last trade price is skipped; a limit×limit pair that does
    /// not cross ends the scan, since every later pair is priced worse.
    fn find_executable_pair(&self, ticker: &str) -> Option<MatchCandidate> {
        let buys = self.books.buys(ticker);
        let sells = self.books.sells(ticker);
        let last_trade_price = self.books.last_trade_price(ticker);

        for (buy_index, buy) in buys.iter().enumerate() {
            for (sell_index, sell) in sells.iter().enumerate() {
                if buy.account_id == sell.account_id {
                    continue;
                }
                let price = match (buy.kind.limit_price(), sell.kind.limit_price()) {
                    (None, None) => match last_trade_price {
                        Some(price) => price,
                        None => continue,
                    },
                    (None, Some(ask)) => ask,
                    (Some(bid), None) => bid,
                    (Some(bid), Some(ask)) => {
                        if bid >= ask {
                            ask
                        } else {
                            return None;
                        }
                    }
                };
                return Some(MatchCandidate {
                    buy_index,
                    sell_index,
                    price,
                });
            }
        }
        None
    }

    fn remove_resting(&mut self, ticker: &str, side: Side, index: usize) {
        let map = match side {
            Side::Buy => &mut self.books.buys,
            Side::Sell => &mut self.books.sells,
        };
        if let Some(queue) = map.get_mut(ticker) {
            queue.remove(index);
        }
    }

    /// Takes `quantity` off the order at `index`, removing it when the
    /// remainder is exactly zero.
    fn decrement_resting(&mut self, ticker: &str, side: Side, index: usize, quantity: f64) {
        let map = match side {
            Side::Buy => &mut self.books.buys,
            Side::Sell => &mut self.books.sells,
        };
        if let Some(queue) = map.get_mut(ticker) {
            queue[index].quantity -= quantity;
            if queue[index].quantity == 0.0 {
                queue.remove(index);
            }
        }
    }
}
