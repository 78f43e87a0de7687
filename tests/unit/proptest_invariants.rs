//! Property-based tests: engine invariants over random order streams.

use crate::common::*;
use proptest::prelude::*;
use std::sync::Arc;
use tradebook_rs::prelude::*;

static SEEDED_ACCOUNTS: [&str; 3] = ["1", "2", "3"];
static TICKERS: [&str; 2] = ["AAPL", "MSFT"];
const START_BALANCE: f64 = 10_000.0;
const START_SHARES: f64 = 100.0;

fn seeds() -> Vec<(&'static str, f64, &'static [(&'static str, f64)])> {
    static POSITIONS: [(&str, f64); 2] = [("AAPL", START_SHARES), ("MSFT", START_SHARES)];
    SEEDED_ACCOUNTS
        .iter()
        .map(|id| (*id, START_BALANCE, &POSITIONS[..]))
        .collect()
}

#[derive(Debug, Clone)]
struct RandomOrder {
    account: &'static str,
    ticker: &'static str,
    action: Side,
    order_type: OrderTypeTag,
    quantity: f64,
    price: f64,
    stop_price: f64,
}

fn order_strategy() -> impl Strategy<Value = RandomOrder> {
    (
        0..SEEDED_ACCOUNTS.len(),
        0..TICKERS.len(),
        any::<bool>(),
        0u8..4,
        1u32..=20,
        140u32..=160,
        140u32..=160,
    )
        .prop_map(
            |(account, ticker, is_buy, kind, quantity, price, stop_price)| RandomOrder {
                account: SEEDED_ACCOUNTS[account],
                ticker: TICKERS[ticker],
                action: if is_buy { Side::Buy } else { Side::Sell },
                order_type: match kind {
                    0 => OrderTypeTag::Market,
                    1 => OrderTypeTag::Limit,
                    2 => OrderTypeTag::StopMarket,
                    _ => OrderTypeTag::StopLimit,
                },
                quantity: f64::from(quantity),
                price: f64::from(price),
                stop_price: f64::from(stop_price),
            },
        )
}

fn stream_strategy() -> impl Strategy<Value = Vec<RandomOrder>> {
    prop::collection::vec(order_strategy(), 1..40)
}

/// Replays a stream against a fresh engine, ignoring rejections.
fn run_stream(engine: &mut Engine, stream: &[RandomOrder]) {
    for (index, order) in stream.iter().enumerate() {
        let (price, stop_price) = match order.order_type {
            OrderTypeTag::Market => (None, None),
            OrderTypeTag::Limit => (Some(order.price), None),
            OrderTypeTag::StopMarket => (None, Some(order.stop_price)),
            OrderTypeTag::StopLimit => (Some(order.price), Some(order.stop_price)),
        };
        let _ = engine.submit_order(request(
            order.action,
            order.account,
            order.ticker,
            order.quantity,
            order.order_type,
            price,
            stop_price,
            index as u32 % 60,
        ));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// No balance or position ever goes negative, and positions never
    /// keep a zero entry.
    #[test]
    fn no_negative_balances_or_positions(stream in stream_strategy()) {
        let mut engine = memory_engine(&seeds());
        run_stream(&mut engine, &stream);

        for (account_id, account) in engine.account_store().all() {
            prop_assert!(
                account.balance >= 0.0,
                "account {} has negative balance {}",
                account_id,
                account.balance
            );
            for (ticker, quantity) in &account.positions {
                prop_assert!(
                    *quantity > 0.0,
                    "account {} holds non-positive {} {}",
                    account_id,
                    quantity,
                    ticker
                );
            }
        }
    }

    /// Cash and shares are conserved: fills move value between accounts
    /// but never create or destroy it.
    #[test]
    fn cash_and_shares_are_conserved(stream in stream_strategy()) {
        let mut engine = memory_engine(&seeds());
        run_stream(&mut engine, &stream);

        let total_cash: f64 = engine
            .account_store()
            .all()
            .map(|(_, account)| account.balance)
            .sum();
        let expected_cash = START_BALANCE * SEEDED_ACCOUNTS.len() as f64;
        prop_assert!(
            (total_cash - expected_cash).abs() < 1e-6,
            "cash not conserved: {} != {}",
            total_cash,
            expected_cash
        );

        for ticker in TICKERS {
            let held: f64 = engine
                .account_store()
                .all()
                .map(|(_, account)| account.position(ticker))
                .sum();
            let expected = START_SHARES * SEEDED_ACCOUNTS.len() as f64;
            prop_assert!(
                (held - expected).abs() < 1e-9,
                "{} shares not conserved: {} != {}",
                ticker,
                held,
                expected
            );
        }
    }

    /// No executed trade pairs an account with itself.
    #[test]
    fn ledger_never_contains_self_trades(stream in stream_strategy()) {
        let mut engine = memory_engine(&seeds());
        run_stream(&mut engine, &stream);

        for trade in engine.trades() {
            prop_assert_ne!(&trade.buy_account_id, &trade.sell_account_id);
        }
    }

    /// Reloading from the store reproduces books, stops, and trades.
    #[test]
    fn reload_reproduces_in_memory_state(stream in stream_strategy()) {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let mut engine = seeded_engine(Arc::clone(&store), &seeds());
        run_stream(&mut engine, &stream);

        let reloaded = Engine::new(
            EngineConfig::default(),
            ReferenceData::default_universe(),
            store,
            Arc::new(FixedClock(now())),
        ).expect("reload must succeed");

        prop_assert_eq!(reloaded.orders(None), engine.orders(None));
        prop_assert_eq!(reloaded.stop_orders(None), engine.stop_orders(None));
        prop_assert_eq!(reloaded.trades(), engine.trades());
    }

    /// A submit followed by a cancel with no intervening fills restores
    /// the books exactly.
    #[test]
    fn submit_cancel_roundtrip_is_identity(stream in stream_strategy()) {
        let mut engine = memory_engine(&seeds());
        run_stream(&mut engine, &stream);

        let books_before = engine.orders(None);
        let trades_before = engine.trades().len();

        let order_id = engine.submit_order(request(
            Side::Buy,
            "1",
            "AAPL",
            1.0,
            OrderTypeTag::Limit,
            Some(1.0),
            None,
            59,
        ));

        if let Ok(order_id) = order_id {
            if engine.trades().len() == trades_before {
                // No fill happened: whether the order rests or was evicted
                // on a failed match check, cancelling (or failing to) must
                // leave the books exactly as they were.
                let _ = engine.cancel_order("1", &order_id, false);
                prop_assert_eq!(engine.orders(None), books_before);
            }
        }
    }
}
