//! End-to-end scenarios with literal expected balances, positions, and
//! ledgers, driven through the public API only.

use crate::common::*;
use tradebook_rs::prelude::*;

#[test]
fn test_exact_cross_settles_both_accounts() {
    let mut engine = memory_engine(&[
        ("A", 10_000.0, &[]),
        ("B", 10_000.0, &[("AAPL", 100.0)]),
    ]);

    limit(&mut engine, Side::Buy, "A", "AAPL", 10.0, 150.0, 0);
    limit(&mut engine, Side::Sell, "B", "AAPL", 10.0, 150.0, 1);

    let trades = engine.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].ticker, "AAPL");
    assert_eq!(trades[0].price, 150.0);
    assert_eq!(trades[0].quantity, 10.0);
    assert_eq!(trades[0].buy_account_id, "A");
    assert_eq!(trades[0].sell_account_id, "B");

    assert_eq!(balance_and_position(&mut engine, "A", "AAPL"), (8_500.0, 10.0));
    assert_eq!(balance_and_position(&mut engine, "B", "AAPL"), (11_500.0, 90.0));
    assert!(engine.orders(None).is_empty());
    assert_eq!(engine.last_trade_price("AAPL"), Some(150.0));
}

#[test]
fn test_partial_fill_rests_the_remainder() {
    let mut engine = memory_engine(&[
        ("A", 10_000.0, &[]),
        ("B", 10_000.0, &[("AAPL", 100.0)]),
    ]);

    limit(&mut engine, Side::Buy, "A", "AAPL", 15.0, 150.0, 0);
    limit(&mut engine, Side::Sell, "B", "AAPL", 10.0, 150.0, 1);

    let trades = engine.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!((trades[0].quantity, trades[0].price), (10.0, 150.0));

    assert_eq!(balance_and_position(&mut engine, "A", "AAPL"), (8_500.0, 10.0));
    assert_eq!(balance_and_position(&mut engine, "B", "AAPL"), (11_500.0, 90.0));

    let books = engine.orders(Some("AAPL"));
    let resting = &books.buy_orders["AAPL"];
    assert_eq!(resting.len(), 1);
    assert_eq!(resting[0].account_id, "A");
    assert_eq!(resting[0].quantity, 5.0);
}

#[test]
fn test_underfunded_buyer_is_evicted_not_filled() {
    let mut engine = memory_engine(&[
        ("A", 100.0, &[]),
        ("B", 10_000.0, &[("AAPL", 100.0)]),
    ]);

    limit(&mut engine, Side::Buy, "A", "AAPL", 10.0, 150.0, 0);
    limit(&mut engine, Side::Sell, "B", "AAPL", 10.0, 150.0, 1);

    assert!(engine.trades().is_empty());
    let books = engine.orders(Some("AAPL"));
    assert!(books.buy_orders.is_empty());
    assert_eq!(books.sell_orders["AAPL"].len(), 1);
    assert_eq!(books.sell_orders["AAPL"][0].quantity, 10.0);
    assert_eq!(balance_and_position(&mut engine, "A", "AAPL"), (100.0, 0.0));
}

#[test]
fn test_stop_fires_off_the_print_and_rests_as_market_sell() {
    let mut engine = memory_engine(&[
        ("A", 10_000.0, &[]),
        ("B", 10_000.0, &[("AAPL", 100.0)]),
        ("C", 10_000.0, &[("AAPL", 100.0)]),
    ]);

    engine
        .submit_order(request(
            Side::Sell,
            "B",
            "AAPL",
            10.0,
            OrderTypeTag::StopMarket,
            None,
            Some(145.0),
            0,
        ))
        .unwrap();
    limit(&mut engine, Side::Sell, "C", "AAPL", 10.0, 140.0, 1);
    limit(&mut engine, Side::Buy, "A", "AAPL", 10.0, 140.0, 2);

    // A×C printed 140, which fired B's 145 stop; with no bid left the
    // converted market sell rests.
    let trades = engine.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].buy_account_id, "A");
    assert_eq!(trades[0].sell_account_id, "C");
    assert_eq!(trades[0].price, 140.0);
    assert_eq!(engine.last_trade_price("AAPL"), Some(140.0));

    assert!(engine.stop_orders(None).is_empty());
    let books = engine.orders(Some("AAPL"));
    let resting = &books.sell_orders["AAPL"];
    assert_eq!(resting.len(), 1);
    assert_eq!(resting[0].account_id, "B");
    assert_eq!(resting[0].kind, OrderKind::Market);
}

#[test]
fn test_non_overlapping_limits_rest_without_eviction() {
    let mut engine = memory_engine(&[
        ("A", 10_000.0, &[]),
        ("B", 10_000.0, &[("AAPL", 100.0)]),
    ]);

    // A could not afford a full fill at 149, but no match forms, so the
    // order rests untouched.
    limit(&mut engine, Side::Buy, "A", "AAPL", 100.0, 149.0, 0);
    limit(&mut engine, Side::Sell, "B", "AAPL", 100.0, 150.0, 1);

    assert!(engine.trades().is_empty());
    let books = engine.orders(Some("AAPL"));
    assert_eq!(books.buy_orders["AAPL"].len(), 1);
    assert_eq!(books.sell_orders["AAPL"].len(), 1);
    assert_eq!(engine.best_bid_ask("AAPL"), (Some(149.0), Some(150.0)));
}

#[test]
fn test_delete_trade_restores_accounts_and_empties_ledger() {
    let mut engine = memory_engine(&[
        ("A", 10_000.0, &[]),
        ("B", 10_000.0, &[("AAPL", 100.0)]),
    ]);
    let buyer_before = engine.account("A").unwrap();
    let seller_before = engine.account("B").unwrap();

    limit(&mut engine, Side::Buy, "A", "AAPL", 10.0, 150.0, 0);
    limit(&mut engine, Side::Sell, "B", "AAPL", 10.0, 150.0, 1);
    let trade_id = engine.trades()[0].trade_id.clone();

    engine.reverse_trade(&trade_id).unwrap();

    assert!(engine.trades().is_empty());
    assert_eq!(engine.account("A").unwrap(), buyer_before);
    assert_eq!(engine.account("B").unwrap(), seller_before);
}

// -----------------------------------------------------------------------
// Boundary behaviors
// -----------------------------------------------------------------------

#[test]
fn test_market_cross_with_no_price_history_produces_no_fill() {
    let mut engine = memory_engine(&[
        ("A", 10_000.0, &[]),
        ("B", 10_000.0, &[("AAPL", 100.0)]),
    ]);

    engine
        .submit_order(request(
            Side::Buy,
            "A",
            "AAPL",
            10.0,
            OrderTypeTag::Market,
            None,
            None,
            0,
        ))
        .unwrap();
    engine
        .submit_order(request(
            Side::Sell,
            "B",
            "AAPL",
            10.0,
            OrderTypeTag::Market,
            None,
            None,
            1,
        ))
        .unwrap();

    assert!(engine.trades().is_empty());
    assert_eq!(engine.orders(Some("AAPL")).order_count(), 2);
}

#[test]
fn test_submit_then_cancel_restores_the_book_exactly() {
    let mut engine = memory_engine(&[
        ("A", 10_000.0, &[]),
        ("B", 10_000.0, &[("AAPL", 100.0)]),
    ]);
    limit(&mut engine, Side::Sell, "B", "AAPL", 10.0, 155.0, 0);

    let books_before = engine.orders(None);
    let buyer_before = engine.account("A").unwrap();

    let order_id = limit(&mut engine, Side::Buy, "A", "AAPL", 10.0, 149.0, 1);
    assert!(engine.trades().is_empty(), "149 does not cross 155");
    engine.cancel_order("A", &order_id, false).unwrap();

    assert_eq!(engine.orders(None), books_before);
    assert_eq!(engine.account("A").unwrap(), buyer_before);
}

#[test]
fn test_identical_inputs_produce_identical_outputs() {
    let run = || {
        let mut engine = memory_engine(&[
            ("A", 10_000.0, &[("AAPL", 50.0)]),
            ("B", 10_000.0, &[("AAPL", 100.0)]),
            ("C", 20_000.0, &[]),
        ]);
        limit(&mut engine, Side::Sell, "B", "AAPL", 30.0, 150.0, 0);
        limit(&mut engine, Side::Buy, "C", "AAPL", 10.0, 150.0, 1);
        engine
            .submit_order(request(
                Side::Sell,
                "A",
                "AAPL",
                20.0,
                OrderTypeTag::StopMarket,
                None,
                Some(150.0),
                2,
            ))
            .unwrap();
        limit(&mut engine, Side::Buy, "C", "AAPL", 15.0, 151.0, 3);

        let books = serde_json::to_string(&engine.orders(None)).unwrap();
        let stops = serde_json::to_string(&engine.stop_orders(None)).unwrap();
        let fills: Vec<_> = engine
            .trades()
            .iter()
            .map(|t| {
                (
                    t.ticker.clone(),
                    t.price.to_bits(),
                    t.quantity.to_bits(),
                    t.buy_account_id.clone(),
                    t.sell_account_id.clone(),
                )
            })
            .collect();
        (books, stops, fills)
    };

    assert_eq!(run(), run(), "replays must be bit-identical");
}
