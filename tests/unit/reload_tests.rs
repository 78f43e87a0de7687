//! Restart tests over file-backed storage.

use crate::common::*;
use std::sync::Arc;
use tempfile::TempDir;
use tradebook_rs::prelude::*;

fn open_seeded(dir: &TempDir, seeds: &[(&str, f64, &[(&str, f64)])]) -> Engine {
    let store = JsonFileStore::new(dir.path()).expect("store must open");
    seeded_engine(Arc::new(store), seeds)
}

fn reopen(dir: &TempDir) -> Engine {
    let store = JsonFileStore::new(dir.path()).expect("store must open");
    Engine::new(
        EngineConfig::default(),
        ReferenceData::default_universe(),
        Arc::new(store),
        Arc::new(FixedClock(now())),
    )
    .expect("reopen must succeed")
}

#[test]
fn test_full_session_survives_restart() {
    let dir = TempDir::new().unwrap();
    let mut engine = open_seeded(
        &dir,
        &[
            ("A", 10_000.0, &[]),
            ("B", 10_000.0, &[("AAPL", 100.0)]),
            ("C", 20_000.0, &[("MSFT", 40.0)]),
        ],
    );

    // A mixed session: a fill, a resting remainder, a parked stop, a
    // cancellation, and a reversal.
    limit(&mut engine, Side::Buy, "A", "AAPL", 15.0, 150.0, 0);
    limit(&mut engine, Side::Sell, "B", "AAPL", 20.0, 150.0, 1);
    engine
        .submit_order(request(
            Side::Sell,
            "C",
            "MSFT",
            5.0,
            OrderTypeTag::StopLimit,
            Some(300.0),
            Some(310.0),
            2,
        ))
        .unwrap();
    let doomed = limit(&mut engine, Side::Buy, "C", "MSFT", 5.0, 290.0, 3);
    engine.cancel_order("C", &doomed, false).unwrap();

    limit(&mut engine, Side::Buy, "C", "AAPL", 2.0, 150.0, 4);
    assert_eq!(engine.trades().len(), 2);
    let reversed_id = engine.trades()[1].trade_id.clone();
    engine.reverse_trade(&reversed_id).unwrap();

    let books = engine.orders(None);
    let stops = engine.stop_orders(None);
    let trades = engine.trades().to_vec();
    let account_a = engine.account("A").unwrap();
    let account_b = engine.account("B").unwrap();
    let account_c = engine.account("C").unwrap();
    drop(engine);

    let mut restarted = reopen(&dir);
    assert_eq!(restarted.orders(None), books);
    assert_eq!(restarted.stop_orders(None), stops);
    assert_eq!(restarted.trades(), trades.as_slice());
    assert_eq!(restarted.account("A").unwrap(), account_a);
    assert_eq!(restarted.account("B").unwrap(), account_b);
    assert_eq!(restarted.account("C").unwrap(), account_c);
}

#[test]
fn test_last_trade_price_resets_on_restart() {
    let dir = TempDir::new().unwrap();
    let mut engine = open_seeded(
        &dir,
        &[("A", 10_000.0, &[]), ("B", 10_000.0, &[("AAPL", 100.0)])],
    );
    limit(&mut engine, Side::Buy, "A", "AAPL", 10.0, 150.0, 0);
    limit(&mut engine, Side::Sell, "B", "AAPL", 10.0, 150.0, 1);
    assert_eq!(engine.last_trade_price("AAPL"), Some(150.0));
    drop(engine);

    // The book file carries no price history; best-price falls back to
    // the reference seed.
    let restarted = reopen(&dir);
    assert_eq!(restarted.last_trade_price("AAPL"), None);
    assert_eq!(restarted.best_price(Side::Buy, "AAPL"), Some(150.0));
}

#[test]
fn test_open_uses_the_wall_clock() {
    let dir = TempDir::new().unwrap();
    let mut engine = Engine::open(dir.path()).unwrap();

    let order_id = engine
        .submit_order(OrderRequest {
            action: Side::Buy,
            account_id: "A".to_string(),
            ticker: "AAPL".to_string(),
            quantity: 1.0,
            order_type: OrderTypeTag::Limit,
            price: Some(149.0),
            stop_price: None,
            timestamp: chrono::Utc::now(),
        })
        .unwrap();
    drop(engine);

    let reloaded = Engine::open(dir.path()).unwrap();
    let books = reloaded.orders(Some("AAPL"));
    assert_eq!(books.buy_orders["AAPL"][0].order_id, order_id);
}

#[test]
fn test_corrupt_book_file_fails_to_open() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("unmatched_orders.json"), "{ not json").unwrap();

    match Engine::open(dir.path()) {
        Err(EngineError::Storage(StorageError::Decode { .. })) => {}
        other => panic!("expected a decode failure, got {other:?}"),
    }
}
