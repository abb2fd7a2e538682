//! Integration tests for the saved-backtest store and the library index.
//!
//! Tests:
//! 1. Save → load returns both streams, strategy and summary
//! 1b. A backtest with void (NaN) bars saves and loads back
//! 2. Re-saving keeps the original saved date
//! 3. The library lists every saved backtest with its metrics
//! 4. Delete removes both the record and the library entry
//! 5. Reserved and unsafe keys are rejected
//! 6. Any safe key round-trips through the raw key-value API (proptest)

use chrono::NaiveDate;
use proptest::prelude::*;
use rptr_core::domain::{Bar, OrderEvent, OrderType, Timestamp};
use rptr_runner::ingest::read_bars;
use rptr_runner::sample;
use rptr_runner::store::{input_hash, BacktestStore, StoreError, LIBRARY_KEY};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn save_then_load_returns_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = BacktestStore::open(dir.path()).unwrap();
    let s = sample::generate(300, 11);

    let entry = store
        .save_backtest_on("trend-a", &s.bars, &s.orders, Some(&s.strategy), date(2024, 3, 1))
        .unwrap();
    assert_eq!(entry.saved, date(2024, 3, 1));
    assert!(entry.cagr_pct.is_some());

    let record = store.load_backtest("trend-a").unwrap();
    assert_eq!(record.bars, s.bars);
    assert_eq!(record.orders, s.orders);
    assert_eq!(record.strategy.as_deref(), Some(s.strategy.as_str()));
    let summary = record.summary.unwrap();
    assert_eq!(summary.capital, 100_000);
    assert_eq!(Some(summary.cagr_pct), entry.cagr_pct);
    assert_eq!(record.input_hash.len(), 64);
}

#[test]
fn void_bars_save_and_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = BacktestStore::open(dir.path()).unwrap();
    let csv = "time,open,high,low,close\n0,1,2,0.5,1.5\n60,NaN,NaN,NaN,NaN\n120,1.5,2,1,1.8\n";
    let bars = read_bars(csv.as_bytes(), "bars").unwrap();
    assert!(bars[1].is_void());
    let orders = vec![
        OrderEvent::fill(Timestamp(0), OrderType::Buy, 1.5, 1.0).with_snapshot(1000.0, 0.0),
    ];

    store
        .save_backtest_on("nanbar", &bars, &orders, None, date(2024, 5, 5))
        .unwrap();
    let record = store.load_backtest("nanbar").unwrap();

    assert_eq!(record.bars.len(), 3);
    assert!(record.bars[1].is_void());
    assert_eq!(record.bars[1].time, Timestamp(60));
    assert_eq!(record.bars[0], bars[0]);
    assert_eq!(record.bars[2], bars[2]);
    assert_eq!(record.input_hash, input_hash(&bars, &orders));
}

#[test]
fn resave_keeps_original_date_and_updates_content() {
    let dir = tempfile::tempdir().unwrap();
    let store = BacktestStore::open(dir.path()).unwrap();
    let first = sample::generate(100, 1);
    let second = sample::generate(100, 2);

    store
        .save_backtest_on("run", &first.bars, &first.orders, None, date(2024, 1, 1))
        .unwrap();
    let entry = store
        .save_backtest_on("run", &second.bars, &second.orders, None, date(2024, 6, 1))
        .unwrap();

    assert_eq!(entry.saved, date(2024, 1, 1));
    let record = store.load_backtest("run").unwrap();
    assert_eq!(record.bars, second.bars);
    assert_eq!(store.list_library().unwrap()["run"].saved, date(2024, 1, 1));
}

#[test]
fn library_lists_saved_backtests_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let store = BacktestStore::open(dir.path()).unwrap();
    assert!(store.list_library().unwrap().is_empty());

    for (name, seed) in [("zeta", 1), ("alpha", 2), ("mid", 3)] {
        let s = sample::generate(120, seed);
        store
            .save_backtest_on(name, &s.bars, &s.orders, None, date(2024, 2, 2))
            .unwrap();
    }

    let library = store.list_library().unwrap();
    let names: Vec<&str> = library.keys().map(|k| k.as_str()).collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    assert!(library.values().all(|e| e.max_dd_pct.is_some()));

    let keys = store.keys().unwrap();
    assert!(keys.contains(&LIBRARY_KEY.to_string()));
    assert_eq!(keys.len(), 4);
}

#[test]
fn undefined_summary_is_saved_without_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let store = BacktestStore::open(dir.path()).unwrap();
    let bars = vec![Bar {
        time: Timestamp(0),
        open: 1.0,
        high: 1.0,
        low: 1.0,
        close: 1.0,
    }];
    let orders =
        vec![OrderEvent::fill(Timestamp(0), OrderType::Buy, 1.0, 1.0).with_snapshot(10.0, 0.0)];

    let entry = store
        .save_backtest_on("single", &bars, &orders, None, date(2024, 1, 1))
        .unwrap();
    assert_eq!(entry.cagr_pct, None);
    assert_eq!(entry.start, None);
    assert!(store.load_backtest("single").unwrap().summary.is_none());
}

#[test]
fn delete_removes_record_and_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = BacktestStore::open(dir.path()).unwrap();
    let s = sample::generate(60, 5);
    store
        .save_backtest_on("gone", &s.bars, &s.orders, None, date(2024, 1, 1))
        .unwrap();

    assert!(store.delete_backtest("gone").unwrap());
    assert!(!store.list_library().unwrap().contains_key("gone"));
    assert!(matches!(
        store.load_backtest("gone"),
        Err(StoreError::NotFound(_))
    ));
    assert!(!store.delete_backtest("gone").unwrap());
}

#[test]
fn reserved_and_unsafe_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = BacktestStore::open(dir.path()).unwrap();
    let s = sample::generate(10, 1);

    assert!(matches!(
        store.save_backtest("library", &s.bars, &s.orders, None),
        Err(StoreError::ReservedKey(_))
    ));
    assert!(matches!(
        store.save_backtest("../escape", &s.bars, &s.orders, None),
        Err(StoreError::InvalidKey(_))
    ));
    assert!(matches!(
        store.delete_backtest("library"),
        Err(StoreError::ReservedKey(_))
    ));
}

#[test]
fn corrupt_document_is_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = BacktestStore::open(dir.path()).unwrap();
    std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
    assert!(matches!(
        store.load_backtest("broken"),
        Err(StoreError::Json { .. })
    ));
}

proptest! {
    #[test]
    fn safe_keys_roundtrip(key in "[A-Za-z0-9_-][A-Za-z0-9_.-]{0,40}", value in any::<i64>()) {
        let dir = tempfile::tempdir().unwrap();
        let store = BacktestStore::open(dir.path()).unwrap();
        store.put(&key, &value).unwrap();
        prop_assert_eq!(store.get::<i64>(&key).unwrap(), Some(value));
        prop_assert_eq!(store.keys().unwrap(), vec![key.clone()]);
        prop_assert!(store.delete(&key).unwrap());
        prop_assert_eq!(store.get::<i64>(&key).unwrap(), None);
    }
}
