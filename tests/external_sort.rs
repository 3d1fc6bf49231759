//! External Sort Tests
//!
//! - output is ordered by key, equal keys in arrival order
//! - a tiny memory budget spills runs to disk without changing the output
//! - spill files never outlive the stage execution (completion, stop, error)
//! - corruption of a spill run is reported, never ignored

use docstream::config::ExecutionConfig;
use docstream::environment::Environment;
use docstream::expr::functions::{Count, Sum};
use docstream::expr::Expr;
use docstream::storage::MemoryStore;
use docstream::stream::docs::{Take, TempTreeSort};
use docstream::stream::{Flow, SortConfig, Stream, StreamError, TableScan};
use docstream::types::{Document, Value};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn store_with(n: i64, key: impl Fn(i64) -> serde_json::Value) -> MemoryStore {
    let mut store = MemoryStore::new();
    store.create_table("test");
    for i in 0..n {
        let d = Document::from_json(&json!({ "k": key(i), "i": i, "pad": "x".repeat(32) }))
            .unwrap();
        store.insert("test", d).unwrap();
    }
    store
}

fn tiny_budget(dir: &Path) -> SortConfig {
    SortConfig::default()
        .with_memory_budget(256)
        .with_spill_dir(dir)
}

fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

fn pairs(docs: &[Document]) -> Vec<(Value, i64)> {
    docs.iter()
        .map(|d| {
            (
                d.get("k").cloned().unwrap(),
                d.get("i").and_then(Value::as_i64).unwrap(),
            )
        })
        .collect()
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_spilled_sort_is_sorted_and_stable() {
    let dir = TempDir::new().unwrap();
    let store = store_with(500, |i| json!((i * 31) % 17));
    let stream = Stream::new(TableScan::new("test"))
        .pipe(TempTreeSort::with_config(Expr::field("k"), tiny_budget(dir.path())));

    let tx = store.begin();
    let env = Environment::new().with_transaction(&tx);

    let mut max_files = 0;
    let mut out = Vec::new();
    stream
        .iterate(&env, |row| {
            max_files = max_files.max(file_count(dir.path()));
            out.push(row.document().unwrap().clone());
            Ok(Flow::Continue)
        })
        .unwrap();

    let mut expected: Vec<(Value, i64)> = (0..500)
        .map(|i| (Value::Integer((i * 31) % 17), i))
        .collect();
    expected.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(pairs(&out), expected);
    assert!(max_files > 0, "expected the sort to spill");
    assert_eq!(file_count(dir.path()), 0, "spill files must be removed");
}

#[test]
fn test_mixed_types_sort_by_type_rank() {
    let keys = [json!("b"), json!(null), json!(2.5), json!(true), json!(1), json!("a"), json!([1])];
    let store = store_with(keys.len() as i64, |i| keys[i as usize].clone());
    let stream = Stream::new(TableScan::new("test")).pipe(TempTreeSort::new(Expr::field("k")));

    let tx = store.begin();
    let env = Environment::new().with_transaction(&tx);
    let out = stream.collect_documents(&env).unwrap();

    let order: Vec<i64> = pairs(&out).into_iter().map(|(_, i)| i).collect();
    // NULL, true, 1, 2.5, "a", "b", [1]
    assert_eq!(order, vec![1, 3, 4, 2, 5, 0, 6]);
}

// =============================================================================
// Cleanup
// =============================================================================

#[test]
fn test_spill_cleanup_on_downstream_stop() {
    let dir = TempDir::new().unwrap();
    let store = store_with(200, |i| json!(200 - i));
    let stream = Stream::new(TableScan::new("test"))
        .pipe(TempTreeSort::with_config(Expr::field("k"), tiny_budget(dir.path())))
        .pipe(Take::new(3));

    let tx = store.begin();
    let env = Environment::new().with_transaction(&tx);
    let out = stream.collect_documents(&env).unwrap();

    let keys: Vec<Value> = pairs(&out).into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn test_spill_cleanup_on_error() {
    let dir = TempDir::new().unwrap();
    let store = store_with(200, |i| if i == 150 { json!("boom") } else { json!(i) });
    let stream = Stream::new(TableScan::new("test")).pipe(TempTreeSort::with_config(
        Expr::field("k").mul(2),
        tiny_budget(dir.path()),
    ));

    let tx = store.begin();
    let env = Environment::new().with_transaction(&tx);
    let err = stream.collect_documents(&env).unwrap_err();

    assert_eq!(err.code(), "DOCSTREAM_TYPE_MISMATCH");
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn test_spill_cleanup_on_consumer_error() {
    let dir = TempDir::new().unwrap();
    let store = store_with(100, |i| json!(i % 10));
    let stream = Stream::new(TableScan::new("test"))
        .pipe(TempTreeSort::with_config(Expr::field("k"), tiny_budget(dir.path())));

    let tx = store.begin();
    let env = Environment::new().with_transaction(&tx);
    let mut calls = 0;
    let result = stream.iterate(&env, |_| {
        calls += 1;
        Err(StreamError::NoTransaction)
    });

    assert!(matches!(result, Err(StreamError::NoTransaction)));
    assert_eq!(calls, 1);
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn test_unwritable_spill_dir_is_reported() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing");
    let config = SortConfig::default()
        .with_memory_budget(1)
        .with_spill_dir(&missing);
    let store = store_with(5, |i| json!(i));
    let stream = Stream::new(TableScan::new("test"))
        .pipe(TempTreeSort::with_config(Expr::field("k"), config));

    let tx = store.begin();
    let env = Environment::new().with_transaction(&tx);
    let err = stream.collect_documents(&env).unwrap_err();

    assert_eq!(err.code(), "DOCSTREAM_SPILL_FAILED");
    assert!(!err.is_fatal());
}

// =============================================================================
// Aggregation over spilled input
// =============================================================================

#[test]
fn test_group_aggregate_over_spilled_sort() {
    let dir = TempDir::new().unwrap();
    let config = ExecutionConfig::from_json_str(
        &json!({ "sort_memory_budget_bytes": 128, "spill_dir": dir.path() }).to_string(),
    )
    .unwrap();

    let store = store_with(300, |i| json!(i % 7));
    let stream = Stream::new(TableScan::new("test")).group_aggregate_with(
        Some(Expr::field("k")),
        vec![
            Box::new(Count::wildcard()),
            Box::new(Sum::of(Expr::field("i"))),
        ],
        config.sort_config(),
    );

    let tx = store.begin();
    let env = Environment::new().with_transaction(&tx);
    let out = stream.collect_documents(&env).unwrap();

    assert_eq!(out.len(), 7);
    for (k, d) in out.iter().enumerate() {
        let k = k as i64;
        let expected_count = (0..300).filter(|i| i % 7 == k).count() as i64;
        let expected_sum: i64 = (0..300).filter(|i| i % 7 == k).sum();
        assert_eq!(d.get("k"), Some(&Value::Integer(k)));
        assert_eq!(d.get("COUNT(*)"), Some(&Value::Integer(expected_count)));
        assert_eq!(d.get("SUM(i)"), Some(&Value::Integer(expected_sum)));
    }
    assert_eq!(file_count(dir.path()), 0);
}
