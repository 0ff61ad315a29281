//! MemoryStore contract tests: concurrency, prefix cursors, limits

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use stratakv_core::{KvStore, Limits, Value};
use stratakv_storage::MemoryStore;

#[test]
fn test_concurrent_incr_is_not_lost() {
    let store = Arc::new(MemoryStore::new());
    store.set("counter", Value::Int(0), None);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..1000 {
                    assert!(store.incr("counter", 1));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.get("counter", None).unwrap(), Value::Int(8000));
}

#[test]
fn test_cursor_delete_while_iterating_prefix() {
    let store = MemoryStore::new();
    for key in ["a:1", "a:2", "a:3", "b:1"] {
        store.set(key, Value::from(key), None);
    }

    let mut cursor = store.iter("a:");
    let mut deleted = 0;
    while cursor.next() {
        if cursor.delete().unwrap() {
            deleted += 1;
        }
    }
    drop(cursor);

    assert_eq!(deleted, 3);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("b:1", None).unwrap(), Value::from("b:1"));
}

#[test]
fn test_limits_are_enforced_on_every_write() {
    let store = MemoryStore::with_limits(Limits::with_small_limits());
    let long_key = "k".repeat(33);

    assert!(!store.set(&long_key, Value::Int(1), None));
    assert!(!store.set("k", Value::from("v".repeat(65)), None));
    assert!(store.set("k", Value::from("v".repeat(64)), None));
    assert!(store.get(&long_key, Some(Value::Null)).is_err());
}

proptest! {
    #[test]
    fn prop_prefix_cursor_matches_btreemap(
        entries in prop::collection::btree_map("[ab]{1,3}", any::<i64>(), 0..30),
        prefix in "[ab]{0,2}"
    ) {
        let store = MemoryStore::new();
        for (k, v) in &entries {
            store.set(k, Value::Int(*v), None);
        }

        let expected: BTreeMap<_, _> = entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix.as_str()))
            .map(|(k, v)| (k.clone(), Value::Int(*v)))
            .collect();

        let mut cursor = store.iter(&prefix);
        let mut seen = BTreeMap::new();
        while cursor.next() {
            seen.insert(cursor.key().unwrap().to_string(), cursor.value().unwrap());
        }
        prop_assert_eq!(seen, expected);
    }
}
