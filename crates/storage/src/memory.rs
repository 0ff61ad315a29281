//! MemoryStore: in-memory primitive store
//!
//! Implements the `KvStore` contract using:
//! - `BTreeMap<String, StoredValue>` for ordered key storage with expiry
//! - `parking_lot::RwLock` for thread-safe access
//!
//! # Design Notes
//!
//! - **Limits enforced on write**: keys over `max_key_chars` or values over
//!   `max_value_bytes` are rejected with `false`; the reason is logged at
//!   debug level
//! - **Logical expiry**: expired values are filtered at read time and only
//!   physically dropped by `purge_expired`
//! - **Snapshot cursors**: `iter` captures the matching key set once; later
//!   writes do not change which keys a cursor visits

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use stratakv_core::{Error, KvCursor, KvStore, Limits, Result, StoreConfig, Value};

use crate::stored_value::StoredValue;

/// In-memory store using BTreeMap with RwLock
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, StoredValue>>,
    limits: Limits,
}

impl MemoryStore {
    /// Create an empty store with the host's default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with custom limits
    pub fn with_limits(limits: Limits) -> Self {
        MemoryStore {
            data: RwLock::new(BTreeMap::new()),
            limits,
        }
    }

    /// Create an empty store from a loaded configuration
    pub fn with_config(config: &StoreConfig) -> Self {
        Self::with_limits(config.limits.clone())
    }

    /// The limits this store enforces
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        self.data.read().values().filter(|sv| !sv.is_expired()).count()
    }

    /// Check if the store holds no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries, returns count removed
    pub fn purge_expired(&self) -> usize {
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, sv| !sv.is_expired());
        before - data.len()
    }

    /// Write with the rejection reason instead of a flag
    pub fn try_set(&self, key: &str, value: Value, expire: Option<Duration>) -> Result<()> {
        self.limits.validate_key(key)?;
        self.limits.validate_value(&value)?;
        self.data
            .write()
            .insert(key.to_string(), StoredValue::new(value, expire));
        Ok(())
    }

    /// Add `delta` to a stored number, with the rejection reason
    ///
    /// Integers saturate at the i64 bounds. A missing or expired key is
    /// not created.
    pub fn try_adjust(&self, key: &str, delta: i64) -> Result<()> {
        self.limits.validate_key(key)?;
        let mut data = self.data.write();
        let entry = data
            .get_mut(key)
            .filter(|sv| !sv.is_expired())
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))?;

        match entry.value_mut() {
            Value::Int(n) => *n = n.saturating_add(delta),
            Value::Float(f) => *f += delta as f64,
            other => {
                return Err(Error::NonNumericValue {
                    key: key.to_string(),
                    found: other.type_name(),
                })
            }
        }
        Ok(())
    }

    fn report(op: &'static str, key: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!(op, key, error = %e, "store rejected write");
                false
            }
        }
    }

    /// Keys with `prefix` that are live right now, in order
    fn live_keys(&self, prefix: &str) -> Vec<String> {
        self.data
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(_, sv)| !sv.is_expired())
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str, default: Option<Value>) -> Result<Value> {
        self.limits.validate_key(key)?;
        let found = self
            .data
            .read()
            .get(key)
            .filter(|sv| !sv.is_expired())
            .map(|sv| sv.value().clone());

        match (found, default) {
            (Some(value), _) => Ok(value),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(Error::KeyNotFound(key.to_string())),
        }
    }

    fn set(&self, key: &str, value: Value, expire: Option<Duration>) -> bool {
        Self::report("set", key, self.try_set(key, value, expire))
    }

    fn incr(&self, key: &str, amount: i64) -> bool {
        Self::report("incr", key, self.try_adjust(key, amount))
    }

    fn decr(&self, key: &str, amount: i64) -> bool {
        Self::report("decr", key, self.try_adjust(key, 0i64.saturating_sub(amount)))
    }

    fn remove(&self, key: &str) {
        self.data.write().remove(key);
    }

    fn clear(&self) -> bool {
        self.data.write().clear();
        true
    }

    fn iter(&self, prefix: &str) -> Box<dyn KvCursor + '_> {
        Box::new(MemoryCursor {
            store: self,
            keys: self.live_keys(prefix),
            next_pos: 0,
            current: None,
        })
    }
}

/// Snapshot cursor over a [`MemoryStore`] prefix
///
/// The key list is fixed when the cursor is created. Values are read live,
/// so a key removed by someone else after the snapshot reports
/// `KeyNotFound` from `value()`.
pub struct MemoryCursor<'a> {
    store: &'a MemoryStore,
    keys: Vec<String>,
    next_pos: usize,
    current: Option<usize>,
}

impl MemoryCursor<'_> {
    fn current_key(&self, op: &'static str) -> Result<&str> {
        self.current
            .map(|i| self.keys[i].as_str())
            .ok_or(Error::CursorNotPositioned(op))
    }
}

impl KvCursor for MemoryCursor<'_> {
    fn next(&mut self) -> bool {
        if self.next_pos < self.keys.len() {
            self.current = Some(self.next_pos);
            self.next_pos += 1;
            true
        } else {
            self.current = None;
            false
        }
    }

    fn key(&self) -> Result<&str> {
        self.current_key("key")
    }

    fn value(&self) -> Result<Value> {
        let key = self.current_key("value")?;
        self.store.get(key, None)
    }

    fn seek(&mut self, key: &str) -> Result<()> {
        match self.keys.binary_search_by(|k| k.as_str().cmp(key)) {
            Ok(i) => {
                self.current = Some(i);
                self.next_pos = i + 1;
                Ok(())
            }
            Err(_) => Err(Error::KeyNotFound(key.to_string())),
        }
    }

    fn delete(&mut self) -> Result<bool> {
        let i = self.current.take().ok_or(Error::CursorNotPositioned("delete"))?;
        self.store.remove(&self.keys[i]);
        Ok(true)
    }
}
