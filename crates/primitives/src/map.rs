//! KeyedMap: JSON records addressed by one of their own attributes
//!
//! A record `{"key": "u1", ...}` in a map with base `users` and attribute
//! `key` is stored as JSON text at `users:u1`. String attributes are used
//! as is; numbers and booleans are stringified, with integral floats
//! losing their fraction (`1.0` is keyed `1`). Setting a record whose
//! attribute changed writes a new slot and leaves the old one in place:
//! remove it explicitly.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use stratakv_core::{Error, Result};

use crate::namespace::{NamespacedStore, ScalarIterator};

/// Slot key for a numeric attribute
fn number_key(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f == 0.0 => "0".to_string(),
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}

/// Map of JSON records keyed by a named attribute
#[derive(Debug, Clone)]
pub struct KeyedMap {
    kv: NamespacedStore,
    base: String,
    attribute: String,
}

impl KeyedMap {
    pub(crate) fn new(kv: NamespacedStore, base: &str, attribute: &str) -> Self {
        KeyedMap {
            kv,
            base: base.to_string(),
            attribute: attribute.to_string(),
        }
    }

    /// Base key of this map within its namespace
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Name of the attribute records are keyed by
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    fn key(&self, record_key: &str) -> String {
        format!("{}:{}", self.base, record_key)
    }

    /// Extract the slot key from a record
    fn record_key(&self, record: &serde_json::Value) -> Result<String> {
        let invalid = || Error::InvalidAttribute {
            attribute: self.attribute.clone(),
        };
        match record.get(&self.attribute).ok_or_else(invalid)? {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(number_key(n)),
            serde_json::Value::Bool(b) => Ok(b.to_string()),
            _ => Err(invalid()),
        }
    }

    /// Store `record` at the slot named by its attribute, overwriting
    ///
    /// Returns `false` if the record has no usable attribute value or the
    /// write is rejected.
    pub fn set<T: Serialize + ?Sized>(&self, record: &T) -> bool {
        let record = match serde_json::to_value(record) {
            Ok(record) => record,
            Err(e) => {
                debug!(base = %self.base, error = %e, "record could not be encoded");
                return false;
            }
        };
        match self.record_key(&record) {
            Ok(record_key) => self.kv.set_json(&self.key(&record_key), &record),
            Err(e) => {
                warn!(base = %self.base, error = %e, "record rejected");
                false
            }
        }
    }

    /// Record stored under `key`
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if absent; `Serialization` if it does not decode as `T`.
    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.kv.get_json(&self.key(key), None)
    }

    /// Record stored under `key`, or `default` if absent
    pub fn get_or<T>(&self, key: &str, default: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.kv.get_json(&self.key(key), Some(default))
    }

    /// Check if a record is stored under `key`
    pub fn contains(&self, key: &str) -> Result<bool> {
        match self.kv.get(&self.key(key), None) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove the record under `key`; absent keys are a no-op
    pub fn remove(&self, key: &str) {
        self.kv.remove(&self.key(key));
    }

    /// Delete every record, returns count deleted
    pub fn clear(&self) -> Result<usize> {
        let lock = self.kv.lock_handle();
        let _guard = lock.lock();

        let mut it = self.iter();
        let mut deleted = 0;
        while it.next() {
            if it.delete()? {
                deleted += 1;
            }
        }
        debug!(base = %self.base, deleted, "map cleared");
        Ok(deleted)
    }

    /// Record keys in ascending order
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut it = self.iter();
        let mut keys = Vec::new();
        while it.next() {
            keys.push(it.record_key()?.to_string());
        }
        Ok(keys)
    }

    /// Cursor over every record, decoded from JSON
    pub fn iter(&self) -> MapIterator<'_> {
        let prefix = self.key("");
        MapIterator {
            full_prefix: self.kv.full_key(&prefix),
            inner: self.kv.iter_json(&prefix),
        }
    }
}

/// Cursor over a map's records
///
/// Same positioning rules as [`ScalarIterator`].
pub struct MapIterator<'a> {
    inner: ScalarIterator<'a>,
    full_prefix: String,
}

impl MapIterator<'_> {
    /// Advance; returns whether a record was found
    pub fn next(&mut self) -> bool {
        self.inner.next()
    }

    /// Full primitive key of the current record
    pub fn key(&self) -> Result<&str> {
        self.inner.key()
    }

    /// Attribute value the current record is stored under
    pub fn record_key(&self) -> Result<&str> {
        let key = self.inner.key()?;
        Ok(key.strip_prefix(self.full_prefix.as_str()).unwrap_or(key))
    }

    /// Current record as a [`stratakv_core::Value`]
    pub fn value(&self) -> Result<stratakv_core::Value> {
        self.inner.value()
    }

    /// Current record decoded into `T`
    pub fn value_as<T: DeserializeOwned>(&self) -> Result<T> {
        self.inner.value_as()
    }

    /// Delete the current record
    pub fn delete(&mut self) -> Result<bool> {
        self.inner.delete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;
    use stratakv_core::{KvStore, Value};
    use stratakv_storage::MemoryStore;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: String,
        name: String,
    }

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn setup() -> (Arc<MemoryStore>, KeyedMap) {
        let store = Arc::new(MemoryStore::new());
        let kv = NamespacedStore::new(store.clone(), "ns");
        (store, kv.map("users", "id"))
    }

    #[test]
    fn test_set_and_get() {
        let (store, map) = setup();
        assert!(map.set(&user("u1", "Ann")));
        assert_eq!(map.get::<User>("u1").unwrap(), user("u1", "Ann"));
        assert_eq!(
            store.get("ns:users:u1", None).unwrap(),
            Value::from(r#"{"id":"u1","name":"Ann"}"#)
        );
    }

    #[test]
    fn test_set_overwrites() {
        let (_store, map) = setup();
        map.set(&user("u1", "Ann"));
        map.set(&user("u1", "Bea"));
        assert_eq!(map.keys().unwrap(), vec!["u1"]);
        assert_eq!(map.get::<User>("u1").unwrap().name, "Bea");
    }

    #[test]
    fn test_set_without_attribute_is_rejected() {
        let (store, map) = setup();
        assert!(!map.set(&json!({"name": "nobody"})));
        assert!(!map.set(&json!({"id": null})));
        assert!(!map.set(&json!({"id": ["a"]})));
        assert!(!map.set(&json!("not a record")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_numeric_attribute_is_stringified() {
        let (_store, map) = setup();
        assert!(map.set(&json!({"id": 7, "n": 1})));
        assert!(map.set(&json!({"id": true})));
        assert!(map.contains("7").unwrap());
        assert!(map.contains("true").unwrap());
    }

    #[test]
    fn test_integral_float_attribute_keys_like_integer() {
        let (store, map) = setup();
        assert!(map.set(&json!({"id": 1.0, "n": 1})));
        assert!(map.set(&json!({"id": 2.5})));
        assert!(map.set(&json!({"id": -0.0})));
        assert_eq!(map.keys().unwrap(), vec!["0", "1", "2.5"]);
        assert!(store.get("ns:users:1", None).is_ok());

        map.set(&json!({"id": 1, "n": 2}));
        assert_eq!(map.get::<serde_json::Value>("1").unwrap(), json!({"id": 1, "n": 2}));
        assert_eq!(map.keys().unwrap().len(), 3);
    }

    #[test]
    fn test_get_missing() {
        let (_store, map) = setup();
        assert!(map.get::<User>("nope").unwrap_err().is_not_found());
        let fallback = user("x", "default");
        assert_eq!(map.get_or("nope", &fallback).unwrap(), fallback);
    }

    #[test]
    fn test_attribute_change_leaves_old_slot() {
        let (_store, map) = setup();
        let mut record = user("u1", "Ann");
        map.set(&record);
        record.id = "u9".to_string();
        map.set(&record);
        assert_eq!(map.keys().unwrap(), vec!["u1", "u9"]);
    }

    #[test]
    fn test_remove_then_iter() {
        let (_store, map) = setup();
        map.set(&json!({"id": "u1", "n": 1}));
        map.set(&json!({"id": "u2", "n": 2}));
        map.remove("u1");
        map.remove("u1");

        let mut it = map.iter();
        assert!(it.next());
        assert_eq!(it.record_key().unwrap(), "u2");
        assert_eq!(it.key().unwrap(), "ns:users:u2");
        assert_eq!(it.value_as::<serde_json::Value>().unwrap(), json!({"id": "u2", "n": 2}));
        assert!(!it.next());
    }

    #[test]
    fn test_clear_leaves_neighbors() {
        let (store, map) = setup();
        map.set(&user("a", "A"));
        map.set(&user("b", "B"));
        store.set("ns:usersX", Value::Int(1), None);
        store.set("ns:other:a", Value::Int(1), None);
        assert_eq!(map.clear().unwrap(), 2);
        assert!(map.keys().unwrap().is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_iter_delete() {
        let (_store, map) = setup();
        map.set(&user("a", "A"));
        map.set(&user("b", "B"));
        let mut it = map.iter();
        while it.next() {
            if it.record_key().unwrap() == "a" {
                assert!(it.delete().unwrap());
            }
        }
        assert_eq!(map.keys().unwrap(), vec!["b"]);
    }
}
