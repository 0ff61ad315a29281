//! NamespacedStore: prefixed scalar storage over a primitive store
//!
//! ## Design
//!
//! NamespacedStore is a stateless facade over a `KvStore`. It holds only an
//! `Arc<dyn KvStore>`, its namespace string and the namespace lock.
//!
//! ## Key Layout
//!
//! - Key format: `<namespace>:<key>`
//! - The empty namespace adds no prefix: `<key>`
//!
//! Prefixing is plain string concatenation; a key containing `:` is not
//! escaped. Lists and maps are sub-namespaces of the same store
//! (`<namespace>:<base>:<...>`).
//!
//! ## JSON Encoding
//!
//! `*_json` operations store the value as a `Value::String` holding its
//! JSON text and decode it on read. Raw operations store the `Value` as is.
//!
//! ## Error Policy
//!
//! Writes report `false` when the primitive rejects them (key too long,
//! value too large, non-numeric counter). Reads return
//! `Err(KeyNotFound)` when the key is absent and no default is given.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::ReentrantMutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use stratakv_core::{KvCursor, KvStore, Result, Value};

use crate::list::IndexedList;
use crate::map::KeyedMap;

/// Shared lock serializing multi-write sequences within one namespace
pub(crate) type NamespaceLock = Arc<ReentrantMutex<()>>;

/// Encode any serializable value as stored JSON text
pub(crate) fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(Value::String(serde_json::to_string(value)?))
}

/// Decode a stored value written in JSON mode
///
/// Strings are parsed as JSON text. Anything else was written raw and is
/// taken as already structured.
pub(crate) fn decode_json<T: DeserializeOwned>(raw: Value) -> Result<T> {
    match raw {
        Value::String(text) => Ok(serde_json::from_str(&text)?),
        other => Ok(serde_json::from_value(other.into())?),
    }
}

/// Namespaced scalar store
///
/// Cloning is cheap; clones share the store and the namespace lock.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use stratakv_primitives::NamespacedStore;
/// use stratakv_storage::MemoryStore;
///
/// let kv = NamespacedStore::new(Arc::new(MemoryStore::new()), "app");
/// kv.set("visits", 1);
/// kv.incr("visits", 1);
/// assert_eq!(kv.get("visits", None)?, Value::Int(2));
/// ```
#[derive(Clone)]
pub struct NamespacedStore {
    store: Arc<dyn KvStore>,
    namespace: String,
    lock: NamespaceLock,
}

impl NamespacedStore {
    /// Create a namespaced view with its own lock
    ///
    /// Views created this way do not coordinate with each other even when
    /// they share a namespace; use [`crate::Keyspace`] for that.
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> Self {
        Self::with_lock(store, namespace.into(), Arc::new(ReentrantMutex::new(())))
    }

    pub(crate) fn with_lock(store: Arc<dyn KvStore>, namespace: String, lock: NamespaceLock) -> Self {
        NamespacedStore {
            store,
            namespace,
            lock,
        }
    }

    /// The namespace prefix (may be empty)
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The underlying primitive store
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Primitive key for `key` in this namespace
    pub fn full_key(&self, key: &str) -> String {
        if self.namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.namespace, key)
        }
    }

    pub(crate) fn lock_handle(&self) -> NamespaceLock {
        Arc::clone(&self.lock)
    }

    /// Store a raw value
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        self.store.set(&self.full_key(key), value.into(), None)
    }

    /// Store a raw value that the primitive drops after `ttl`
    pub fn set_with_expiry(&self, key: &str, value: impl Into<Value>, ttl: Duration) -> bool {
        self.store.set(&self.full_key(key), value.into(), Some(ttl))
    }

    /// Store a value as JSON text
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match encode_json(value) {
            Ok(encoded) => self.store.set(&self.full_key(key), encoded, None),
            Err(e) => {
                debug!(key, error = %e, "value could not be encoded");
                false
            }
        }
    }

    /// Read a raw value
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if the key is absent and `default` is `None`.
    pub fn get(&self, key: &str, default: Option<Value>) -> Result<Value> {
        self.store.get(&self.full_key(key), default)
    }

    /// Read and decode a JSON value
    ///
    /// The default is JSON-encoded before it reaches the primitive, so a
    /// stored value and a defaulted one decode the same way.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if the key is absent and `default` is `None`;
    /// `Serialization` if the stored text is not valid JSON for `T`.
    pub fn get_json<T>(&self, key: &str, default: Option<&T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let default = default.map(encode_json).transpose()?;
        decode_json(self.store.get(&self.full_key(key), default)?)
    }

    /// Remove a key; absent keys are a no-op
    pub fn remove(&self, key: &str) {
        self.store.remove(&self.full_key(key));
    }

    /// Delete every entry in the namespace, returns count deleted
    ///
    /// Deletes one entry at a time through a cursor: O(entries), and an
    /// interruption leaves the namespace partially cleared.
    pub fn clear(&self) -> Result<usize> {
        let lock = self.lock_handle();
        let _guard = lock.lock();

        let mut cursor = self.iter("");
        let mut deleted = 0;
        while cursor.next() {
            if cursor.delete()? {
                deleted += 1;
            }
        }
        debug!(namespace = %self.namespace, deleted, "namespace cleared");
        Ok(deleted)
    }

    /// Increase a stored number; `false` if absent or non-numeric
    pub fn incr(&self, key: &str, amount: i64) -> bool {
        self.store.incr(&self.full_key(key), amount)
    }

    /// Decrease a stored number; `false` if absent or non-numeric
    pub fn decr(&self, key: &str, amount: i64) -> bool {
        self.store.decr(&self.full_key(key), amount)
    }

    /// Cursor over raw entries under `<namespace>:<prefix>`
    pub fn iter(&self, prefix: &str) -> ScalarIterator<'_> {
        ScalarIterator::new(self.store.iter(&self.full_key(prefix)), false)
    }

    /// Cursor over JSON entries under `<namespace>:<prefix>`
    pub fn iter_json(&self, prefix: &str) -> ScalarIterator<'_> {
        ScalarIterator::new(self.store.iter(&self.full_key(prefix)), true)
    }

    /// Indexed list of raw values at `<namespace>:<key>`
    ///
    /// Loads the list's `count` and `freeIndices` metadata.
    pub fn list(&self, key: &str) -> Result<IndexedList> {
        IndexedList::open(self.clone(), key, false)
    }

    /// Indexed list of JSON-encoded values at `<namespace>:<key>`
    pub fn list_json(&self, key: &str) -> Result<IndexedList> {
        IndexedList::open(self.clone(), key, true)
    }

    /// Map of JSON records keyed by `attribute`, at `<namespace>:<key>`
    pub fn map(&self, key: &str, attribute: &str) -> KeyedMap {
        KeyedMap::new(self.clone(), key, attribute)
    }
}

impl std::fmt::Debug for NamespacedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Cursor over a namespace prefix, optionally decoding JSON
///
/// The set of keys is fixed when the cursor is created. `key`, `value` and
/// `delete` need a current entry (a `next` that returned `true`, not yet
/// deleted) and fail with `CursorNotPositioned` otherwise.
pub struct ScalarIterator<'a> {
    cursor: Box<dyn KvCursor + 'a>,
    json: bool,
}

impl<'a> ScalarIterator<'a> {
    pub(crate) fn new(cursor: Box<dyn KvCursor + 'a>, json: bool) -> Self {
        ScalarIterator { cursor, json }
    }

    /// Advance; returns whether an entry was found
    pub fn next(&mut self) -> bool {
        self.cursor.next()
    }

    /// Full primitive key of the current entry
    pub fn key(&self) -> Result<&str> {
        self.cursor.key()
    }

    /// Current value, JSON-decoded if the cursor was opened in JSON mode
    pub fn value(&self) -> Result<Value> {
        let raw = self.cursor.value()?;
        if self.json {
            decode_json(raw)
        } else {
            Ok(raw)
        }
    }

    /// Current value decoded as JSON into `T`, regardless of mode
    pub fn value_as<T: DeserializeOwned>(&self) -> Result<T> {
        decode_json(self.cursor.value()?)
    }

    /// Position on a full primitive key inside the cursor's snapshot
    pub fn seek(&mut self, key: &str) -> Result<()> {
        self.cursor.seek(key)
    }

    /// Delete the current entry
    pub fn delete(&mut self) -> Result<bool> {
        self.cursor.delete()
    }

    /// Drain the remaining entries as `(key, value)` pairs
    pub fn collect_entries(mut self) -> Result<Vec<(String, Value)>> {
        let mut entries = Vec::new();
        while self.next() {
            entries.push((self.key()?.to_string(), self.value()?));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratakv_core::Error;
    use stratakv_storage::MemoryStore;

    fn setup(namespace: &str) -> (Arc<MemoryStore>, NamespacedStore) {
        let store = Arc::new(MemoryStore::new());
        let kv = NamespacedStore::new(store.clone(), namespace);
        (store, kv)
    }

    #[test]
    fn test_set_writes_literal_prefixed_key() {
        let (store, kv) = setup("namespace");
        assert!(kv.set("key", "value"));
        assert_eq!(store.get("namespace:key", None).unwrap(), Value::from("value"));
    }

    #[test]
    fn test_empty_namespace_adds_no_prefix() {
        let (store, kv) = setup("");
        kv.set("key", "value");
        assert_eq!(store.get("key", None).unwrap(), Value::from("value"));
        assert_eq!(kv.full_key("key"), "key");
    }

    #[test]
    fn test_get_default() {
        let (_store, kv) = setup("ns");
        let value = kv.get("key", Some(Value::from("default"))).unwrap();
        assert_eq!(value, Value::from("default"));
    }

    #[test]
    fn test_get_missing_is_key_not_found() {
        let (_store, kv) = setup("ns");
        let err = kv.get("missing", None).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_json_round_trip() {
        let (store, kv) = setup("ns");
        assert!(kv.set_json("key", &json!({"a": 1})));
        let back: serde_json::Value = kv.get_json("key", None).unwrap();
        assert_eq!(back, json!({"a": 1}));
        // Stored as text
        assert_eq!(store.get("ns:key", None).unwrap(), Value::from(r#"{"a":1}"#));
    }

    #[test]
    fn test_json_default_is_encoded_then_decoded() {
        let (_store, kv) = setup("ns");
        let back: Vec<u32> = kv.get_json("missing", Some(&vec![1, 2])).unwrap();
        assert_eq!(back, vec![1, 2]);
    }

    #[test]
    fn test_json_decode_of_raw_number() {
        let (_store, kv) = setup("ns");
        kv.set("n", 5);
        let n: i64 = kv.get_json("n", None).unwrap();
        assert_eq!(n, 5);
    }

    #[test]
    fn test_json_decode_failure() {
        let (_store, kv) = setup("ns");
        kv.set("bad", "{not json");
        let err = kv.get_json::<serde_json::Value>("bad", None).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_set_rejects_long_key() {
        let (_store, kv) = setup("ns");
        assert!(!kv.set(&"k".repeat(254), 1));
        assert!(kv.set(&"k".repeat(253), 1));
    }

    #[test]
    fn test_incr_decr() {
        let (store, kv) = setup("");
        store.set("key", Value::Int(1), None);
        assert!(kv.incr("key", 1));
        assert_eq!(store.get("key", None).unwrap(), Value::Int(2));
        assert!(kv.decr("key", 1));
        assert_eq!(store.get("key", None).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_incr_non_numeric() {
        let (_store, kv) = setup("ns");
        kv.set("s", "text");
        assert!(!kv.incr("s", 1));
        assert!(!kv.decr("missing", 1));
    }

    #[test]
    fn test_remove() {
        let (store, kv) = setup("");
        store.set("key", Value::from("value"), None);
        kv.remove("key");
        assert!(store.get("key", None).is_err());
        kv.remove("key");
    }

    #[test]
    fn test_clear_only_touches_namespace() {
        let store = Arc::new(MemoryStore::new());
        let a = NamespacedStore::new(store.clone(), "a");
        let ab = NamespacedStore::new(store.clone(), "ab");
        for i in 0..5 {
            a.set(&format!("k{}", i), i);
        }
        ab.set("k", 1);

        assert_eq!(a.clear().unwrap(), 5);
        let mut cursor = a.iter("");
        assert!(!cursor.next());
        assert_eq!(ab.get("k", None).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_clear_empty_namespace_removes_everything() {
        let (store, kv) = setup("");
        store.set("key", Value::from("value"), None);
        kv.clear().unwrap();
        assert!(store.get("key", None).is_err());
    }

    #[test]
    fn test_iter() {
        let (store, kv) = setup("");
        store.set("key1", Value::from("value1"), None);
        store.set("key2", Value::from("value2"), None);

        let mut it = kv.iter("");
        assert!(it.next());
        assert_eq!(it.key().unwrap(), "key1");
        assert_eq!(it.value().unwrap(), Value::from("value1"));
        assert!(it.next());
        assert_eq!(it.key().unwrap(), "key2");
        assert_eq!(it.value().unwrap(), Value::from("value2"));
        assert!(!it.next());
    }

    #[test]
    fn test_iter_prefix_and_json() {
        let (_store, kv) = setup("ns");
        kv.set_json("user:1", &json!({"n": 1}));
        kv.set_json("user:2", &json!({"n": 2}));
        kv.set("other", 3);

        let entries = kv.iter_json("user:").collect_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "ns:user:1");
        assert_eq!(serde_json::Value::from(entries[1].1.clone()), json!({"n": 2}));
    }

    #[test]
    fn test_iter_before_next_fails_fast() {
        let (_store, kv) = setup("ns");
        kv.set("a", 1);
        let mut it = kv.iter("");
        assert!(matches!(it.key(), Err(Error::CursorNotPositioned(_))));
        assert!(matches!(it.value(), Err(Error::CursorNotPositioned(_))));
        assert!(matches!(it.delete(), Err(Error::CursorNotPositioned(_))));
    }

    #[test]
    fn test_iter_seek() {
        let (_store, kv) = setup("ns");
        for key in ["a", "b", "c"] {
            kv.set(key, key);
        }
        let mut it = kv.iter("");
        it.seek("ns:b").unwrap();
        assert_eq!(it.value().unwrap(), Value::from("b"));
        assert!(it.next());
        assert_eq!(it.key().unwrap(), "ns:c");
    }

    #[test]
    fn test_set_with_expiry() {
        let (_store, kv) = setup("ns");
        assert!(kv.set_with_expiry("gone", 1, Duration::ZERO));
        assert!(kv.get("gone", None).is_err());
        assert!(kv.set_with_expiry("kept", 1, Duration::from_secs(3600)));
        assert_eq!(kv.get("kept", None).unwrap(), Value::Int(1));
    }
}
