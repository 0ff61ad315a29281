//! The primitive store contract
//!
//! `KvStore` is the flat keyed store the layered primitives are built on.
//! It offers single-key operations and prefix iteration only: no
//! transactions, no multi-key atomicity. A host environment supplies the
//! real implementation; `stratakv-storage` ships an in-memory one.
//!
//! Thread safety: implementations must be `Send + Sync`. Individual calls
//! are expected to be atomic with respect to one key; nothing more.

use std::time::Duration;

use crate::error::Result;
use crate::value::Value;

/// Flat string-keyed storage with length/size limits
pub trait KvStore: Send + Sync {
    /// Retrieve a stored value by key
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` if the key is absent and `default` is `None`
    /// - `KeyTooLong` if the key exceeds the store's limit
    fn get(&self, key: &str, default: Option<Value>) -> Result<Value>;

    /// Store a value on a key, optionally expiring after `expire`
    ///
    /// Returns `false` if the key is too long, the value too large, or the
    /// store otherwise rejects the write.
    fn set(&self, key: &str, value: Value, expire: Option<Duration>) -> bool;

    /// Increase a stored number by `amount`
    ///
    /// Returns `false` if the key is absent, too long, or holds a
    /// non-numeric value.
    fn incr(&self, key: &str, amount: i64) -> bool;

    /// Decrease a stored number by `amount`
    ///
    /// Same failure modes as [`KvStore::incr`].
    fn decr(&self, key: &str, amount: i64) -> bool;

    /// Remove a key; absent keys are a no-op
    fn remove(&self, key: &str);

    /// Remove every entry in the store
    ///
    /// The layered primitives never call this; they clear by scoped
    /// iteration so other namespaces survive.
    fn clear(&self) -> bool;

    /// Cursor over entries whose key starts with `prefix`, in key order
    fn iter(&self, prefix: &str) -> Box<dyn KvCursor + '_>;
}

/// Cursor over a prefix of a [`KvStore`]
///
/// `key`, `value` and `delete` require a current entry: one established by
/// a `next` that returned `true` (or a successful `seek`) and not yet
/// deleted. Otherwise they fail with `CursorNotPositioned`.
pub trait KvCursor {
    /// Fetch the next key; returns `true` if one was fetched
    fn next(&mut self) -> bool;

    /// Current key
    fn key(&self) -> Result<&str>;

    /// Current value
    fn value(&self) -> Result<Value>;

    /// Position the cursor on `key`; the following `next` moves past it
    fn seek(&mut self, key: &str) -> Result<()>;

    /// Delete the current entry
    ///
    /// Returns `Ok(false)` if the store refused the delete.
    fn delete(&mut self) -> Result<bool>;
}
