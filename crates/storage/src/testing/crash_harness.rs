//! Crash harness: a store wrapper that stops accepting writes
//!
//! `CrashingStore` forwards to an inner store until a write budget is
//! spent. Every mutating call after that behaves as if the process died
//! before it reached the store: `set`/`incr`/`decr` return `false`, and
//! `remove` and cursor `delete` do nothing. Reads keep working so tests can inspect the
//! state a real interruption would leave behind.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use stratakv_core::{KvCursor, KvStore, Result, Value};

/// Store wrapper that crashes after a fixed number of writes
pub struct CrashingStore<S> {
    inner: S,
    remaining: AtomicUsize,
    dropped: AtomicUsize,
}

impl<S: KvStore> CrashingStore<S> {
    /// Wrap `inner`, allowing `writes_before_crash` more mutating calls
    pub fn new(inner: S, writes_before_crash: usize) -> Self {
        CrashingStore {
            inner,
            remaining: AtomicUsize::new(writes_before_crash),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Number of writes swallowed after the crash point
    pub fn dropped_writes(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Whether the crash point has been reached
    pub fn crashed(&self) -> bool {
        self.remaining.load(Ordering::SeqCst) == 0
    }

    /// The wrapped store, for post-crash inspection
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Consume one unit of write budget; false once crashed
    fn admit(&self) -> bool {
        let admitted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !admitted {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
        admitted
    }
}

impl<S: KvStore> KvStore for CrashingStore<S> {
    fn get(&self, key: &str, default: Option<Value>) -> Result<Value> {
        self.inner.get(key, default)
    }

    fn set(&self, key: &str, value: Value, expire: Option<Duration>) -> bool {
        self.admit() && self.inner.set(key, value, expire)
    }

    fn incr(&self, key: &str, amount: i64) -> bool {
        self.admit() && self.inner.incr(key, amount)
    }

    fn decr(&self, key: &str, amount: i64) -> bool {
        self.admit() && self.inner.decr(key, amount)
    }

    fn remove(&self, key: &str) {
        if self.admit() {
            self.inner.remove(key);
        }
    }

    fn clear(&self) -> bool {
        self.admit() && self.inner.clear()
    }

    fn iter(&self, prefix: &str) -> Box<dyn KvCursor + '_> {
        Box::new(CrashingCursor {
            store: self,
            inner: self.inner.iter(prefix),
        })
    }
}

/// Cursor whose deletes draw on the owning store's write budget
struct CrashingCursor<'a, S> {
    store: &'a CrashingStore<S>,
    inner: Box<dyn KvCursor + 'a>,
}

impl<S: KvStore> KvCursor for CrashingCursor<'_, S> {
    fn next(&mut self) -> bool {
        self.inner.next()
    }

    fn key(&self) -> Result<&str> {
        self.inner.key()
    }

    fn value(&self) -> Result<Value> {
        self.inner.value()
    }

    fn seek(&mut self, key: &str) -> Result<()> {
        self.inner.seek(key)
    }

    fn delete(&mut self) -> Result<bool> {
        // Positioning errors win over the crash
        self.inner.key()?;
        if self.store.admit() {
            self.inner.delete()
        } else {
            Ok(false)
        }
    }
}
