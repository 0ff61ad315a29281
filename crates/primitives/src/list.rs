//! IndexedList: append-oriented list with slot reuse and compaction
//!
//! ## Key Layout
//!
//! Under a namespaced store, a list with base `b` occupies:
//! - `b:count`: next unused index (integer)
//! - `b:freeIndices`: JSON array of reusable indices, ascending
//! - `b:<index>`: one element per live index
//!
//! Every index in `[0, count)` is either live or listed in `freeIndices`.
//!
//! ## Slot Lifecycle
//!
//! unallocated → live (`add`) → tombstoned (`remove`) → live again (`add`
//! reuses the smallest free index) | renumbered (`defrag`).
//!
//! ## Consistency
//!
//! `add` writes the element, then `count`, then `freeIndices`. `remove`
//! deletes the element, then writes `freeIndices`. These are independent
//! primitive writes with no transaction: an interruption between them can
//! leave metadata disagreeing with the stored elements. Nothing repairs
//! this automatically; [`IndexedList::verify`] reports it.
//!
//! Every mutation rewrites the whole free list, so cost grows with the
//! number of tombstones. `defrag` empties it.
//!
//! ## Concurrency
//!
//! Mutations hold the namespace lock and reload metadata from the store
//! before applying, so handles sharing a lock (see [`crate::Keyspace`]) see
//! each other's writes.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use stratakv_core::{Error, Result, Value};

use crate::namespace::{decode_json, encode_json, NamespacedStore};

const COUNT_KEY: &str = "count";
const FREE_INDICES_KEY: &str = "freeIndices";

/// Parse a stored `count`, accepting numeric strings
fn parse_count(raw: Value) -> Result<u64> {
    match raw {
        Value::Int(n) if n >= 0 => Ok(n as u64),
        Value::Float(f) if f >= 0.0 && f.is_finite() => Ok(f as u64),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| Error::Serialization(format!("list count is not a number: {:?}", s))),
        other => Err(Error::Serialization(format!(
            "list count has type {}",
            other.type_name()
        ))),
    }
}

/// Parse a stored `freeIndices` array, as written (unsorted, duplicates kept)
fn parse_free_indices(raw: Value) -> Result<Vec<u64>> {
    decode_json(raw)
}

/// Result of [`IndexedList::verify`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListHealth {
    /// Persisted `count`
    pub count: u64,
    /// Number of live elements found in `[0, count)`
    pub live: usize,
    /// Indices in `[0, count)` with no element and not free
    pub missing: Vec<u64>,
    /// Free indices that still have a stored element
    pub free_but_live: Vec<u64>,
    /// Stored elements at or beyond `count`
    pub beyond_count: Vec<u64>,
    /// Free entries that are `>= count` or repeated
    pub invalid_free: Vec<u64>,
}

impl ListHealth {
    /// True if metadata and elements agree
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty()
            && self.free_but_live.is_empty()
            && self.beyond_count.is_empty()
            && self.invalid_free.is_empty()
    }
}

/// Indexed list over a namespaced store
///
/// Holds a copy of `count` and `freeIndices` loaded when the list is opened
/// and refreshed before each mutation.
///
/// # Example
///
/// ```ignore
/// let mut list = kv.list("queue")?;
/// list.add("a");
/// list.add("b");
/// list.remove(0);
/// list.add("c"); // reuses index 0
/// assert_eq!(list.get_all()?, vec![Value::from("c"), Value::from("b")]);
/// ```
#[derive(Debug)]
pub struct IndexedList {
    kv: NamespacedStore,
    base: String,
    json: bool,
    length: u64,
    free: Vec<u64>,
}

impl IndexedList {
    /// Open a list at `base`, loading its metadata (absent = empty list)
    pub(crate) fn open(kv: NamespacedStore, base: &str, json: bool) -> Result<Self> {
        let mut list = IndexedList {
            kv,
            base: base.to_string(),
            json,
            length: 0,
            free: Vec::new(),
        };
        list.refresh()?;
        Ok(list)
    }

    fn key(&self, suffix: impl std::fmt::Display) -> String {
        format!("{}:{}", self.base, suffix)
    }

    /// Base key of this list within its namespace
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Number of allocated slots, live or free (the persisted `count`)
    pub fn count(&self) -> u64 {
        self.length
    }

    /// Number of live elements
    pub fn len(&self) -> usize {
        (self.length as usize).saturating_sub(self.free.len())
    }

    /// Check if the list has no live elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tombstoned indices, ascending
    pub fn free_indices(&self) -> &[u64] {
        &self.free
    }

    fn is_free(&self, index: u64) -> bool {
        self.free.binary_search(&index).is_ok()
    }

    fn read_count(&self) -> Result<u64> {
        parse_count(self.kv.get(&self.key(COUNT_KEY), Some(Value::Int(0)))?)
    }

    fn read_free(&self) -> Result<Vec<u64>> {
        parse_free_indices(self.kv.get(&self.key(FREE_INDICES_KEY), Some(Value::from("[]")))?)
    }

    /// Reload `count` and `freeIndices` from the store
    pub fn refresh(&mut self) -> Result<()> {
        self.length = self.read_count()?;
        let mut free = self.read_free()?;
        free.sort_unstable();
        free.dedup();
        self.free = free;
        Ok(())
    }

    fn persist_count(&self) -> bool {
        self.kv.set(&self.key(COUNT_KEY), Value::Int(self.length as i64))
    }

    fn persist_free(&self) -> bool {
        match serde_json::to_string(&self.free) {
            Ok(text) => self.kv.set(&self.key(FREE_INDICES_KEY), text),
            Err(_) => false,
        }
    }

    fn encode(&self, value: Value) -> Result<Value> {
        if self.json {
            encode_json(&value)
        } else {
            Ok(value)
        }
    }

    fn read(&self, index: u64) -> Result<Value> {
        let raw = self.kv.get(&self.key(index), None)?;
        if self.json {
            decode_json(raw)
        } else {
            Ok(raw)
        }
    }

    /// Append a value, reusing the smallest free index if there is one
    ///
    /// Returns `false` if the element could not be written (nothing is
    /// allocated then) or if persisting the metadata afterwards failed.
    pub fn add(&mut self, value: impl Into<Value>) -> bool {
        let lock = self.kv.lock_handle();
        let _guard = lock.lock();
        if let Err(e) = self.refresh() {
            warn!(base = %self.base, error = %e, "list metadata unreadable, add refused");
            return false;
        }

        let reused = !self.free.is_empty();
        let index = if reused { self.free[0] } else { self.length };

        let written = match self.encode(value.into()) {
            Ok(stored) => self.kv.set(&self.key(index), stored),
            Err(e) => {
                debug!(base = %self.base, error = %e, "list element could not be encoded");
                false
            }
        };
        if !written {
            debug!(base = %self.base, index, "list element write rejected");
            return false;
        }

        if reused {
            self.free.remove(0);
        } else {
            self.length += 1;
        }
        let count_ok = self.persist_count();
        let free_ok = self.persist_free();
        count_ok && free_ok
    }

    /// Element at `index`
    ///
    /// Returns `Ok(None)` for a tombstoned index.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if no element is stored at `index` and it is not free
    /// (never allocated, or metadata out of sync).
    pub fn get(&self, index: u64) -> Result<Option<Value>> {
        if self.is_free(index) {
            return Ok(None);
        }
        self.read(index).map(Some)
    }

    /// All live elements in ascending index order
    ///
    /// O(count): tombstones are walked too.
    pub fn get_all(&self) -> Result<Vec<Value>> {
        let mut items = Vec::with_capacity(self.len());
        for index in 0..self.length {
            if !self.is_free(index) {
                items.push(self.read(index)?);
            }
        }
        Ok(items)
    }

    /// Tombstone `index`: free it for reuse and delete its element
    ///
    /// Does not shift later elements or shrink `count`. Returns `false`
    /// without writing anything if `index` is already free or was never
    /// allocated.
    pub fn remove(&mut self, index: u64) -> bool {
        let lock = self.kv.lock_handle();
        let _guard = lock.lock();
        if let Err(e) = self.refresh() {
            warn!(base = %self.base, error = %e, "list metadata unreadable, remove refused");
            return false;
        }

        let pos = match self.free.binary_search(&index) {
            Ok(_) => return false,
            Err(_) if index >= self.length => return false,
            Err(pos) => pos,
        };
        self.free.insert(pos, index);
        self.kv.remove(&self.key(index));
        self.persist_free()
    }

    /// Remove every element and reset `count` and `freeIndices`
    ///
    /// Returns `false` if the reset metadata could not be written.
    pub fn clear(&mut self) -> bool {
        let lock = self.kv.lock_handle();
        let _guard = lock.lock();
        // Unreadable metadata still gets reset, using the last known count
        if let Err(e) = self.refresh() {
            warn!(base = %self.base, error = %e, "list metadata unreadable, clearing cached range");
        }

        for index in 0..self.length {
            self.kv.remove(&self.key(index));
        }
        info!(base = %self.base, slots = self.length, "list cleared");
        self.length = 0;
        self.free.clear();
        let count_ok = self.persist_count();
        let free_ok = self.persist_free();
        count_ok && free_ok
    }

    /// Renumber live elements densely from 0, preserving order
    ///
    /// Reads every element, clears the list and re-adds them. Indices held
    /// by callers are invalid afterwards. Returns the number re-added; a
    /// value lower than the previous `len()` means some re-adds failed and
    /// those elements are lost.
    ///
    /// # Errors
    ///
    /// `WriteRejected` if the metadata reset in `clear` fails. Nothing is
    /// re-added then: the old elements are already removed, and appending
    /// after the stale `count` would leave `[0, count)` unaccounted for.
    pub fn defrag(&mut self) -> Result<usize> {
        let lock = self.kv.lock_handle();
        let _guard = lock.lock();
        self.refresh()?;

        let items = self.get_all()?;
        let expected = items.len();
        let reclaimed = self.free.len();
        if !self.clear() {
            warn!(base = %self.base, expected, "defrag aborted, list metadata reset rejected");
            return Err(Error::WriteRejected(self.kv.full_key(&self.key(COUNT_KEY))));
        }

        let mut added = 0;
        for item in items {
            if self.add(item) {
                added += 1;
            }
        }
        if added < expected {
            warn!(base = %self.base, expected, added, "defrag lost elements");
        } else {
            info!(base = %self.base, live = added, reclaimed, "list defragmented");
        }
        Ok(added)
    }

    /// Snapshot iterator over the persisted state of this list
    pub fn iter(&self) -> Result<ListIterator> {
        ListIterator::open(self.kv.clone(), &self.base, self.json)
    }

    /// Compare metadata with the elements actually stored
    ///
    /// Scans every key under the list's base. Use after an interruption to
    /// find out whether `add`/`remove` left the list half-written.
    pub fn verify(&self) -> Result<ListHealth> {
        let count = self.read_count()?;
        let raw_free = self.read_free()?;

        let prefix = self.key("");
        let full_prefix = self.kv.full_key(&prefix);
        let mut stored = BTreeSet::new();
        let mut cursor = self.kv.iter(&prefix);
        while cursor.next() {
            let key = cursor.key()?;
            let suffix = key.strip_prefix(full_prefix.as_str()).unwrap_or(key);
            if let Ok(index) = suffix.parse::<u64>() {
                stored.insert(index);
            }
        }

        let mut health = ListHealth {
            count,
            ..ListHealth::default()
        };
        let mut free = BTreeSet::new();
        for &index in &raw_free {
            if index >= count || !free.insert(index) {
                health.invalid_free.push(index);
            }
        }
        for index in 0..count {
            match (stored.contains(&index), free.contains(&index)) {
                (true, false) => health.live += 1,
                (true, true) => health.free_but_live.push(index),
                (false, false) => health.missing.push(index),
                (false, true) => {}
            }
        }
        health.beyond_count = stored.range(count..).copied().collect();

        if !health.is_consistent() {
            warn!(base = %self.base, ?health, "list metadata out of sync with elements");
        }
        Ok(health)
    }
}

/// Where a [`ListIterator`] stands relative to its position counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// `next` not called yet, or `value` consumed the last confirmed index
    Idle,
    /// `next` confirmed `index` is live; `value` may read it
    Ready,
    /// `next` found nothing more
    Exhausted,
}

/// Snapshot iterator over a list's live indices
///
/// `count` and `freeIndices` are read once at creation; later `add`/`remove`
/// calls on the list are not seen. `next` confirms a live index, `value`
/// reads it and moves past it (once per `next`), `delete` tombstones the
/// index the last `value` read.
#[derive(Debug)]
pub struct ListIterator {
    kv: NamespacedStore,
    base: String,
    json: bool,
    length: u64,
    free: Vec<u64>,
    index: u64,
    position: Position,
    consumed: Option<u64>,
}

impl ListIterator {
    fn open(kv: NamespacedStore, base: &str, json: bool) -> Result<Self> {
        let list = IndexedList::open(kv, base, json)?;
        Ok(ListIterator {
            kv: list.kv,
            base: list.base,
            json,
            length: list.length,
            free: list.free,
            index: 0,
            position: Position::Idle,
            consumed: None,
        })
    }

    fn key(&self, suffix: impl std::fmt::Display) -> String {
        format!("{}:{}", self.base, suffix)
    }

    /// Skip tombstones; returns whether a live index remains
    ///
    /// Does not move past a live index by itself: that is `value`'s job.
    pub fn next(&mut self) -> bool {
        while self.index < self.length {
            if self.free.binary_search(&self.index).is_err() {
                self.position = Position::Ready;
                return true;
            }
            self.index += 1;
        }
        self.position = Position::Exhausted;
        false
    }

    /// Index `next` most recently confirmed, if `value` has not consumed it
    pub fn index(&self) -> Option<u64> {
        match self.position {
            Position::Ready => Some(self.index),
            _ => None,
        }
    }

    /// Read the confirmed element and move past it
    ///
    /// # Errors
    ///
    /// `CursorNotPositioned` unless the last `next` returned `true` and
    /// `value` has not been called since.
    pub fn value(&mut self) -> Result<Value> {
        if self.position != Position::Ready {
            return Err(Error::CursorNotPositioned("value"));
        }
        let index = self.index;
        self.index += 1;
        self.position = Position::Idle;
        self.consumed = Some(index);

        let raw = self.kv.get(&self.key(index), None)?;
        if self.json {
            decode_json(raw)
        } else {
            Ok(raw)
        }
    }

    /// Tombstone the element the last `value` call read
    ///
    /// Returns `Ok(false)` if that index is already free in this snapshot.
    /// The index is merged into the free list currently persisted, so
    /// tombstones written by others since the snapshot are kept.
    ///
    /// # Errors
    ///
    /// `CursorNotPositioned` if `value` has not been called yet.
    pub fn delete(&mut self) -> Result<bool> {
        let index = self.consumed.ok_or(Error::CursorNotPositioned("delete"))?;
        let pos = match self.free.binary_search(&index) {
            Ok(_) => return Ok(false),
            Err(pos) => pos,
        };

        let lock = self.kv.lock_handle();
        let _guard = lock.lock();
        self.kv.remove(&self.key(index));
        self.free.insert(pos, index);

        let free_key = self.key(FREE_INDICES_KEY);
        let mut persisted = parse_free_indices(self.kv.get(&free_key, Some(Value::from("[]")))?)?;
        persisted.sort_unstable();
        persisted.dedup();
        if let Err(pos) = persisted.binary_search(&index) {
            persisted.insert(pos, index);
        }
        Ok(self.kv.set(&free_key, serde_json::to_string(&persisted)?))
    }

    /// Drain the remaining live values
    pub fn collect_values(mut self) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        while self.next() {
            values.push(self.value()?);
        }
        Ok(values)
    }
}
