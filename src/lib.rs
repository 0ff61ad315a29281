//! stratakv - namespaced scalars, indexed lists and keyed maps over a flat
//! key-value store
//!
//! # Quick Start
//!
//! ```ignore
//! use stratakv::{Keyspace, Value};
//!
//! let keyspace = stratakv::in_memory();
//! let app = keyspace.namespace("app");
//!
//! app.set("visits", 0);
//! app.incr("visits", 1);
//!
//! let mut queue = app.list("queue")?;
//! queue.add("job-1");
//!
//! let users = app.map("users", "id");
//! users.set(&serde_json::json!({"id": "u1", "name": "Ann"}));
//! ```
//!
//! # Architecture
//!
//! - `stratakv-core`: `Value`, `Error`, limits, config and the `KvStore` contract
//! - `stratakv-storage`: `MemoryStore`, the in-process primitive store
//! - `stratakv-primitives`: the structured views built on any `KvStore`
//!
//! Any `KvStore` implementation can back a [`Keyspace`]; the in-memory one
//! is provided for host-less use.

use std::path::Path;

pub use stratakv_core::{
    Error, KvCursor, KvStore, Limits, Result, StoreConfig, Value, CONFIG_FILE_NAME,
};
pub use stratakv_primitives::{
    IndexedList, KeyedMap, Keyspace, ListHealth, ListIterator, MapIterator, NamespacedStore,
    ScalarIterator,
};
pub use stratakv_storage::MemoryStore;

/// Keyspace over a fresh in-memory store with default limits
pub fn in_memory() -> Keyspace {
    Keyspace::from_store(MemoryStore::new())
}

/// Keyspace over a fresh in-memory store configured by `config`
pub fn in_memory_with_config(config: &StoreConfig) -> Keyspace {
    Keyspace::from_store(MemoryStore::with_config(config))
}

/// Keyspace configured from a `stratakv.toml` in `dir`, or defaults if absent
pub fn open_dir(dir: impl AsRef<Path>) -> Result<Keyspace> {
    let path = dir.as_ref().join(CONFIG_FILE_NAME);
    let config = if path.exists() {
        StoreConfig::from_file(&path)?
    } else {
        StoreConfig::default()
    };
    Ok(in_memory_with_config(&config))
}
