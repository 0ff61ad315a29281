//! Structured views over a flat primitive key-value store
//!
//! - **NamespacedStore**: scalar get/set/incr/iterate under a key prefix
//! - **IndexedList**: append-oriented list with tombstone reuse and defrag
//! - **KeyedMap**: JSON records addressed by one of their attributes
//! - **Keyspace**: root handle sharing one lock per namespace
//!
//! ## Design Principle: Stateless Facades
//!
//! Views hold an `Arc<dyn KvStore>` and a key prefix. Everything persisted
//! goes through the primitive as colon-delimited keys; the only state a
//! view keeps is what it loaded (list metadata, iterator snapshots).
//!
//! ## Key Layout
//!
//! ```text
//! <namespace>:<key>                 scalar
//! <namespace>:<list>:count          next unused list index
//! <namespace>:<list>:freeIndices    JSON array of reusable indices
//! <namespace>:<list>:<index>        list element
//! <namespace>:<map>:<attribute>     map record (JSON)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod keyspace;
pub mod list;
pub mod map;
pub mod namespace;

pub use keyspace::Keyspace;
pub use list::{IndexedList, ListHealth, ListIterator};
pub use map::{KeyedMap, MapIterator};
pub use namespace::{NamespacedStore, ScalarIterator};
