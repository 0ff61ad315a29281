//! Storage layer for stratakv
//!
//! This crate implements an in-memory primitive store that satisfies the
//! `KvStore` contract from `stratakv-core`:
//! - MemoryStore: BTreeMap-based storage with RwLock and key/value limits
//! - MemoryCursor: snapshot prefix cursor
//! - StoredValue: value plus optional expiry deadline
//! - testing: crash harness for interruption scenarios
//!
//! A host environment normally supplies its own primitive store; this one
//! backs tests, benchmarks and host-less use.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod stored_value;
pub mod testing;

pub use memory::{MemoryCursor, MemoryStore};
pub use stored_value::StoredValue;
