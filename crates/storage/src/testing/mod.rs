//! Testing utilities for interruption scenarios
//!
//! The layered primitives write list metadata in several independent
//! steps. These tools let tests stop a store partway through such a
//! sequence and inspect what was left behind.
//!
//! # Example
//!
//! ```ignore
//! use stratakv_storage::{MemoryStore, testing::CrashingStore};
//!
//! // Allow exactly one more write, then drop every write after it
//! let store = CrashingStore::new(MemoryStore::new(), 1);
//! ```

mod crash_harness;

pub use crash_harness::CrashingStore;
