//! Core types and traits for stratakv
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: the scalar/JSON value held by the primitive store
//! - Error: error taxonomy and `Result` alias
//! - Limits: key length and value size limits
//! - StoreConfig: `stratakv.toml` configuration
//! - Traits: the primitive store contract (`KvStore`, `KvCursor`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod limits;
pub mod traits;
pub mod value;

pub use config::{StoreConfig, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use limits::{Limits, DEFAULT_MAX_KEY_CHARS, DEFAULT_MAX_VALUE_BYTES};
pub use traits::{KvCursor, KvStore};
pub use value::Value;
