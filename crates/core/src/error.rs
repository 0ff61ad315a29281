//! Error types for stratakv
//!
//! This module defines the error taxonomy shared by the store contract and
//! the layered primitives. We use `thiserror` for automatic `Display` and
//! `Error` trait implementations.
//!
//! Reads, cursor misuse and multi-step operations that cannot continue
//! travel through this type. Writes that do not
//! fit (key too long, value too large, non-numeric counter) are reported as
//! `false` by the mutating operations; the matching variants here exist so the
//! store can describe *why* a write was rejected when it logs the rejection.

use std::io;
use thiserror::Error;

/// Result type alias for stratakv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for stratakv
#[derive(Debug, Error)]
pub enum Error {
    /// Key absent and no default supplied
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Key exceeds the store's length limit
    #[error("Key too long: {actual} characters (max {max})")]
    KeyTooLong {
        /// Length of the offending key in characters
        actual: usize,
        /// Configured maximum
        max: usize,
    },

    /// Encoded value exceeds the store's size limit
    #[error("Value too large: {actual} bytes (max {max})")]
    ValueTooLarge {
        /// Encoded size in bytes
        actual: usize,
        /// Configured maximum
        max: usize,
    },

    /// Arithmetic on a value that is not a number
    #[error("Value at {key} is not numeric ({found})")]
    NonNumericValue {
        /// Full key of the stored value
        key: String,
        /// Type name of the stored value
        found: &'static str,
    },

    /// Map record lacks a usable key attribute
    #[error("Record has no usable '{attribute}' attribute")]
    InvalidAttribute {
        /// Name of the designated key attribute
        attribute: String,
    },

    /// Cursor accessed while not positioned on an entry
    #[error("Cursor not positioned: {0}")]
    CursorNotPositioned(&'static str),

    /// A write a multi-step operation depends on was rejected by the store
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (config file access)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl Error {
    /// True for a missing key, the only read failure callers routinely handle
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound(_))
    }
}
