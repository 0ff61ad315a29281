//! Storage-layer value wrapper with expiry support
//!
//! Expiry is a storage concern: callers read plain `Value`s, the store keeps
//! the deadline next to each one.

use std::time::{Duration, Instant};

use stratakv_core::Value;

/// A stored value with an optional expiry deadline
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    value: Value,
    expires_at: Option<Instant>,
}

impl StoredValue {
    /// Create a stored value that expires `ttl` from now (never if `None`)
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self::with_deadline(value, ttl.map(|ttl| Instant::now() + ttl))
    }

    /// Create a stored value with an explicit deadline
    pub fn with_deadline(value: Value, expires_at: Option<Instant>) -> Self {
        StoredValue { value, expires_at }
    }

    /// Get the value
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Mutable access for in-place arithmetic
    #[inline]
    pub(crate) fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Consume and return the value
    #[inline]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Deadline after which the value is invisible
    #[inline]
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Check if this value has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}
