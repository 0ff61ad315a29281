//! Size limits for keys and values
//!
//! The primitive store rejects writes that exceed these limits. Defaults
//! match the host store: keys up to 256 characters, values up to 5 MB.
//! Violations surface as `false` from writes; the validators below return
//! the specific `Error` so the rejection can be logged.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Value;

/// Default maximum key length in characters
pub const DEFAULT_MAX_KEY_CHARS: usize = 256;

/// Default maximum encoded value size in bytes (5MB)
pub const DEFAULT_MAX_VALUE_BYTES: usize = 5 * 1024 * 1024;

/// Key and value limits enforced by the primitive store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum key length in characters (default: 256)
    pub max_key_chars: usize,

    /// Maximum encoded value size in bytes (default: 5MB)
    pub max_value_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_key_chars: DEFAULT_MAX_KEY_CHARS,
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
        }
    }
}

impl Limits {
    /// Create limits with small values for testing
    ///
    /// Lets unit tests exercise rejection without building megabyte values.
    pub fn with_small_limits() -> Self {
        Limits {
            max_key_chars: 32,
            max_value_bytes: 64,
        }
    }

    /// Validate a key length
    ///
    /// Length is counted in characters, not bytes.
    pub fn validate_key(&self, key: &str) -> Result<()> {
        let len = key.chars().count();
        if len > self.max_key_chars {
            return Err(Error::KeyTooLong {
                actual: len,
                max: self.max_key_chars,
            });
        }
        Ok(())
    }

    /// Validate an encoded value size
    pub fn validate_value(&self, value: &Value) -> Result<()> {
        let len = value.encoded_len();
        if len > self.max_value_bytes {
            return Err(Error::ValueTooLarge {
                actual: len,
                max: self.max_value_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_key_chars, 256);
        assert_eq!(limits.max_value_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_key_at_limit_is_accepted() {
        let limits = Limits::default();
        assert!(limits.validate_key(&"k".repeat(256)).is_ok());
        assert!(matches!(
            limits.validate_key(&"k".repeat(257)),
            Err(Error::KeyTooLong { actual: 257, max: 256 })
        ));
    }

    #[test]
    fn test_key_length_counts_characters() {
        let limits = Limits::with_small_limits();
        // 32 two-byte characters: 64 bytes but within a 32-character limit
        assert!(limits.validate_key(&"é".repeat(32)).is_ok());
    }

    #[test]
    fn test_value_too_large() {
        let limits = Limits::with_small_limits();
        assert!(limits.validate_value(&Value::from("x".repeat(64))).is_ok());
        assert!(matches!(
            limits.validate_value(&Value::from("x".repeat(65))),
            Err(Error::ValueTooLarge { actual: 65, max: 64 })
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_key_accepted_iff_within_char_limit(key in "\\PC{0,48}") {
                let limits = Limits::with_small_limits();
                let fits = key.chars().count() <= limits.max_key_chars;
                prop_assert_eq!(limits.validate_key(&key).is_ok(), fits);
            }
        }
    }
}
