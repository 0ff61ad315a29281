//! Store configuration via `stratakv.toml`
//!
//! The only tunables are the primitive store's key and value limits. A
//! missing section or field falls back to the host store's defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::limits::Limits;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "stratakv.toml";

/// Store configuration loaded from `stratakv.toml`.
///
/// # Example
///
/// ```toml
/// [limits]
/// max_key_chars = 256
/// max_value_bytes = 5242880
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Key and value limits
    #[serde(default)]
    pub limits: Limits,
}

impl StoreConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# stratakv store configuration

[limits]
# Maximum key length in characters
max_key_chars = 256

# Maximum encoded value size in bytes (5MB)
max_value_bytes = 5242880
"#
    }

    /// Parse config from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject limits the store cannot operate under.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_key_chars == 0 {
            return Err(Error::Config("max_key_chars must be > 0".into()));
        }
        if self.limits.max_value_bytes == 0 {
            return Err(Error::Config("max_value_bytes must be > 0".into()));
        }
        Ok(())
    }
}
