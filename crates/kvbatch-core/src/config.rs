use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// How an empty-string key is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPolicy {
    /// Pass the key through silently.
    Allow,
    /// Pass the key through and log a warning.
    #[default]
    Warn,
    /// Refuse the operation before any backend call.
    Reject,
}

/// Configuration for [`crate::AsyncStorage`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Treatment of empty-string keys.
    pub empty_keys: KeyPolicy,
    /// Keys longer than this many bytes are rejected.
    pub max_key_len: Option<usize>,
    /// Values longer than this many bytes are rejected on write.
    pub max_value_len: Option<usize>,
}

impl StorageConfig {
    /// A configuration that refuses every suspicious input.
    pub fn strict() -> Self {
        Self {
            empty_keys: KeyPolicy::Reject,
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> StorageResult<Self> {
        let config: StorageConfig =
            toml::from_str(text).map_err(|e| StorageError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that can never be satisfied.
    pub fn validate(&self) -> StorageResult<()> {
        if self.max_key_len == Some(0) {
            return Err(StorageError::InvalidConfig(
                "max_key_len must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
