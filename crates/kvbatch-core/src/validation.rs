//! Input checks applied before any backend call.

use tracing::warn;

use crate::config::{KeyPolicy, StorageConfig};
use crate::error::{StorageError, StorageResult};

/// Check one key against the configuration.
pub fn validate_key(config: &StorageConfig, key: &str) -> StorageResult<()> {
    if key.is_empty() {
        match config.empty_keys {
            KeyPolicy::Allow => {}
            KeyPolicy::Warn => warn!("empty key passed to storage"),
            KeyPolicy::Reject => {
                return Err(StorageError::InvalidKey {
                    key: String::new(),
                    reason: "key must not be empty".into(),
                })
            }
        }
    }
    if let Some(max) = config.max_key_len {
        if key.len() > max {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
                reason: format!("key is {} bytes, limit is {max}", key.len()),
            });
        }
    }
    Ok(())
}

/// Check every key, stopping at the first failure.
pub fn validate_keys<'a>(
    config: &StorageConfig,
    keys: impl IntoIterator<Item = &'a String>,
) -> StorageResult<()> {
    keys.into_iter().try_for_each(|key| validate_key(config, key))
}

/// Check a key and the value about to be written under it.
pub fn validate_entry(config: &StorageConfig, key: &str, value: &str) -> StorageResult<()> {
    validate_key(config, key)?;
    if let Some(max) = config.max_value_len {
        if value.len() > max {
            return Err(StorageError::InvalidValue {
                key: key.to_string(),
                reason: format!("value is {} bytes, limit is {max}", value.len()),
            });
        }
    }
    Ok(())
}
