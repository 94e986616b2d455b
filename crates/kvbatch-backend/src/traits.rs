use async_trait::async_trait;

use crate::error::{BackendResult, KeyError};

/// A key paired with the value to write.
pub type KeyValue = (String, String);

/// A key paired with its stored value, `None` when the key is absent.
pub type KeyValueEntry = (String, Option<String>);

/// Batched key-value storage backend.
///
/// Every operation is atomic at the backend and reports failures in batch
/// form: multi-key operations return a [`crate::RawBackendError`] that may
/// carry one error per failed key, while `clear` and `get_all_keys` report
/// at most one backend-wide [`KeyError`].
///
/// Implementations must be thread-safe (`Send + Sync`); callers may issue
/// operations concurrently, including overlapping `multi_get` calls.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Fetch the values of `keys`.
    ///
    /// Returns one entry per requested key, `None` for keys that are not
    /// stored. Callers must not assume the entries are in request order.
    async fn multi_get(&self, keys: &[String]) -> BackendResult<Vec<KeyValueEntry>>;

    /// Store every pair, overwriting existing values.
    async fn multi_set(&self, pairs: &[KeyValue]) -> BackendResult<()>;

    /// Remove every key. Removing a missing key is not an error.
    async fn multi_remove(&self, keys: &[String]) -> BackendResult<()>;

    /// Remove every stored key.
    async fn clear(&self) -> Result<(), KeyError>;

    /// List every stored key.
    ///
    /// `Ok(None)` means the backend produced no listing.
    async fn get_all_keys(&self) -> Result<Option<Vec<String>>, KeyError>;

    /// The merge capability, if this backend supports merging values.
    fn merger(&self) -> Option<&dyn MergeBackend> {
        None
    }
}

/// Optional merge capability of a [`StorageBackend`].
#[async_trait]
pub trait MergeBackend: Send + Sync {
    /// Merge each value into the value already stored under its key.
    ///
    /// Missing keys are created with the given value.
    async fn multi_merge(&self, pairs: &[KeyValue]) -> BackendResult<()>;
}
