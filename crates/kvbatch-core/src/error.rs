use kvbatch_backend::{KeyError, NormalizedErrors};

/// Errors surfaced by [`crate::AsyncStorage`] operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// A single backend error: the first error of a failed read tick, or
    /// of a single-key write.
    #[error("storage error: {0}")]
    Backend(KeyError),

    /// Every error a multi-key write reported, in backend order.
    #[error("storage errors: {0}")]
    Batch(NormalizedErrors),

    /// The key was refused before reaching the backend.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The value was refused before reaching the backend.
    #[error("invalid value for key {key:?}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// The configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No async runtime was available to schedule the read flush.
    #[error("no async runtime available to schedule the read flush")]
    RuntimeUnavailable,

    /// The flush that owned this request was dropped before resolving it.
    #[error("read flush was aborted before the request was resolved")]
    FlushAborted,
}

impl StorageError {
    /// The key the failure is attributed to, if any. Batch errors report the
    /// key of their first error.
    pub fn key(&self) -> Option<&str> {
        match self {
            StorageError::Backend(err) => err.key.as_deref(),
            StorageError::Batch(errs) => errs.first().key.as_deref(),
            StorageError::InvalidKey { key, .. } | StorageError::InvalidValue { key, .. } => {
                Some(key.as_str())
            }
            _ => None,
        }
    }

    /// Returns `true` if the error was produced by validation, before any
    /// backend call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StorageError::InvalidKey { .. } | StorageError::InvalidValue { .. }
        )
    }
}

impl From<KeyError> for StorageError {
    fn from(err: KeyError) -> Self {
        StorageError::Backend(err)
    }
}

impl From<NormalizedErrors> for StorageError {
    fn from(errs: NormalizedErrors) -> Self {
        StorageError::Batch(errs)
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
