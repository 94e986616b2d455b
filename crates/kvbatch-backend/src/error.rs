use serde::{Deserialize, Serialize};

/// A single error reported by the storage backend.
///
/// Multi-key write operations attribute each failure to the key that caused
/// it; backend-wide failures (`clear`, `get_all_keys`) carry no key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct KeyError {
    /// Human-readable description from the backend.
    pub message: String,
    /// The key the failure is attributed to, if any.
    pub key: Option<String>,
}

impl KeyError {
    /// An error not attributed to any key.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            key: None,
        }
    }

    /// An error attributed to `key`.
    pub fn for_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Error payload exactly as a backend reports it.
///
/// Backends may report one shared error or a list of per-item errors. The
/// list may be empty, which means "no error"; see [`crate::normalize`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RawBackendError {
    /// One error for the whole call.
    #[error("{0}")]
    Single(KeyError),

    /// Per-item errors, in the order the backend produced them.
    #[error("{} backend error(s)", .0.len())]
    Many(Vec<KeyError>),
}

impl From<KeyError> for RawBackendError {
    fn from(err: KeyError) -> Self {
        RawBackendError::Single(err)
    }
}

impl From<Vec<KeyError>> for RawBackendError {
    fn from(errs: Vec<KeyError>) -> Self {
        RawBackendError::Many(errs)
    }
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, RawBackendError>;
