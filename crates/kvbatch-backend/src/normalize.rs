//! Error normalization.
//!
//! Backends report failures in two shapes: a single shared error, or a list
//! of per-item errors that may also be empty. [`normalize`] folds both into
//! [`NormalizedErrors`], a list that is never empty, or `None`.

use std::fmt;

use crate::error::{KeyError, RawBackendError};

/// Ordered, non-empty list of backend errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedErrors {
    errors: Vec<KeyError>,
}

impl NormalizedErrors {
    /// Wrap a single error.
    pub fn single(error: KeyError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// The first error reported. Always present.
    pub fn first(&self) -> &KeyError {
        &self.errors[0]
    }

    /// Consume the list and return its first error.
    pub fn into_first(mut self) -> KeyError {
        self.errors.swap_remove(0)
    }

    /// Number of errors (at least one).
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false`; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate the errors in backend order.
    pub fn iter(&self) -> std::slice::Iter<'_, KeyError> {
        self.errors.iter()
    }

    /// Keys the errors are attributed to, skipping unattributed ones.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().filter_map(|e| e.key.as_deref())
    }

    /// Consume into the underlying errors, in backend order.
    pub fn into_vec(self) -> Vec<KeyError> {
        self.errors
    }
}

impl fmt::Display for NormalizedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first())?;
        if self.errors.len() > 1 {
            write!(f, " (and {} more)", self.errors.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for NormalizedErrors {}

impl<'a> IntoIterator for &'a NormalizedErrors {
    type Item = &'a KeyError;
    type IntoIter = std::slice::Iter<'a, KeyError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Fold a raw backend error report into a normalized list.
///
/// Returns `None` when there is nothing to report: no error at all, or an
/// empty per-item list.
pub fn normalize(raw: Option<RawBackendError>) -> Option<NormalizedErrors> {
    match raw? {
        RawBackendError::Single(err) => Some(NormalizedErrors::single(err)),
        RawBackendError::Many(errors) if errors.is_empty() => None,
        RawBackendError::Many(errors) => Some(NormalizedErrors { errors }),
    }
}

/// Normalize the error side of a backend result, discarding any value.
pub fn normalize_result<T>(result: Result<T, RawBackendError>) -> Option<NormalizedErrors> {
    normalize(result.err())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn absent_is_none() {
        assert!(normalize(None).is_none());
    }

    #[test]
    fn empty_list_is_none() {
        assert!(normalize(Some(RawBackendError::Many(vec![]))).is_none());
    }

    #[test]
    fn single_error_becomes_one_item_list() {
        let errs = normalize(Some(KeyError::new("disk full").into())).unwrap();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.first().message, "disk full");
        assert!(errs.first().key.is_none());
    }

    #[test]
    fn key_attribution_is_kept() {
        let raw = RawBackendError::Many(vec![
            KeyError::for_key("bad value", "a"),
            KeyError::new("unknown"),
            KeyError::for_key("bad value", "c"),
        ]);
        let errs = normalize(Some(raw)).unwrap();
        assert_eq!(errs.len(), 3);
        assert_eq!(errs.keys().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(errs.first().key.as_deref(), Some("a"));
    }

    #[test]
    fn normalize_ok_result() {
        assert!(normalize_result::<()>(Ok(())).is_none());
    }

    #[test]
    fn display_mentions_extra_errors() {
        let errs = normalize(Some(RawBackendError::Many(vec![
            KeyError::new("first"),
            KeyError::new("second"),
        ])))
        .unwrap();
        assert_eq!(errs.to_string(), "first (and 1 more)");
        assert_eq!(errs.into_first().message, "first");
    }

    proptest! {
        #[test]
        fn order_is_preserved(messages in proptest::collection::vec("[a-z]{1,8}", 1..16)) {
            let raw = RawBackendError::Many(
                messages.iter().map(|m| KeyError::new(m.clone())).collect(),
            );
            let errs = normalize(Some(raw)).unwrap();
            let got: Vec<_> = errs.iter().map(|e| e.message.clone()).collect();
            prop_assert_eq!(got, messages);
        }
    }
}
