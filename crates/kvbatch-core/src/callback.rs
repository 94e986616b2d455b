//! Completion callbacks.
//!
//! Every storage operation completes through a future. Callers that prefer a
//! callback attach one with [`with_callback`]: the callback observes the
//! outcome by reference, and the future still yields it.

use std::future::Future;

use crate::error::{StorageError, StorageResult};

/// Boxed completion callback, for callers that store or pass callbacks
/// around before attaching them.
pub type Callback<T> = Box<dyn FnOnce(Result<&T, &StorageError>) + Send>;

/// Run `callback` with the outcome of `future` once it completes, then yield
/// the same outcome.
pub fn with_callback<Fut, T, F>(future: Fut, callback: F) -> impl Future<Output = StorageResult<T>>
where
    Fut: Future<Output = StorageResult<T>>,
    F: FnOnce(Result<&T, &StorageError>),
{
    async move {
        let outcome = future.await;
        callback(outcome.as_ref());
        outcome
    }
}

/// [`with_callback`] for an optional callback.
pub fn with_optional_callback<Fut, T>(
    future: Fut,
    callback: Option<Callback<T>>,
) -> impl Future<Output = StorageResult<T>>
where
    Fut: Future<Output = StorageResult<T>>,
{
    async move {
        let outcome = future.await;
        if let Some(callback) = callback {
            callback(outcome.as_ref());
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn callback_sees_success() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let out = with_callback(async { Ok::<_, StorageError>(7) }, move |res| {
            *sink.lock().unwrap() = Some(res.copied().map_err(|e| e.clone()));
        })
        .await;

        assert_eq!(out, Ok(7));
        assert_eq!(*seen.lock().unwrap(), Some(Ok(7)));
    }

    #[tokio::test]
    async fn callback_sees_the_same_error() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let out = with_callback(
            async { Err::<(), _>(StorageError::FlushAborted) },
            move |res| {
                *sink.lock().unwrap() = res.err().cloned();
            },
        )
        .await;

        assert_eq!(out, Err(StorageError::FlushAborted));
        assert_eq!(*seen.lock().unwrap(), Some(StorageError::FlushAborted));
    }

    #[tokio::test]
    async fn optional_callback_may_be_absent() {
        let out = with_optional_callback(async { Ok::<_, StorageError>("x") }, None).await;
        assert_eq!(out, Ok("x"));

        let called = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&called);
        let callback: Callback<&str> = Box::new(move |_| *flag.lock().unwrap() = true);
        with_optional_callback(async { Ok::<_, StorageError>("y") }, Some(callback))
            .await
            .unwrap();
        assert!(*called.lock().unwrap());
    }
}
