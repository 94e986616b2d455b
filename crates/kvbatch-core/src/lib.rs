//! Request-coalescing key-value storage.
//!
//! [`AsyncStorage`] exposes a per-key get/set/remove/merge API over a
//! batched [`kvbatch_backend::StorageBackend`]. Reads issued within one tick
//! of the async runtime are coalesced into a single backend `multi_get`
//! over the deduplicated union of their keys; the batch result is then
//! fanned back out to every caller in registration order.
//!
//! # Read failures
//!
//! A backend error anywhere in a coalesced read rejects every read of that
//! tick with the first reported error. The backend cannot reliably
//! attribute a partial failure to specific keys, so no read succeeds with
//! data from a batch that failed.
//!
//! # Modules
//!
//! - [`ledger`] -- pending reads and the key universe of the current tick
//! - [`scheduler`] -- arming, flushing and fan-out
//! - [`storage`] -- the public facade, merge operations and key handles
//! - [`callback`] -- completion callbacks attached to operation futures
//! - [`config`] / [`validation`] -- input checks applied before any backend call

pub mod callback;
pub mod config;
pub mod error;
pub mod ledger;
pub mod scheduler;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use callback::{with_callback, with_optional_callback, Callback};
pub use config::{KeyPolicy, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use ledger::{KeyUniverse, RequestLedger};
pub use scheduler::{ReadFuture, ReadOutcome, ReadScheduler};
pub use storage::{AsyncStorage, ItemHandle, Merger};

pub use kvbatch_backend as backend;
