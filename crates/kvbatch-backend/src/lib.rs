//! Batched key-value storage backends for kvbatch.
//!
//! This crate defines the narrow interface kvbatch uses to talk to an
//! external key-value store. Every operation is batched: one call reads,
//! writes, removes or merges many keys at once and reports failures as a
//! list of per-key errors (or one backend-wide error).
//!
//! # Backends
//!
//! All backends implement the [`StorageBackend`] trait. Merging is an
//! optional capability exposed through [`StorageBackend::merger`]:
//!
//! - [`InMemoryBackend`] -- `HashMap`-based backend for tests and embedding
//!
//! # Errors
//!
//! Backends report [`RawBackendError`]s. [`normalize`] turns a raw report
//! into [`NormalizedErrors`] (an ordered, never-empty list) or `None`.

pub mod error;
pub mod memory;
pub mod merge;
pub mod normalize;
pub mod traits;

pub use error::{BackendResult, KeyError, RawBackendError};
pub use memory::InMemoryBackend;
pub use merge::merge_json;
pub use normalize::{normalize, normalize_result, NormalizedErrors};
pub use traits::{KeyValue, KeyValueEntry, MergeBackend, StorageBackend};
