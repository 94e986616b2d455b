use std::future::Future;
use std::sync::Arc;

use kvbatch_backend::{
    normalize_result, BackendResult, KeyValue, MergeBackend, StorageBackend,
};
use tracing::debug;

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::scheduler::{ReadFuture, ReadScheduler};
use crate::validation::{validate_entry, validate_key, validate_keys};

/// Per-key storage API over a batched [`StorageBackend`].
///
/// Reads (`get_item`, `multi_get`) are coalesced: all reads issued within
/// one tick of the async runtime share a single backend `multi_get`. Every
/// other operation is a direct pass-through to one backend call.
///
/// Cloning is cheap; clones share the backend and the read scheduler.
pub struct AsyncStorage<B: ?Sized> {
    backend: Arc<B>,
    scheduler: ReadScheduler<B>,
    config: Arc<StorageConfig>,
}

impl<B: ?Sized> Clone for AsyncStorage<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            scheduler: self.scheduler.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<B> AsyncStorage<B>
where
    B: StorageBackend + 'static,
{
    /// Wrap `backend` with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::from_parts(Arc::new(backend), StorageConfig::default())
    }

    /// Wrap `backend` with `config`, after validating it.
    pub fn with_config(backend: B, config: StorageConfig) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(Arc::new(backend), config))
    }
}

impl<B> AsyncStorage<B>
where
    B: StorageBackend + ?Sized + 'static,
{
    /// Wrap a shared backend, which may be a trait object.
    pub fn from_arc(backend: Arc<B>, config: StorageConfig) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(backend, config))
    }

    fn from_parts(backend: Arc<B>, config: StorageConfig) -> Self {
        Self {
            scheduler: ReadScheduler::new(Arc::clone(&backend)),
            backend,
            config: Arc::new(config),
        }
    }

    /// The shared backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Configuration applied to every operation.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// The scheduler coalescing this storage's reads.
    pub fn scheduler(&self) -> &ReadScheduler<B> {
        &self.scheduler
    }

    // ---- Coalesced reads ----

    /// Read one value; `None` if the key is not stored.
    ///
    /// The read is registered before this returns and is flushed together
    /// with every other read of the same tick.
    pub fn get_item(
        &self,
        key: impl Into<String>,
    ) -> impl Future<Output = StorageResult<Option<String>>> + Send + 'static {
        single_value(self.multi_get([key.into()]))
    }

    /// Read several values, one entry per requested key in request order.
    ///
    /// Duplicate keys in `keys` yield duplicate entries. The read is
    /// registered before this returns.
    pub fn multi_get<I, K>(&self, keys: I) -> ReadFuture
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if let Err(err) = validate_keys(&self.config, &keys) {
            return ReadFuture::rejected(err);
        }
        self.scheduler.request_read(keys)
    }

    /// Flush every pending read now instead of at the end of the tick.
    pub async fn flush_get_requests(&self) {
        self.scheduler.flush_now().await;
    }

    // ---- Pass-through writes ----

    /// Store one value.
    pub async fn set_item(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> StorageResult<()> {
        let pair = (key.into(), value.into());
        validate_entry(&self.config, &pair.0, &pair.1)?;
        first_error(self.backend.multi_set(&[pair]).await)
    }

    /// Remove one key. Removing a missing key succeeds.
    pub async fn remove_item(&self, key: impl Into<String>) -> StorageResult<()> {
        let key = key.into();
        validate_key(&self.config, &key)?;
        first_error(self.backend.multi_remove(&[key]).await)
    }

    /// Store several values in one atomic backend call.
    ///
    /// Fails with [`StorageError::Batch`] carrying every per-key error.
    pub async fn multi_set<I, K, V>(&self, pairs: I) -> StorageResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = collect_pairs(pairs);
        for (key, value) in &pairs {
            validate_entry(&self.config, key, value)?;
        }
        debug!(keys = pairs.len(), "multi_set");
        all_errors(self.backend.multi_set(&pairs).await)
    }

    /// Remove several keys in one atomic backend call.
    pub async fn multi_remove<I, K>(&self, keys: I) -> StorageResult<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        validate_keys(&self.config, &keys)?;
        debug!(keys = keys.len(), "multi_remove");
        all_errors(self.backend.multi_remove(&keys).await)
    }

    /// Remove every stored key.
    pub async fn clear(&self) -> StorageResult<()> {
        self.backend.clear().await.map_err(StorageError::Backend)
    }

    /// List every stored key. A backend that returns no listing yields an
    /// empty list.
    pub async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        let keys = self.backend.get_all_keys().await.map_err(StorageError::Backend)?;
        Ok(keys.unwrap_or_default())
    }

    // ---- Merge capability ----

    /// Returns `true` if the backend can merge values.
    pub fn supports_merge(&self) -> bool {
        self.backend.merger().is_some()
    }

    /// Merge operations, or `None` when the backend cannot merge.
    pub fn merger(&self) -> Option<Merger<'_, B>> {
        let backend = self.backend.merger()?;
        Some(Merger {
            storage: self,
            backend,
        })
    }

    /// A handle bound to one key.
    pub fn item(&self, key: impl Into<String>) -> ItemHandle<'_, B> {
        ItemHandle {
            storage: self,
            key: key.into(),
        }
    }
}

impl<B: ?Sized> std::fmt::Debug for AsyncStorage<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncStorage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Merge operations of an [`AsyncStorage`] whose backend supports merging.
///
/// Obtained from [`AsyncStorage::merger`].
pub struct Merger<'a, B: ?Sized> {
    storage: &'a AsyncStorage<B>,
    backend: &'a dyn MergeBackend,
}

impl<'a, B> Merger<'a, B>
where
    B: StorageBackend + ?Sized + 'static,
{
    /// Merge `value` into the value stored under `key`.
    pub async fn merge_item(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> StorageResult<()> {
        let pair = (key.into(), value.into());
        validate_entry(&self.storage.config, &pair.0, &pair.1)?;
        first_error(self.backend.multi_merge(&[pair]).await)
    }

    /// Merge several values in one atomic backend call.
    pub async fn multi_merge<I, K, V>(&self, pairs: I) -> StorageResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = collect_pairs(pairs);
        for (key, value) in &pairs {
            validate_entry(&self.storage.config, key, value)?;
        }
        debug!(keys = pairs.len(), "multi_merge");
        all_errors(self.backend.multi_merge(&pairs).await)
    }
}

/// Operations on one key of an [`AsyncStorage`].
pub struct ItemHandle<'a, B: ?Sized> {
    storage: &'a AsyncStorage<B>,
    key: String,
}

impl<'a, B> ItemHandle<'a, B>
where
    B: StorageBackend + ?Sized + 'static,
{
    /// The key this handle is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Coalesced read of this key.
    pub fn get_item(&self) -> impl Future<Output = StorageResult<Option<String>>> + Send + 'static {
        self.storage.get_item(self.key.clone())
    }

    /// Store `value` under this key.
    pub async fn set_item(&self, value: impl Into<String>) -> StorageResult<()> {
        self.storage.set_item(self.key.clone(), value).await
    }

    /// Remove this key.
    pub async fn remove_item(&self) -> StorageResult<()> {
        self.storage.remove_item(self.key.clone()).await
    }

    /// Merge `value` into this key, or `None` when the backend cannot merge.
    pub async fn merge_item(&self, value: impl Into<String>) -> Option<StorageResult<()>> {
        let merger = self.storage.merger()?;
        Some(merger.merge_item(self.key.clone(), value).await)
    }
}

fn single_value(
    read: ReadFuture,
) -> impl Future<Output = StorageResult<Option<String>>> + Send + 'static {
    async move {
        let mut entries = read.await?;
        Ok(entries.pop().and_then(|(_, value)| value))
    }
}

fn collect_pairs<I, K, V>(pairs: I) -> Vec<KeyValue>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Single-key operations fail with the first reported error.
fn first_error<T>(result: BackendResult<T>) -> StorageResult<()> {
    match normalize_result(result) {
        Some(errors) => Err(StorageError::Backend(errors.into_first())),
        None => Ok(()),
    }
}

/// Multi-key operations fail with every reported error.
fn all_errors<T>(result: BackendResult<T>) -> StorageResult<()> {
    match normalize_result(result) {
        Some(errors) => Err(StorageError::Batch(errors)),
        None => Ok(()),
    }
}
