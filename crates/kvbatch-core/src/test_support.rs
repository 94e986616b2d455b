//! Scripted backend shared by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kvbatch_backend::{
    BackendResult, InMemoryBackend, KeyError, KeyValue, KeyValueEntry, MergeBackend,
    RawBackendError, StorageBackend,
};
use tokio::sync::Notify;

pub(crate) fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn entry(key: &str, value: Option<&str>) -> KeyValueEntry {
    (key.to_string(), value.map(str::to_string))
}

/// In-memory backend that records every call and can be told to fail.
pub(crate) struct ScriptedBackend {
    store: InMemoryBackend,
    reads: Mutex<Vec<Vec<String>>>,
    writes: Mutex<Vec<&'static str>>,
    read_failure: Mutex<Option<RawBackendError>>,
    write_failure: Mutex<Option<RawBackendError>>,
    wide_failure: Mutex<Option<KeyError>>,
    read_gate: Mutex<Option<Arc<Notify>>>,
    sparse: bool,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::from_store(InMemoryBackend::new())
    }

    pub(crate) fn without_merge() -> Self {
        Self::from_store(InMemoryBackend::without_merge())
    }

    pub(crate) fn with_entries<const N: usize>(pairs: [(&str, &str); N]) -> Self {
        Self::from_store(InMemoryBackend::with_entries(pairs))
    }

    pub(crate) fn seeded(pairs: &[(&str, &str)]) -> Self {
        Self::from_store(InMemoryBackend::with_entries(pairs.iter().copied()))
    }

    fn from_store(store: InMemoryBackend) -> Self {
        Self {
            store,
            reads: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            read_failure: Mutex::new(None),
            write_failure: Mutex::new(None),
            wide_failure: Mutex::new(None),
            read_gate: Mutex::new(None),
            sparse: false,
        }
    }

    /// Omit missing keys from `multi_get` results and reverse their order.
    pub(crate) fn sparse_reads(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// Key lists of every `multi_get` call so far.
    pub(crate) fn reads(&self) -> Vec<Vec<String>> {
        self.reads.lock().unwrap().clone()
    }

    /// Names of every write-side call so far.
    pub(crate) fn writes(&self) -> Vec<&'static str> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn fail_reads_with(&self, err: RawBackendError) {
        *self.read_failure.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_writes_with(&self, err: RawBackendError) {
        *self.write_failure.lock().unwrap() = Some(err);
    }

    /// Fail `clear` and `get_all_keys` with `err`.
    pub(crate) fn fail_wide_with(&self, err: KeyError) {
        *self.wide_failure.lock().unwrap() = Some(err);
    }

    /// Make the next `multi_get` wait until the returned gate is notified.
    pub(crate) fn hold_next_read(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.read_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    fn record_write(&self, op: &'static str) -> BackendResult<()> {
        self.writes.lock().unwrap().push(op);
        match self.write_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn wide_failure(&self) -> Option<KeyError> {
        self.wide_failure.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageBackend for ScriptedBackend {
    async fn multi_get(&self, keys: &[String]) -> BackendResult<Vec<KeyValueEntry>> {
        self.reads.lock().unwrap().push(keys.to_vec());
        let gate = self.read_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let failure = self.read_failure.lock().unwrap().clone();
        if let Some(err) = failure {
            return Err(err);
        }
        let mut entries = self.store.multi_get(keys).await?;
        if self.sparse {
            entries.retain(|(_, value)| value.is_some());
            entries.reverse();
        }
        Ok(entries)
    }

    async fn multi_set(&self, pairs: &[KeyValue]) -> BackendResult<()> {
        self.record_write("multi_set")?;
        self.store.multi_set(pairs).await
    }

    async fn multi_remove(&self, keys: &[String]) -> BackendResult<()> {
        self.record_write("multi_remove")?;
        self.store.multi_remove(keys).await
    }

    async fn clear(&self) -> Result<(), KeyError> {
        if let Some(err) = self.wide_failure() {
            return Err(err);
        }
        self.store.clear().await
    }

    async fn get_all_keys(&self) -> Result<Option<Vec<String>>, KeyError> {
        if let Some(err) = self.wide_failure() {
            return Err(err);
        }
        self.store.get_all_keys().await
    }

    fn merger(&self) -> Option<&dyn MergeBackend> {
        self.store.merger().map(|_| self as &dyn MergeBackend)
    }
}

#[async_trait]
impl MergeBackend for ScriptedBackend {
    async fn multi_merge(&self, pairs: &[KeyValue]) -> BackendResult<()> {
        self.record_write("multi_merge")?;
        match self.store.merger() {
            Some(merger) => merger.multi_merge(pairs).await,
            None => Err(KeyError::new("merge not supported").into()),
        }
    }
}
