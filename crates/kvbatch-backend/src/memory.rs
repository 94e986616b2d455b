use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{BackendResult, KeyError, RawBackendError};
use crate::merge::merge_json;
use crate::traits::{KeyValue, KeyValueEntry, MergeBackend, StorageBackend};

/// In-memory, HashMap-based storage backend.
///
/// Intended for tests and embedding. Entries live behind a `RwLock`, so every
/// batched operation observes and applies a consistent snapshot. Values are
/// cloned on read and write.
pub struct InMemoryBackend {
    entries: RwLock<HashMap<String, String>>,
    merge_enabled: bool,
}

impl InMemoryBackend {
    /// Create a new empty backend with merge support.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            merge_enabled: true,
        }
    }

    /// Create a new empty backend that does not offer the merge capability.
    pub fn without_merge() -> Self {
        Self {
            merge_enabled: false,
            ..Self::new()
        }
    }

    /// Create a backend pre-populated with `pairs`.
    pub fn with_entries<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let backend = Self::new();
        {
            let mut map = backend.entries.write().expect("lock poisoned");
            map.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        }
        backend
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Read one value directly, bypassing the batched interface.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().expect("lock poisoned").get(key).cloned()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn multi_get(&self, keys: &[String]) -> BackendResult<Vec<KeyValueEntry>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(keys
            .iter()
            .map(|key| (key.clone(), map.get(key).cloned()))
            .collect())
    }

    async fn multi_set(&self, pairs: &[KeyValue]) -> BackendResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        for (key, value) in pairs {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn multi_remove(&self, keys: &[String]) -> BackendResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), KeyError> {
        self.entries.write().expect("lock poisoned").clear();
        Ok(())
    }

    async fn get_all_keys(&self) -> Result<Option<Vec<String>>, KeyError> {
        let map = self.entries.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(Some(keys))
    }

    fn merger(&self) -> Option<&dyn MergeBackend> {
        if self.merge_enabled {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl MergeBackend for InMemoryBackend {
    /// All-or-nothing: if any pair fails to merge, nothing is written and
    /// every failure is reported against its key.
    async fn multi_merge(&self, pairs: &[KeyValue]) -> BackendResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        let mut staged: HashMap<String, String> = HashMap::new();
        let mut errors = Vec::new();

        for (key, value) in pairs {
            // Later pairs for the same key merge on top of earlier ones.
            let current = staged.get(key).or_else(|| map.get(key));
            let merged = match current {
                Some(existing) => merge_json(existing, value),
                None => Ok(value.clone()),
            };
            match merged {
                Ok(merged) => {
                    staged.insert(key.clone(), merged);
                }
                Err(message) => errors.push(KeyError::for_key(message, key.clone())),
            }
        }

        if !errors.is_empty() {
            return Err(RawBackendError::Many(errors));
        }
        map.extend(staged);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("entry_count", &self.len())
            .field("merge_enabled", &self.merge_enabled)
            .finish()
    }
}
