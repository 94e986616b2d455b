//! Pending read requests for the current tick.
//!
//! The [`RequestLedger`] owns every read registered since the last flush,
//! together with the [`KeyUniverse`]: the deduplicated union of their keys in
//! first-seen order. [`RequestLedger::drain_all`] hands both over to the
//! flush and leaves the ledger empty.

use std::collections::HashSet;

/// Insertion-ordered set of keys.
#[derive(Clone, Debug, Default)]
pub struct KeyUniverse {
    keys: Vec<String>,
    seen: HashSet<String>,
}

impl KeyUniverse {
    /// An empty universe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` unless it is already present. Returns `true` if added.
    pub fn insert(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.to_string());
        self.keys.push(key.to_string());
        true
    }

    /// Returns `true` if `key` has been inserted.
    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no key has been inserted.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in first-seen order.
    pub fn as_slice(&self) -> &[String] {
        &self.keys
    }

    /// Consume the universe, keeping first-seen order.
    pub fn into_vec(self) -> Vec<String> {
        self.keys
    }
}

/// One registered read: the keys it asked for and where its result goes.
#[derive(Debug)]
pub struct PendingRead<S> {
    /// Keys in the caller's order, duplicates included.
    pub keys: Vec<String>,
    /// Completion handle, consumed exactly once when the read is resolved.
    pub sink: S,
}

/// Everything a flush takes over from the ledger.
#[derive(Debug)]
pub struct Drained<S> {
    /// Requests in registration order.
    pub requests: Vec<PendingRead<S>>,
    /// Deduplicated union of the requests' keys.
    pub keys: Vec<String>,
}

/// Reads registered since the last flush.
#[derive(Debug)]
pub struct RequestLedger<S> {
    pending: Vec<PendingRead<S>>,
    universe: KeyUniverse,
}

impl<S> RequestLedger<S> {
    /// An empty ledger.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            universe: KeyUniverse::new(),
        }
    }

    /// Append a request and merge its keys into the key universe.
    pub fn register(&mut self, keys: Vec<String>, sink: S) {
        for key in &keys {
            self.universe.insert(key);
        }
        self.pending.push(PendingRead { keys, sink });
    }

    /// Detach all pending requests and the key universe, leaving both empty.
    pub fn drain_all(&mut self) -> Drained<S> {
        let requests = std::mem::take(&mut self.pending);
        let keys = std::mem::take(&mut self.universe).into_vec();
        Drained { requests, keys }
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if no request is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Deduplicated keys of every pending request.
    pub fn universe(&self) -> &KeyUniverse {
        &self.universe
    }
}

impl<S> Default for RequestLedger<S> {
    fn default() -> Self {
        Self::new()
    }
}
