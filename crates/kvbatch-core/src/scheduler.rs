//! Read coalescing.
//!
//! Every `get_item`/`multi_get` issued during one tick of the async runtime
//! lands in the same [`RequestLedger`]. The first registration of a tick arms
//! a flush by spawning a task; that task only runs once the registering task
//! yields, so all reads issued before that point share one backend
//! `multi_get` over the deduplicated union of their keys.
//!
//! The armed token is a tick number. A flush disarms and drains the ledger
//! under one lock, before awaiting the backend, so reads issued while the
//! backend call is in flight start a fresh tick instead of joining a batch
//! that has already left.
//!
//! The flush task owns a [`FlushGuard`]. If the task is dropped before it
//! drains its tick (the runtime shut down, or the spawn was refused), the
//! guard disarms the tick and rejects its reads with
//! [`StorageError::FlushAborted`], so the next read arms a fresh flush.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use kvbatch_backend::{normalize, KeyValueEntry, StorageBackend};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::{StorageError, StorageResult};
use crate::ledger::{Drained, PendingRead, RequestLedger};

/// Outcome delivered to each read: one entry per requested key, in request
/// order.
pub type ReadOutcome = StorageResult<Vec<KeyValueEntry>>;

type ReadSink = oneshot::Sender<ReadOutcome>;

struct SchedulerState {
    ledger: RequestLedger<ReadSink>,
    /// Tick whose flush is currently scheduled, if any.
    armed: Option<u64>,
    next_tick: u64,
}

struct Inner<B: ?Sized> {
    backend: Arc<B>,
    state: Mutex<SchedulerState>,
}

/// Coalesces reads issued within one tick into a single backend call.
///
/// Cloning is cheap and yields a handle to the same scheduler.
pub struct ReadScheduler<B: ?Sized> {
    inner: Arc<Inner<B>>,
}

impl<B: ?Sized> Clone for ReadScheduler<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> ReadScheduler<B>
where
    B: StorageBackend + ?Sized + 'static,
{
    /// A scheduler with an empty ledger over `backend`.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                state: Mutex::new(SchedulerState {
                    ledger: RequestLedger::new(),
                    armed: None,
                    next_tick: 0,
                }),
            }),
        }
    }

    /// Register a read for `keys` and arm a flush if none is armed.
    ///
    /// Registration happens before this returns; the returned future only
    /// waits for the flush to resolve it.
    pub fn request_read(&self, keys: Vec<String>) -> ReadFuture {
        let (tx, rx) = oneshot::channel();
        let tick = {
            let mut state = self.inner.state.lock().expect("scheduler lock poisoned");
            state.ledger.register(keys, tx);
            if state.armed.is_some() {
                None
            } else {
                let tick = state.next_tick;
                state.next_tick += 1;
                state.armed = Some(tick);
                Some(tick)
            }
        };
        if let Some(tick) = tick {
            self.arm(tick);
        }
        ReadFuture::waiting(rx)
    }

    /// Flush every pending read now, without waiting for the armed tick.
    ///
    /// The armed tick, if any, is disarmed and its scheduled flush becomes a
    /// no-op.
    pub async fn flush_now(&self) {
        let drained = {
            let mut state = self.inner.state.lock().expect("scheduler lock poisoned");
            state.armed = None;
            state.ledger.drain_all()
        };
        self.inner.run_batch(drained).await;
    }

    /// Number of reads waiting for the next flush.
    pub fn pending_reads(&self) -> usize {
        self.inner
            .state
            .lock()
            .expect("scheduler lock poisoned")
            .ledger
            .len()
    }

    /// Returns `true` if a flush is scheduled.
    pub fn is_armed(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("scheduler lock poisoned")
            .armed
            .is_some()
    }

    fn arm(&self, tick: u64) {
        match Handle::try_current() {
            Ok(handle) => {
                trace!(tick, "read flush armed");
                let guard = FlushGuard {
                    inner: Arc::clone(&self.inner),
                    tick,
                };
                handle.spawn(async move {
                    guard.inner.flush_tick(guard.tick).await;
                });
            }
            Err(_) => {
                warn!(tick, "no async runtime to flush reads; rejecting pending reads");
                let drained = {
                    let mut state = self.inner.state.lock().expect("scheduler lock poisoned");
                    if state.armed == Some(tick) {
                        state.armed = None;
                    }
                    state.ledger.drain_all()
                };
                for request in drained.requests {
                    deliver(request.sink, Err(StorageError::RuntimeUnavailable));
                }
            }
        }
    }
}

impl<B: ?Sized> Inner<B> {
    /// Disarm `tick` and reject its reads, unless it was already flushed.
    fn abort_tick(&self, tick: u64) {
        let drained = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if state.armed != Some(tick) {
                return;
            }
            state.armed = None;
            state.ledger.drain_all()
        };
        warn!(
            tick,
            requests = drained.requests.len(),
            "read flush dropped before it ran; rejecting its reads"
        );
        for request in drained.requests {
            deliver(request.sink, Err(StorageError::FlushAborted));
        }
    }
}

/// Owned by a spawned flush task. Dropping it before the task drained its
/// tick aborts that tick.
struct FlushGuard<B: ?Sized> {
    inner: Arc<Inner<B>>,
    tick: u64,
}

impl<B: ?Sized> Drop for FlushGuard<B> {
    fn drop(&mut self) {
        // No-op once the tick was drained or superseded.
        self.inner.abort_tick(self.tick);
    }
}

impl<B> Inner<B>
where
    B: StorageBackend + ?Sized,
{
    async fn flush_tick(&self, tick: u64) {
        let drained = {
            let mut state = self.state.lock().expect("scheduler lock poisoned");
            if state.armed != Some(tick) {
                trace!(tick, "stale flush skipped");
                return;
            }
            state.armed = None;
            state.ledger.drain_all()
        };
        self.run_batch(drained).await;
    }

    async fn run_batch(&self, drained: Drained<ReadSink>) {
        let Drained { requests, keys } = drained;
        if requests.is_empty() {
            return;
        }
        if keys.is_empty() {
            for request in requests {
                deliver(request.sink, Ok(Vec::new()));
            }
            return;
        }

        debug!(keys = keys.len(), requests = requests.len(), "flushing coalesced read");
        let result = self.backend.multi_get(&keys).await;

        match result {
            Ok(entries) => resolve_all(requests, entries),
            Err(raw) => match normalize(Some(raw)) {
                Some(errors) => {
                    let first = errors.into_first();
                    warn!(
                        error = %first,
                        key = first.key.as_deref().unwrap_or(""),
                        requests = requests.len(),
                        "coalesced read failed; rejecting every read of the tick"
                    );
                    for request in requests {
                        deliver(request.sink, Err(StorageError::Backend(first.clone())));
                    }
                }
                // An empty error list is no error, but also no data.
                None => resolve_all(requests, Vec::new()),
            },
        }
    }
}

/// Fan one batch result out to every request, in registration order.
fn resolve_all(requests: Vec<PendingRead<ReadSink>>, entries: Vec<KeyValueEntry>) {
    let lookup: HashMap<String, Option<String>> = entries.into_iter().collect();
    for PendingRead { keys, sink } in requests {
        let values = keys
            .into_iter()
            .map(|key| {
                let value = lookup.get(&key).cloned().flatten();
                (key, value)
            })
            .collect();
        deliver(sink, Ok(values));
    }
}

fn deliver(sink: ReadSink, outcome: ReadOutcome) {
    if sink.send(outcome).is_err() {
        trace!("read waiter dropped before resolution");
    }
}

enum ReadState {
    Waiting(oneshot::Receiver<ReadOutcome>),
    Rejected(Option<StorageError>),
}

/// Future of a registered read.
///
/// Resolves once the flush of the tick the read was registered in has
/// completed. If that flush is dropped before resolving it (for example
/// because the runtime it was spawned on shut down, before or during the
/// backend call), resolves to [`StorageError::FlushAborted`].
pub struct ReadFuture {
    state: ReadState,
}

impl ReadFuture {
    fn waiting(rx: oneshot::Receiver<ReadOutcome>) -> Self {
        Self {
            state: ReadState::Waiting(rx),
        }
    }

    /// A read that failed before it could be registered.
    pub fn rejected(error: StorageError) -> Self {
        Self {
            state: ReadState::Rejected(Some(error)),
        }
    }
}

impl Future for ReadFuture {
    type Output = ReadOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            ReadState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(StorageError::FlushAborted))),
            ReadState::Rejected(error) => {
                Poll::Ready(Err(error.take().unwrap_or(StorageError::FlushAborted)))
            }
        }
    }
}

impl std::fmt::Debug for ReadFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            ReadState::Waiting(_) => "waiting",
            ReadState::Rejected(_) => "rejected",
        };
        f.debug_struct("ReadFuture").field("state", &state).finish()
    }
}
