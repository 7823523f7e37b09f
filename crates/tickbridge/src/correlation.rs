//! Query correlation between connection threads and the host loop.
//!
//! A connection thread registers a fresh [`QueryId`], enqueues the query and
//! blocks on the returned [`WaitHandle`]. The host loop later publishes the
//! answer through [`CorrelationTable::set_result`]. Whichever side finishes
//! first decides the outcome:
//!
//! - the host publishes, the waiter wakes and calls
//!   [`CorrelationTable::take`];
//! - the waiter times out and calls [`CorrelationTable::abandon`]; a later
//!   `set_result` for that id finds nothing and returns `false`.
//!
//! The table lock is released before a wait handle is signalled and is never
//! held together with the pending queue lock.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::wire::QueryId;

/// Errors raised by the correlation table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelationError {
    /// The id already has an outstanding registration.
    #[error("query {id} is already registered")]
    AlreadyRegistered { id: QueryId },
}

/// One-shot signal a connection thread waits on.
#[derive(Debug, Default)]
pub struct WaitHandle {
    signalled: Mutex<bool>,
    condvar: Condvar,
}

impl WaitHandle {
    fn signal(&self) {
        let mut signalled = self
            .signalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *signalled = true;
        self.condvar.notify_all();
    }

    /// Blocks until signalled or until `timeout` elapses.
    ///
    /// Returns `true` when the handle was signalled. Spurious wake-ups are
    /// absorbed; the total wait never exceeds `timeout`.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signalled = self
            .signalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*signalled {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _) = self
                .condvar
                .wait_timeout(signalled, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            signalled = guard;
        }
        true
    }

    /// Returns true once the handle has fired.
    pub fn is_signalled(&self) -> bool {
        *self
            .signalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
struct CorrelationEntry {
    handle: Arc<WaitHandle>,
    result: Option<String>,
}

/// Maps outstanding query ids to their wait handle and result slot.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    counter: AtomicU64,
    entries: Mutex<HashMap<QueryId, CorrelationEntry>>,
}

impl CorrelationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next query id. Ids increase monotonically and are never
    /// reissued within the lifetime of the table.
    pub fn next_id(&self) -> QueryId {
        QueryId::new(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Registers `id` with a fresh wait handle.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::AlreadyRegistered`] when `id` is still
    /// outstanding.
    pub fn register(&self, id: QueryId) -> Result<Arc<WaitHandle>, CorrelationError> {
        let mut entries = self.lock();
        match entries.entry(id) {
            Entry::Occupied(_) => Err(CorrelationError::AlreadyRegistered { id }),
            Entry::Vacant(slot) => {
                let handle = Arc::new(WaitHandle::default());
                slot.insert(CorrelationEntry {
                    handle: Arc::clone(&handle),
                    result: None,
                });
                Ok(handle)
            }
        }
    }

    /// Stores `value` for `id` and wakes its waiter.
    ///
    /// Returns `false` without side effects when `id` is not registered (the
    /// waiter already gave up) or already holds a result.
    pub fn set_result(&self, id: QueryId, value: impl Into<String>) -> bool {
        let handle = {
            let mut entries = self.lock();
            let Some(entry) = entries.get_mut(&id) else {
                return false;
            };
            if entry.result.is_some() {
                return false;
            }
            entry.result = Some(value.into());
            Arc::clone(&entry.handle)
        };
        handle.signal();
        true
    }

    /// Removes the registration for `id` and returns its stored result.
    pub fn take(&self, id: QueryId) -> Option<String> {
        self.lock().remove(&id).and_then(|entry| entry.result)
    }

    /// Removes the registration for `id` without consuming a result.
    ///
    /// Returns `true` when a registration was removed.
    pub fn abandon(&self, id: QueryId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Number of outstanding registrations.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when no query is outstanding.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryId, CorrelationEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
