//! Ordered multi-subscriber signal
//!
//! Provides [`Signal`], a synchronous notification channel.
//!
//! # Dispatch semantics
//! - Handlers run in registration order on the firing thread.
//! - `fire` snapshots the subscriber list and releases the lock before the
//!   first handler runs, so handlers may connect, disconnect or fire again.
//!   Handlers connected during a dispatch are not part of it.
//! - A failing handler does not stop the dispatch; every failure is
//!   returned together once the snapshot has run to completion.

use crate::connection::{Connection, ConnectionId, SubscriberList};
use crate::error::{DispatchError, HandlerFailure};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

type Handler<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

struct Slots<T> {
    next_id: u64,
    entries: Vec<(ConnectionId, Handler<T>)>,
}

impl<T> Slots<T> {
    fn allocate(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        id
    }
}

struct Shared<T> {
    name: String,
    slots: Mutex<Slots<T>>,
}

impl<T: 'static> SubscriberList for Shared<T> {
    fn remove(&self, id: ConnectionId) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.entries.len();
        slots.entries.retain(|(entry, _)| *entry != id);
        slots.entries.len() != before
    }

    fn contains(&self, id: ConnectionId) -> bool {
        self.slots.lock().entries.iter().any(|(entry, _)| *entry == id)
    }
}

/// Synchronous, ordered notification channel
///
/// Cloning yields another handle to the same subscriber list.
pub struct Signal<T> {
    shared: Arc<Shared<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create signal; `name` only appears in diagnostics
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                slots: Mutex::new(Slots {
                    next_id: 0,
                    entries: Vec::new(),
                }),
            }),
        }
    }

    /// Diagnostic name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    fn list(&self) -> Weak<dyn SubscriberList> {
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        weak
    }

    /// Subscribe a handler
    pub fn connect<F>(&self, handler: F) -> Connection
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handler: Handler<T> = Arc::new(handler);
        let mut slots = self.shared.slots.lock();
        let id = slots.allocate();
        slots.entries.push((id, handler));
        Connection::new(id, self.list())
    }

    /// Subscribe a handler that disconnects itself after its first call
    pub fn once<F>(&self, handler: F) -> Connection
    where
        F: FnOnce(&T) -> anyhow::Result<()> + Send + 'static,
    {
        let pending = Mutex::new(Some(handler));
        let list = self.list();
        let own_list = list.clone();

        let mut slots = self.shared.slots.lock();
        let id = slots.allocate();
        let wrapped: Handler<T> = Arc::new(move |payload: &T| {
            let Some(handler) = pending.lock().take() else {
                return Ok(());
            };
            if let Some(list) = own_list.upgrade() {
                list.remove(id);
            }
            handler(payload)
        });
        slots.entries.push((id, wrapped));
        Connection::new(id, list)
    }

    /// Invoke every current subscriber with `payload`
    ///
    /// # Errors
    /// Returns every handler failure after all subscribers have run
    pub fn fire(&self, payload: &T) -> Result<(), DispatchError> {
        let snapshot: Vec<(ConnectionId, Handler<T>)> = self.shared.slots.lock().entries.clone();

        let mut failures = Vec::new();
        for (id, handler) in &snapshot {
            if let Err(error) = handler(payload) {
                tracing::warn!("{} handler {} failed: {:#}", self.shared.name, id, error);
                failures.push(HandlerFailure {
                    signal: self.shared.name.clone(),
                    connection: *id,
                    error,
                });
            }
        }

        tracing::trace!(
            "Fired {} to {} handler(s), {} failed",
            self.shared.name,
            snapshot.len(),
            failures.len()
        );

        match DispatchError::from_failures(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Number of current subscribers
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.slots.lock().entries.len()
    }

    /// Check if nothing is subscribed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriber_count() == 0
    }

    /// Drop every subscription
    pub fn disconnect_all(&self) {
        self.shared.slots.lock().entries.clear();
    }

    /// Check if two handles share a subscriber list
    #[inline]
    #[must_use]
    pub fn same_signal(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.shared.name)
            .field("subscribers", &self.shared.slots.lock().entries.len())
            .finish()
    }
}
