//! Subscriptions
//!
//! A [`Connection`] is the disposable handle returned by `Signal::connect`.
//! It does not know the payload type: it holds a weak, type-erased pointer
//! back to the subscriber list, so it never keeps a signal alive.

use std::fmt;
use std::sync::Weak;

/// Identifier of one subscription, unique within its signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub(crate) u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Type-erased view of a subscriber list
pub(crate) trait SubscriberList: Send + Sync {
    /// Remove subscription, returns true if it was present
    fn remove(&self, id: ConnectionId) -> bool;

    /// Check presence
    fn contains(&self, id: ConnectionId) -> bool;
}

/// Handle to a subscription
///
/// Dropping a `Connection` does **not** disconnect; call
/// [`disconnect`](Self::disconnect), or convert with
/// [`guard`](Self::guard) for scope-bound subscriptions.
#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    list: Weak<dyn SubscriberList>,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, list: Weak<dyn SubscriberList>) -> Self {
        Self { id, list }
    }

    /// Subscription id
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remove the handler; idempotent
    ///
    /// Returns true if this call removed it.
    pub fn disconnect(&self) -> bool {
        self.list.upgrade().is_some_and(|list| list.remove(self.id))
    }

    /// Whether the handler is still subscribed
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.list.upgrade().is_some_and(|list| list.contains(self.id))
    }

    /// Convert into a guard that disconnects on drop
    #[inline]
    #[must_use]
    pub fn guard(self) -> ConnectionGuard {
        ConnectionGuard {
            connection: self,
            armed: true,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Disconnects its subscription when dropped
#[derive(Debug)]
#[must_use = "dropping the guard disconnects immediately"]
pub struct ConnectionGuard {
    connection: Connection,
    armed: bool,
}

impl ConnectionGuard {
    /// Guarded connection
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Detach the guard, keeping the subscription alive
    #[must_use]
    pub fn release(mut self) -> Connection {
        self.armed = false;
        self.connection.clone()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.armed {
            self.connection.disconnect();
        }
    }
}
