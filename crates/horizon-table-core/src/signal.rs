//! Signal/slot system for Horizon Table.
//!
//! Signals are the observation primitive underneath every binding: model
//! properties, view control events and backing collections all announce their
//! changes through a [`Signal`]. Delivery is synchronous on the emitting
//! thread; the table layer is single-threaded and cooperative, so there is no
//! queued connection type.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The signal type for emitting notifications
//! - [`ConnectionId`] - Identifier returned when connecting a slot
//! - [`Subscription`] - RAII handle that disconnects when dropped
//! - [`SignalEmitter`] - Type-erased view of a signal, used by subscriptions
//!
//! # Re-entrancy
//!
//! Slots are invoked after the connection table lock has been released, so a
//! slot may connect, disconnect or emit other signals. A slot disconnected
//! while an emission is in flight is not invoked for the remainder of that
//! emission.
//!
//! # Example
//!
//! ```
//! use horizon_table_core::Signal;
//!
//! let name_changed = Signal::<String>::new();
//! let id = name_changed.connect(|name| assert_eq!(name, "Grace"));
//! name_changed.emit("Grace".into());
//! assert!(name_changed.disconnect(id));
//! assert_eq!(name_changed.connection_count(), 0);
//! ```

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// Key of one connected slot, handed back by [`Signal::connect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A list of slots called with `&Args` on every emission.
///
/// Key signals carry the new [`Value`](crate::Value), collection signals an
/// index pair, and plain notifications `()`.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// An unconnected signal.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Attach `slot`. It stays attached until disconnected by id.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Detach one slot. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Detach every slot.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of attached slots. Teardown tests compare it to a baseline.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Returns `true` if the given connection is still attached.
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.lock().contains_key(id)
    }

    /// Suppress emissions until unblocked.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether emissions are suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots in connection order.
    #[tracing::instrument(skip_all, target = "horizon_table_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let snapshot: Vec<(ConnectionId, Slot<Args>)> = {
            let connections = self.connections.lock();
            connections
                .iter()
                .map(|(id, slot)| (id, Arc::clone(slot)))
                .collect()
        };
        tracing::trace!(target: targets::SIGNAL, connection_count = snapshot.len(), "emitting signal");

        for (id, slot) in snapshot {
            // Skip slots torn down by an earlier slot in this same emission.
            if !self.is_connected(id) {
                continue;
            }
            slot(&args);
        }
    }
}

impl<Args: Send + 'static> Signal<Args> {
    /// Connect a slot on a shared signal and return a [`Subscription`] that
    /// disconnects it when dropped.
    ///
    /// The subscription only holds a weak reference, so it never keeps the
    /// signal alive.
    pub fn subscribe<F>(self: &Arc<Self>, slot: F) -> Subscription
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        let emitter: Arc<dyn SignalEmitter> = self.clone();
        Subscription {
            signal: Arc::downgrade(&emitter),
            id: Some(id),
        }
    }
}

/// A signal with its argument type erased.
///
/// [`Subscription`]s hold one of these, so a binding can keep registrations
/// on signals of different argument types side by side.
pub trait SignalEmitter: Send + Sync {
    /// See [`Signal::disconnect`].
    fn disconnect(&self, id: ConnectionId) -> bool;

    /// See [`Signal::disconnect_all`].
    fn disconnect_all(&self);

    /// See [`Signal::connection_count`].
    fn connection_count(&self) -> usize;

    /// For downcasting back to the concrete signal.
    fn as_any(&self) -> &dyn Any;
}

impl<Args: Send + 'static> SignalEmitter for Signal<Args> {
    fn disconnect(&self, id: ConnectionId) -> bool {
        Signal::disconnect(self, id)
    }

    fn disconnect_all(&self) {
        Signal::disconnect_all(self);
    }

    fn connection_count(&self) -> usize {
        Signal::connection_count(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A connection that is removed from its signal when dropped.
///
/// Created via [`Signal::subscribe`]. The handle is non-owning: if the signal
/// has already been dropped, dropping the subscription is a no-op.
///
/// # Example
///
/// ```
/// use horizon_table_core::Signal;
/// use std::sync::Arc;
///
/// let rows_removed = Arc::new(Signal::<(usize, usize)>::new());
/// let subscription = rows_removed.subscribe(|&(first, last)| assert!(first <= last));
/// rows_removed.emit((1, 1));
/// assert_eq!(rows_removed.connection_count(), 1);
///
/// drop(subscription);
/// assert_eq!(rows_removed.connection_count(), 0);
/// ```
#[must_use = "dropping a Subscription disconnects it immediately"]
pub struct Subscription {
    signal: Weak<dyn SignalEmitter>,
    id: Option<ConnectionId>,
}

impl Subscription {
    /// Disconnect now instead of waiting for drop.
    ///
    /// Returns `true` if a live connection was removed.
    pub fn cancel(&mut self) -> bool {
        match (self.id.take(), self.signal.upgrade()) {
            (Some(id), Some(signal)) => signal.disconnect(id),
            _ => false,
        }
    }

    /// Returns `true` while the signal is alive and the slot still attached.
    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.signal.strong_count() > 0
    }

    /// The underlying connection id, if not yet cancelled.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

static_assertions::assert_impl_all!(Signal<i32>: Send, Sync);
static_assertions::assert_impl_all!(Subscription: Send, Sync);
