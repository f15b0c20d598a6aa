//! Observable ordered collections of model objects.
//!
//! [`ObservableList`] is the backing store of a dynamic table section. Every
//! structural change is announced on [`CollectionSignals`] after the change
//! has been applied and the internal lock released, so observers can read
//! the list from inside a slot.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::KeyPathError;
use crate::logging::targets;
use crate::object::{KeyValueObject, ObjectRef};
use crate::signal::Signal;
use crate::value::{ObjectId, Value};

/// Signals emitted by an [`ObservableList`].
pub struct CollectionSignals {
    /// Emitted after items were inserted.
    /// Args: (first index, last index), inclusive
    pub rows_inserted: Arc<Signal<(usize, usize)>>,

    /// Emitted after items were removed.
    /// Args: (first index, last index), inclusive, in pre-removal indices
    pub rows_removed: Arc<Signal<(usize, usize)>>,

    /// Emitted after one item was moved.
    /// Args: (from index, to index)
    pub rows_moved: Arc<Signal<(usize, usize)>>,

    /// Emitted after the whole content was replaced.
    pub reset: Arc<Signal<()>>,

    count: Arc<Signal<Value>>,
}

impl Default for CollectionSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionSignals {
    /// Creates a new set of collection signals.
    pub fn new() -> Self {
        Self {
            rows_inserted: Arc::new(Signal::new()),
            rows_removed: Arc::new(Signal::new()),
            rows_moved: Arc::new(Signal::new()),
            reset: Arc::new(Signal::new()),
            count: Arc::new(Signal::new()),
        }
    }

    /// Total number of connections across all signals.
    pub fn connection_count(&self) -> usize {
        self.rows_inserted.connection_count()
            + self.rows_removed.connection_count()
            + self.rows_moved.connection_count()
            + self.reset.connection_count()
            + self.count.connection_count()
    }
}

/// An ordered, observable list of model objects.
///
/// Objects are compared by identity ([`ObjectId`]), never by content.
///
/// Also a [`KeyValueObject`] exposing a read-only, observable `count` key.
#[derive(Default)]
pub struct ObservableList {
    items: RwLock<Vec<ObjectRef>>,
    signals: CollectionSignals,
}

impl ObservableList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a shared list with initial contents.
    pub fn shared(items: Vec<ObjectRef>) -> Arc<Self> {
        Arc::new(Self {
            items: RwLock::new(items),
            signals: CollectionSignals::new(),
        })
    }

    /// The list's signals.
    pub fn signals(&self) -> &CollectionSignals {
        &self.signals
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// The item at `index`.
    pub fn get(&self, index: usize) -> Option<ObjectRef> {
        self.items.read().get(index).cloned()
    }

    /// A snapshot of all items.
    pub fn snapshot(&self) -> Vec<ObjectRef> {
        self.items.read().clone()
    }

    /// Index of `object` by identity.
    pub fn index_of(&self, object: &ObjectRef) -> Option<usize> {
        let id = ObjectId::of(object);
        self.items.read().iter().position(|o| ObjectId::of(o) == id)
    }

    /// Appends an item.
    pub fn push(&self, item: ObjectRef) {
        let index = {
            let mut items = self.items.write();
            items.push(item);
            items.len() - 1
        };
        self.announce_inserted(index, index);
    }

    /// Inserts an item. Returns `false` (and does nothing) if `index > len()`.
    pub fn insert(&self, index: usize, item: ObjectRef) -> bool {
        {
            let mut items = self.items.write();
            if index > items.len() {
                tracing::warn!(target: targets::COLLECTION, index, len = items.len(), "insert out of range");
                return false;
            }
            items.insert(index, item);
        }
        self.announce_inserted(index, index);
        true
    }

    /// Removes and returns the item at `index`.
    pub fn remove(&self, index: usize) -> Option<ObjectRef> {
        let removed = {
            let mut items = self.items.write();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        tracing::trace!(target: targets::COLLECTION, index, "item removed");
        self.signals.rows_removed.emit((index, index));
        self.announce_count();
        Some(removed)
    }

    /// Removes `object` by identity. Returns its former index.
    pub fn remove_object(&self, object: &ObjectRef) -> Option<usize> {
        let index = self.index_of(object)?;
        self.remove(index).map(|_| index)
    }

    /// Moves the item at `from` so that it ends up at `to`.
    pub fn move_item(&self, from: usize, to: usize) -> bool {
        {
            let mut items = self.items.write();
            if from >= items.len() || to >= items.len() {
                return false;
            }
            if from == to {
                return true;
            }
            let item = items.remove(from);
            items.insert(to, item);
        }
        tracing::trace!(target: targets::COLLECTION, from, to, "item moved");
        self.signals.rows_moved.emit((from, to));
        true
    }

    /// Replaces all items.
    pub fn replace_all(&self, items: Vec<ObjectRef>) {
        *self.items.write() = items;
        self.signals.reset.emit(());
        self.announce_count();
    }

    /// Removes all items.
    pub fn clear(&self) {
        self.replace_all(Vec::new());
    }

    fn announce_inserted(&self, first: usize, last: usize) {
        tracing::trace!(target: targets::COLLECTION, first, last, "items inserted");
        self.signals.rows_inserted.emit((first, last));
        self.announce_count();
    }

    fn announce_count(&self) {
        self.signals.count.emit(Value::Int(self.len() as i64));
    }
}

impl KeyValueObject for ObservableList {
    fn value_for_key(&self, key: &str) -> Option<Value> {
        match key {
            "count" => Some(Value::Int(self.len() as i64)),
            _ => None,
        }
    }

    fn set_value_for_key(&self, key: &str, _value: Value) -> Result<bool, KeyPathError> {
        match key {
            "count" => Err(KeyPathError::ReadOnly { key: key.to_string() }),
            _ => Err(KeyPathError::Unresolved {
                path: key.to_string(),
                key: key.to_string(),
            }),
        }
    }

    fn key_signal(&self, key: &str) -> Option<Arc<Signal<Value>>> {
        (key == "count").then(|| self.signals.count.clone())
    }

    fn type_label(&self) -> &'static str {
        "ObservableList"
    }
}

impl fmt::Debug for ObservableList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("len", &self.len())
            .field("observers", &self.signals.connection_count())
            .finish()
    }
}
