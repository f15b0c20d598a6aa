//! Key-value objects: the observable surface of models and views.
//!
//! The binding engine never touches model fields directly. It reads, writes
//! and observes through the [`KeyValueObject`] trait, which any model type can
//! implement. Two ready-made implementations are provided:
//!
//! - [`Record`] - a dynamic property bag; any key can be written
//! - [`AccessorObject`] - wraps a typed value and exposes named fields through
//!   get/set closures registered at the call site
//!
//! # Observation
//!
//! Observation is a capability: [`KeyValueObject::key_signal`] returns the
//! signal announcing changes to a key, or `None` when the object cannot be
//! observed for that key. Callers probe before subscribing.
//!
//! # Example
//!
//! ```
//! use horizon_table_core::{KeyValueObject, Record, Value};
//!
//! let person = Record::shared()
//!     .with_value("name", "Ada")
//!     .with_value("age", 36);
//!
//! let signal = person.key_signal("name").expect("records are observable");
//! signal.connect(|value| println!("name is now {:?}", value));
//!
//! person.set("name", "Grace");
//! assert_eq!(person.get("name"), Some(Value::from("Grace")));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::KeyPathError;
use crate::event::ControlEvent;
use crate::signal::Signal;
use crate::value::Value;

/// Shared handle to a key-value object.
pub type ObjectRef = Arc<dyn KeyValueObject>;

/// Read, write and observe named values on an object.
pub trait KeyValueObject: Send + Sync {
    /// Returns the value for `key`, or `None` if the object has no such key.
    ///
    /// A key that exists but holds nothing returns `Some(Value::None)`.
    fn value_for_key(&self, key: &str) -> Option<Value>;

    /// Writes `value` under `key`.
    ///
    /// Returns `Ok(true)` if the stored value changed (observers were
    /// notified), `Ok(false)` if it was already equal.
    fn set_value_for_key(&self, key: &str, value: Value) -> Result<bool, KeyPathError>;

    /// The change signal for `key`, if the key can be observed.
    fn key_signal(&self, _key: &str) -> Option<Arc<Signal<Value>>> {
        None
    }

    /// The interaction event channel, for objects that are controls.
    fn control_events(&self) -> Option<Arc<Signal<ControlEvent>>> {
        None
    }

    /// A short type label used in debug output.
    fn type_label(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// ============================================================================
// Record
// ============================================================================

/// A dynamic, observable property bag.
///
/// Writing an unknown key creates it. Change signals are created lazily per
/// key on first subscription and are emitted after the internal lock has been
/// released, so observers may freely read or write the record.
#[derive(Default)]
pub struct Record {
    values: RwLock<HashMap<String, Value>>,
    signals: Mutex<HashMap<String, Arc<Signal<Value>>>>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty shared record.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Builder-style initial value. Does not notify.
    pub fn with_value(self: Arc<Self>, key: impl Into<String>, value: impl Into<Value>) -> Arc<Self> {
        self.values.write().insert(key.into(), value.into());
        self
    }

    /// Read a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Write a value, notifying observers if it changed.
    ///
    /// Returns `true` if the stored value changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let changed = {
            let mut values = self.values.write();
            match values.get(key) {
                Some(current) if *current == value => false,
                _ => {
                    values.insert(key.to_string(), value.clone());
                    true
                }
            }
        };
        if changed {
            let signal = self.signals.lock().get(key).cloned();
            if let Some(signal) = signal {
                signal.emit(value);
            }
        }
        changed
    }

    /// Write a value without notifying observers.
    pub fn set_silent(&self, key: &str, value: impl Into<Value>) {
        self.values.write().insert(key.to_string(), value.into());
    }

    /// Returns `true` if the key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// The change signal for `key`, created on demand.
    pub fn signal(&self, key: &str) -> Arc<Signal<Value>> {
        self.signals
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Signal::new()))
            .clone()
    }

    /// Total number of observers attached to this record's keys.
    pub fn observer_count(&self) -> usize {
        self.signals
            .lock()
            .values()
            .map(|signal| signal.connection_count())
            .sum()
    }
}

impl KeyValueObject for Record {
    fn value_for_key(&self, key: &str) -> Option<Value> {
        self.get(key)
    }

    fn set_value_for_key(&self, key: &str, value: Value) -> Result<bool, KeyPathError> {
        Ok(self.set(key, value))
    }

    fn key_signal(&self, key: &str) -> Option<Arc<Signal<Value>>> {
        Some(self.signal(key))
    }

    fn type_label(&self) -> &'static str {
        "Record"
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("keys", &self.keys())
            .field("observers", &self.observer_count())
            .finish()
    }
}

// ============================================================================
// AccessorObject
// ============================================================================

type Getter<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&T, Value) -> Result<bool, KeyPathError> + Send + Sync>;

struct Accessor<T> {
    get: Getter<T>,
    set: Option<Setter<T>>,
    signal: Arc<Signal<Value>>,
}

/// Exposes fields of a typed value through registered accessor closures.
///
/// The wrapped type keeps its own typed fields (usually with interior
/// mutability); the accessor table maps key names to compile-time-checked
/// get/set functions. Writes made through the accessor notify observers
/// automatically. Writes made directly on the inner value must be announced
/// with [`notify_changed`](Self::notify_changed).
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_table_core::{AccessorObject, KeyValueObject, Property, Value};
///
/// struct Task {
///     title: Property<String>,
///     done: Property<bool>,
/// }
///
/// let task = AccessorObject::new(Task {
///     title: Property::new("Write report".into()),
///     done: Property::new(false),
/// })
/// .field_rw(
///     "title",
///     |t| Value::from(t.title.get()),
///     |t, v| Ok(v.into_string().map(|s| t.title.set(s)).unwrap_or(false)),
/// )
/// .field("done", |t| Value::from(t.done.get()))
/// .into_shared();
///
/// assert_eq!(task.value_for_key("title"), Some(Value::from("Write report")));
/// ```
pub struct AccessorObject<T> {
    inner: T,
    accessors: HashMap<String, Accessor<T>>,
}

impl<T: Send + Sync + 'static> AccessorObject<T> {
    /// Wrap a value with an empty accessor table.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            accessors: HashMap::new(),
        }
    }

    /// Register a read-only field.
    pub fn field<G>(mut self, key: impl Into<String>, get: G) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.accessors.insert(
            key.into(),
            Accessor {
                get: Arc::new(get),
                set: None,
                signal: Arc::new(Signal::new()),
            },
        );
        self
    }

    /// Register a read-write field.
    pub fn field_rw<G, S>(mut self, key: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&T, Value) -> Result<bool, KeyPathError> + Send + Sync + 'static,
    {
        self.accessors.insert(
            key.into(),
            Accessor {
                get: Arc::new(get),
                set: Some(Arc::new(set)),
                signal: Arc::new(Signal::new()),
            },
        );
        self
    }

    /// Finish building and share the object.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// The wrapped value.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Announce that `key` changed through a path other than the accessor.
    ///
    /// Returns `false` if no such field is registered.
    pub fn notify_changed(&self, key: &str) -> bool {
        match self.accessors.get(key) {
            Some(accessor) => {
                accessor.signal.emit((accessor.get)(&self.inner));
                true
            }
            None => false,
        }
    }
}

impl<T: Send + Sync + 'static> KeyValueObject for AccessorObject<T> {
    fn value_for_key(&self, key: &str) -> Option<Value> {
        self.accessors.get(key).map(|accessor| (accessor.get)(&self.inner))
    }

    fn set_value_for_key(&self, key: &str, value: Value) -> Result<bool, KeyPathError> {
        let accessor = self.accessors.get(key).ok_or_else(|| KeyPathError::Unresolved {
            path: key.to_string(),
            key: key.to_string(),
        })?;
        let setter = accessor.set.as_ref().ok_or_else(|| KeyPathError::ReadOnly {
            key: key.to_string(),
        })?;
        let changed = setter(&self.inner, value)?;
        if changed {
            accessor.signal.emit((accessor.get)(&self.inner));
        }
        Ok(changed)
    }

    fn key_signal(&self, key: &str) -> Option<Arc<Signal<Value>>> {
        self.accessors.get(key).map(|accessor| accessor.signal.clone())
    }

    fn type_label(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}
