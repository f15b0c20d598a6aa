//! Change-detecting properties.
//!
//! Model types backing an [`AccessorObject`](crate::AccessorObject) keep
//! their fields in properties. `set` reports whether the stored value
//! actually changed, which is what stops a bidirectional binding from
//! ping-ponging: an echo of the current value is not a change, so nobody is
//! notified.
//!
//! - [`Property<T>`] - value plus change detection, notification is the
//!   caller's job
//! - [`ObservedProperty<T>`] - value plus its own change signal
//!
//! # Example
//!
//! ```
//! use horizon_table_core::ObservedProperty;
//!
//! let title = ObservedProperty::new(String::from("Draft"));
//! title.changed().connect(|t| println!("title is now {t}"));
//!
//! assert!(title.set("Final".into()));
//! assert!(!title.set("Final".into()));
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::signal::Signal;

/// A value with change detection.
///
/// `Property<T>` uses interior mutability with `RwLock` and is `Send + Sync`
/// whenever `T` is.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// A property holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// A clone of the value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Borrow the value for the duration of `f`.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value without change detection.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if it changed.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }

    /// Set the value, returning the previous one if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        if *current != value {
            Some(std::mem::replace(&mut *current, value))
        } else {
            None
        }
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property").field("value", &self.get()).finish()
    }
}

/// A property that owns its change signal.
///
/// The signal is emitted after the write lock is released, with the new
/// value, and only when the value changed.
pub struct ObservedProperty<T: 'static> {
    value: Property<T>,
    changed: Arc<Signal<T>>,
}

impl<T: Clone + PartialEq + Send + 'static> ObservedProperty<T> {
    /// Create a new observed property.
    pub fn new(value: T) -> Self {
        Self {
            value: Property::new(value),
            changed: Arc::new(Signal::new()),
        }
    }

    /// A clone of the value.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Set the value, emitting the change signal if it changed.
    pub fn set(&self, value: T) -> bool {
        let changed = self.value.set(value.clone());
        if changed {
            self.changed.emit(value);
        }
        changed
    }

    /// Set the value without notifying.
    pub fn set_silent(&self, value: T) {
        self.value.set_silent(value);
    }

    /// The change signal.
    pub fn changed(&self) -> &Arc<Signal<T>> {
        &self.changed
    }
}

impl<T: Clone + PartialEq + Send + Default + 'static> Default for ObservedProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for ObservedProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedProperty")
            .field("value", &self.value.get())
            .field("observers", &self.changed.connection_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(Property<String>: Send, Sync);
static_assertions::assert_impl_all!(ObservedProperty<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_property_set_reports_change() {
        let prop = Property::new(42);
        assert!(!prop.set(42));
        assert!(prop.set(100));
        assert_eq!(prop.get(), 100);
    }

    #[test]
    fn test_property_replace() {
        let prop = Property::new("a".to_string());
        assert_eq!(prop.replace("a".into()), None);
        assert_eq!(prop.replace("b".into()), Some("a".to_string()));
        assert_eq!(prop.with(|s| s.len()), 1);
    }

    #[test]
    fn test_observed_property_emits_only_on_change() {
        let prop = ObservedProperty::new(false);
        let received = Arc::new(Mutex::new(Vec::new()));
        let recv = received.clone();
        prop.changed().connect(move |&v| recv.lock().push(v));

        prop.set(false);
        prop.set(true);
        prop.set_silent(false);
        prop.set(false);

        assert_eq!(*received.lock(), vec![true]);
    }

    #[test]
    fn test_observed_property_slot_can_read_value() {
        let prop = Arc::new(ObservedProperty::new(1));
        let seen = Arc::new(Mutex::new(None));
        let weak = Arc::downgrade(&prop);
        let seen_clone = seen.clone();
        prop.changed().connect(move |_| {
            if let Some(prop) = weak.upgrade() {
                *seen_clone.lock() = Some(prop.get());
            }
        });
        prop.set(2);
        assert_eq!(*seen.lock(), Some(2));
    }
}
