//! Dotted keypaths over key-value objects.
//!
//! A [`KeyPath`] such as `owner.address.city` names a value reached by
//! walking nested objects. Parsing validates syntax up front so a malformed
//! path is reported when a binding is declared, not each time it is used.
//! Resolution failures at use time (a missing key, a `None` in the middle
//! of the chain) are ordinary [`KeyPathError`]s the caller can treat as "no
//! value".
//!
//! [`KeyPath::observe`] watches every link of the chain: replacing an
//! intermediate object re-targets the observation at the new object.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{KeyPathError, Result};
use crate::logging::targets;
use crate::object::ObjectRef;
use crate::signal::Subscription;
use crate::value::Value;

/// A validated, dot-separated keypath.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    path: String,
    components: Vec<String>,
}

impl KeyPath {
    /// Parse and validate a keypath.
    ///
    /// Each component must be a non-empty identifier: ASCII letters, digits
    /// and underscores, not starting with a digit.
    pub fn parse(path: &str) -> Result<Self> {
        let malformed = |reason| KeyPathError::Malformed {
            path: path.to_string(),
            reason,
        };

        if path.is_empty() {
            return Err(malformed("empty keypath"));
        }

        let mut components = Vec::new();
        for component in path.split('.') {
            let mut chars = component.chars();
            match chars.next() {
                None => return Err(malformed("empty component")),
                Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
                    return Err(malformed("component must start with a letter or underscore"));
                }
                Some(_) => {}
            }
            if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(malformed("invalid character in component"));
            }
            components.push(component.to_string());
        }

        Ok(Self {
            path: path.to_string(),
            components,
        })
    }

    /// The keypath text.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The individual keys.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The final key.
    pub fn last_key(&self) -> &str {
        // parse() guarantees at least one component
        self.components.last().map(String::as_str).unwrap_or_default()
    }

    /// Returns `true` for a single-key path.
    pub fn is_single_key(&self) -> bool {
        self.components.len() == 1
    }

    /// Walk all but the last component, returning the object that owns the
    /// final key.
    pub fn resolve_owner(&self, root: &ObjectRef) -> Result<ObjectRef> {
        let mut current = root.clone();
        let (_, intermediate) = self.components.split_last().ok_or_else(|| KeyPathError::Malformed {
            path: self.path.clone(),
            reason: "empty keypath",
        })?;
        for key in intermediate {
            let value = current
                .value_for_key(key)
                .ok_or_else(|| self.unresolved(key))?;
            current = match value {
                Value::Object(object) => object,
                Value::None => return Err(self.unresolved(key)),
                other => {
                    return Err(KeyPathError::NotAnObject {
                        path: self.path.clone(),
                        key: key.clone(),
                        kind: other.kind(),
                    });
                }
            };
        }
        Ok(current)
    }

    /// Read the value at this keypath.
    pub fn get(&self, root: &ObjectRef) -> Result<Value> {
        let owner = self.resolve_owner(root)?;
        owner
            .value_for_key(self.last_key())
            .ok_or_else(|| self.unresolved(self.last_key()))
    }

    /// Write a value at this keypath. Returns `true` if the value changed.
    pub fn set(&self, root: &ObjectRef, value: Value) -> Result<bool> {
        let owner = self.resolve_owner(root)?;
        owner.set_value_for_key(self.last_key(), value)
    }

    /// Observe the value at this keypath.
    ///
    /// `slot` receives the new value whenever the final key changes, and
    /// the freshly resolved value (or `Value::None`) whenever an intermediate
    /// object is replaced. Links that cannot be observed are skipped.
    /// Dropping the returned [`Observation`] removes every registration.
    pub fn observe<F>(&self, root: &ObjectRef, slot: F) -> Observation
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let inner = Arc::new(ObservationInner {
            path: self.clone(),
            root: Arc::downgrade(root),
            slot: Box::new(slot),
            subscriptions: Mutex::new(Vec::new()),
        });
        ObservationInner::arm(&inner);
        Observation { inner }
    }

    fn unresolved(&self, key: &str) -> KeyPathError {
        KeyPathError::Unresolved {
            path: self.path.clone(),
            key: key.to_string(),
        }
    }
}

impl FromStr for KeyPath {
    type Err = KeyPathError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Debug for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPath({})", self.path)
    }
}

struct ObservationInner {
    path: KeyPath,
    root: Weak<dyn crate::object::KeyValueObject>,
    slot: Box<dyn Fn(&Value) + Send + Sync>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl ObservationInner {
    /// (Re)subscribe along the current chain.
    fn arm(this: &Arc<Self>) {
        let Some(root) = this.root.upgrade() else {
            let stale = std::mem::take(&mut *this.subscriptions.lock());
            drop(stale);
            return;
        };

        let mut fresh = Vec::new();
        let mut current = Some(root);
        let last = this.path.components.len() - 1;

        for (index, key) in this.path.components.iter().enumerate() {
            let Some(object) = current.take() else { break };

            if let Some(signal) = object.key_signal(key) {
                let weak = Arc::downgrade(this);
                let subscription = if index == last {
                    signal.subscribe(move |value| {
                        if let Some(inner) = weak.upgrade() {
                            (inner.slot)(value);
                        }
                    })
                } else {
                    signal.subscribe(move |_| {
                        if let Some(inner) = weak.upgrade() {
                            Self::arm(&inner);
                            inner.push_current();
                        }
                    })
                };
                fresh.push(subscription);
            } else {
                tracing::trace!(
                    target: targets::KEYPATH,
                    path = %this.path,
                    key = %key,
                    "key is not observable"
                );
            }

            if index < last {
                current = object.value_for_key(key).and_then(|v| match v {
                    Value::Object(o) => Some(o),
                    _ => None,
                });
            }
        }

        let stale = std::mem::replace(&mut *this.subscriptions.lock(), fresh);
        drop(stale);
    }

    fn push_current(&self) {
        let value = match self.root.upgrade() {
            Some(root) => self.path.get(&root).unwrap_or_else(|err| {
                tracing::debug!(target: targets::KEYPATH, error = %err, "keypath no longer resolves");
                Value::None
            }),
            None => Value::None,
        };
        (self.slot)(&value);
    }
}

/// Live observation of a keypath. Dropping it unsubscribes.
#[must_use = "dropping an Observation stops observing immediately"]
pub struct Observation {
    inner: Arc<ObservationInner>,
}

impl Observation {
    /// Number of signal connections currently held along the chain.
    pub fn subscription_count(&self) -> usize {
        self.inner
            .subscriptions
            .lock()
            .iter()
            .filter(|s| s.is_active())
            .count()
    }

    /// The observed keypath.
    pub fn key_path(&self) -> &KeyPath {
        &self.inner.path
    }

    /// Remove every registration now.
    pub fn cancel(&self) {
        let stale = std::mem::take(&mut *self.inner.subscriptions.lock());
        drop(stale);
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("path", &self.inner.path)
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Record;

    fn person() -> (Arc<Record>, Arc<Record>) {
        let address = Record::shared().with_value("city", "Oslo");
        let person = Record::shared()
            .with_value("name", "Ada")
            .with_value("address", Value::object(address.clone()));
        (person, address)
    }

    #[test]
    fn test_parse_valid() {
        let path = KeyPath::parse("address.city").unwrap();
        assert_eq!(path.components(), &["address", "city"]);
        assert_eq!(path.last_key(), "city");
        assert!(!path.is_single_key());
        assert!(KeyPath::parse("_private9").unwrap().is_single_key());
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["", "a..b", ".a", "a.", "1abc", "a.b-c", "a b"] {
            let err = KeyPath::parse(bad).unwrap_err();
            assert!(err.is_malformed(), "{bad:?} should be malformed");
        }
    }

    #[test]
    fn test_get_and_set_nested() {
        let (person, address) = person();
        let root: ObjectRef = person;
        let path: KeyPath = "address.city".parse().unwrap();

        assert_eq!(path.get(&root), Ok(Value::from("Oslo")));
        assert_eq!(path.set(&root, "Bergen".into()), Ok(true));
        assert_eq!(address.get("city"), Some(Value::from("Bergen")));
    }

    #[test]
    fn test_unresolved_components() {
        let (person, _) = person();
        let root: ObjectRef = person;

        let err = KeyPath::parse("missing.city").unwrap().get(&root).unwrap_err();
        assert_eq!(
            err,
            KeyPathError::Unresolved {
                path: "missing.city".into(),
                key: "missing".into()
            }
        );

        let err = KeyPath::parse("name.length").unwrap().get(&root).unwrap_err();
        assert!(matches!(err, KeyPathError::NotAnObject { kind: "string", .. }));
    }

    #[test]
    fn test_observe_final_key() {
        let (person, address) = person();
        let root: ObjectRef = person;
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        let observation = KeyPath::parse("address.city")
            .unwrap()
            .observe(&root, move |v| seen_clone.lock().push(v.clone()));
        assert_eq!(observation.subscription_count(), 2);

        address.set("city", "Tromsø");
        assert_eq!(*seen.lock(), vec![Value::from("Tromsø")]);
    }

    #[test]
    fn test_observe_retargets_on_intermediate_change() {
        let (person, old_address) = person();
        let root: ObjectRef = person.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        let _observation = KeyPath::parse("address.city")
            .unwrap()
            .observe(&root, move |v| seen_clone.lock().push(v.clone()));

        let new_address = Record::shared().with_value("city", "Paris");
        person.set("address", Value::object(new_address.clone()));
        old_address.set("city", "Stale");
        new_address.set("city", "Lyon");

        assert_eq!(
            *seen.lock(),
            vec![Value::from("Paris"), Value::from("Lyon")]
        );
        assert_eq!(old_address.observer_count(), 0);
    }

    #[test]
    fn test_observation_drop_removes_observers() {
        let (person, address) = person();
        let root: ObjectRef = person.clone();
        let observation = KeyPath::parse("address.city").unwrap().observe(&root, |_| {});
        assert_eq!(person.observer_count() + address.observer_count(), 2);
        drop(observation);
        assert_eq!(person.observer_count() + address.observer_count(), 0);
    }
}
