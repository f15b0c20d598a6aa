//! Dynamically typed values carried across keypaths.
//!
//! Every keypath read or write moves a [`Value`]. The enum covers the scalar
//! types a table cell typically displays, dates, nested model objects (so
//! dotted keypaths can descend) and an escape hatch for arbitrary shared data.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::object::{KeyValueObject, ObjectRef};

/// Stable identity of a model object, derived from its allocation.
///
/// Two [`ObjectRef`]s have the same `ObjectId` exactly when they point at the
/// same object. The id is the allocation address, so it is only unique while
/// a strong or weak reference keeps that allocation in place. Anyone storing
/// ids across mutations must also hold such a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Identity of the object behind `object`.
    pub fn of(object: &ObjectRef) -> Self {
        Self(Arc::as_ptr(object) as *const () as usize)
    }

    /// Raw numeric form, for logging.
    pub fn as_raw(self) -> usize {
        self.0
    }
}

/// A dynamically typed value read from or written to a keypath.
#[derive(Clone, Default)]
pub enum Value {
    /// No value. Also the neutral value pushed when a keypath does not resolve.
    #[default]
    None,
    /// String data.
    String(String),
    /// Integer data.
    Int(i64),
    /// Floating point data.
    Float(f64),
    /// Boolean data.
    Bool(bool),
    /// A calendar date and time.
    Date(NaiveDateTime),
    /// A nested key-value object.
    Object(ObjectRef),
    /// Custom shared data, compared by identity.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap a model object.
    pub fn object<T: KeyValueObject + 'static>(object: Arc<T>) -> Self {
        Value::Object(object)
    }

    /// Wrap arbitrary shared data.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }

    /// Returns `true` if this is `Value::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Returns `true` if this contains some data.
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Attempts to get the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the value as an owned string.
    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a float. Integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to get the value as a date.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Attempts to get the value as a model object.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Identity of the wrapped model object, if any.
    pub fn object_id(&self) -> Option<ObjectId> {
        self.as_object().map(ObjectId::of)
    }

    /// Attempts to downcast custom data to the specified type.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(data) => data.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Plain-text rendering used for labels when no formatter is configured.
    ///
    /// `None` renders as the empty string; objects and custom data have no
    /// textual form and also render empty.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::None | Value::Object(_) | Value::Custom(_) => String::new(),
            Value::String(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Date(d) => d.to_string(),
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Object(_) => "object",
            Value::Custom(_) => "custom",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Date(d) => write!(f, "Date({d})"),
            Value::Object(o) => write!(f, "Object({:#x})", ObjectId::of(o).as_raw()),
            Value::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Record;
    use chrono::NaiveDate;

    #[test]
    fn test_value_string() {
        let value = Value::from("hello");
        assert_eq!(value.as_str(), Some("hello"));
        assert!(value.as_int().is_none());
        assert_eq!(value.kind(), "string");
    }

    #[test]
    fn test_value_float_widens_int() {
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Float(1.5).as_float(), Some(1.5));
    }

    #[test]
    fn test_object_values_compare_by_identity() {
        let a = Record::shared();
        let b = Record::shared();
        assert_eq!(Value::object(a.clone()), Value::object(a.clone()));
        assert_ne!(Value::object(a), Value::object(b));
    }

    #[test]
    fn test_display_string() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .expect("valid date");
        assert_eq!(Value::None.to_display_string(), "");
        assert_eq!(Value::Int(7).to_display_string(), "7");
        assert_eq!(Value::Bool(true).to_display_string(), "true");
        assert_eq!(Value::Date(date).to_display_string(), "2024-03-09 08:30:00");
    }

    #[test]
    fn test_custom_downcast() {
        #[derive(Debug, PartialEq)]
        struct Thumbnail(u32);

        let value = Value::custom(Thumbnail(42));
        assert_eq!(value.downcast::<Thumbnail>(), Some(&Thumbnail(42)));
        assert!(value.downcast::<u32>().is_none());
        assert_eq!(value.clone(), value);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(Some("x")), Value::from("x"));
        assert!(Value::from(None::<String>).is_none());
    }
}
