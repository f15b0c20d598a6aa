//! Value transformers and formatters.
//!
//! A binding can run the model value through a [`ValueTransformer`] and then
//! a [`Formatter`] before it reaches the view. Writing back reverses the
//! chain: the formatter parses the view's text, then the transformer's
//! inverse (or the transformer itself, when the binding asks for it in
//! reverse) produces the model value.
//!
//! Transformers can be registered by name in a process-wide registry and
//! referenced from binding options. The built-in names are
//! [`NEGATE_BOOLEAN`], [`IS_NONE`] and [`IS_SOME`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{NaiveDate, NaiveDateTime};
use horizon_table_core::logging::targets;
use horizon_table_core::Value;
use parking_lot::RwLock;

/// Registry name of [`NegateBoolean`].
pub const NEGATE_BOOLEAN: &str = "negate_boolean";
/// Registry name of the transformer mapping "no value" to `true`.
pub const IS_NONE: &str = "is_none";
/// Registry name of the transformer mapping "some value" to `true`.
pub const IS_SOME: &str = "is_some";

/// Converts values on their way from model to view.
pub trait ValueTransformer: Send + Sync {
    /// Model to view.
    fn transform(&self, value: &Value) -> Value;

    /// View to model. `None` if the transformer has no inverse.
    fn reverse_transform(&self, _value: &Value) -> Option<Value> {
        None
    }
}

/// Converts values to display text and parses text back.
pub trait Formatter: Send + Sync {
    /// Render a value for display.
    fn format(&self, value: &Value) -> String;

    /// Parse display text. `None` if the text is not valid.
    fn parse(&self, text: &str) -> Option<Value>;
}

/// Logical negation. Its own inverse.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegateBoolean;

impl ValueTransformer for NegateBoolean {
    fn transform(&self, value: &Value) -> Value {
        match value {
            Value::Bool(b) => Value::Bool(!b),
            Value::None => Value::Bool(true),
            other => other.clone(),
        }
    }

    fn reverse_transform(&self, value: &Value) -> Option<Value> {
        Some(self.transform(value))
    }
}

type TransformFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// A transformer built from closures.
#[derive(Clone)]
pub struct FnTransformer {
    forward: TransformFn,
    reverse: Option<TransformFn>,
}

impl FnTransformer {
    /// A one-way transformer.
    pub fn new<F>(forward: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            forward: Arc::new(forward),
            reverse: None,
        }
    }

    /// Add an inverse.
    pub fn with_reverse<F>(mut self, reverse: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.reverse = Some(Arc::new(reverse));
        self
    }
}

impl ValueTransformer for FnTransformer {
    fn transform(&self, value: &Value) -> Value {
        (self.forward)(value)
    }

    fn reverse_transform(&self, value: &Value) -> Option<Value> {
        self.reverse.as_ref().map(|reverse| reverse(value))
    }
}

impl fmt::Debug for FnTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransformer")
            .field("reversible", &self.reverse.is_some())
            .finish()
    }
}

/// Formats dates with a `chrono` format string.
///
/// Parsing accepts the same format, either as a full date-time or as a bare
/// date (midnight).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormatter {
    format: String,
}

impl DateFormatter {
    /// Create a formatter for `format`.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// The format string.
    pub fn format_string(&self) -> &str {
        &self.format
    }

    /// Render a date.
    pub fn format_date(&self, date: &NaiveDateTime) -> String {
        date.format(&self.format).to_string()
    }

    /// Parse a date.
    pub fn parse_date(&self, text: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(text, &self.format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, &self.format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }
}

impl Formatter for DateFormatter {
    fn format(&self, value: &Value) -> String {
        match value {
            Value::Date(date) => self.format_date(date),
            other => other.to_display_string(),
        }
    }

    fn parse(&self, text: &str) -> Option<Value> {
        if text.is_empty() {
            return Some(Value::None);
        }
        self.parse_date(text).map(Value::Date)
    }
}

/// Formats numbers with a fixed number of decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumberFormatter {
    decimal_places: usize,
}

impl NumberFormatter {
    /// Create a formatter. Zero decimal places formats and parses integers.
    pub fn new(decimal_places: usize) -> Self {
        Self { decimal_places }
    }
}

impl Formatter for NumberFormatter {
    fn format(&self, value: &Value) -> String {
        match value {
            Value::Int(n) if self.decimal_places == 0 => n.to_string(),
            Value::Int(_) | Value::Float(_) => {
                let n = value.as_float().unwrap_or_default();
                format!("{:.*}", self.decimal_places, n)
            }
            other => other.to_display_string(),
        }
    }

    fn parse(&self, text: &str) -> Option<Value> {
        let text = text.trim();
        if text.is_empty() {
            return Some(Value::None);
        }
        if self.decimal_places == 0 {
            text.parse::<i64>().ok().map(Value::Int)
        } else {
            text.parse::<f64>().ok().map(Value::Float)
        }
    }
}

fn registry() -> &'static RwLock<HashMap<String, Arc<dyn ValueTransformer>>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Arc<dyn ValueTransformer>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut builtins: HashMap<String, Arc<dyn ValueTransformer>> = HashMap::new();
        builtins.insert(NEGATE_BOOLEAN.to_string(), Arc::new(NegateBoolean));
        builtins.insert(
            IS_NONE.to_string(),
            Arc::new(FnTransformer::new(|v| Value::Bool(v.is_none()))),
        );
        builtins.insert(
            IS_SOME.to_string(),
            Arc::new(FnTransformer::new(|v| Value::Bool(v.is_some()))),
        );
        RwLock::new(builtins)
    })
}

/// Register a transformer under `name`, replacing any previous one.
pub fn register_transformer(name: impl Into<String>, transformer: Arc<dyn ValueTransformer>) {
    let name = name.into();
    tracing::debug!(target: targets::BINDING, name = %name, "value transformer registered");
    registry().write().insert(name, transformer);
}

/// Look up a registered transformer.
pub fn transformer_named(name: &str) -> Option<Arc<dyn ValueTransformer>> {
    registry().read().get(name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_negate_boolean_is_its_own_inverse() {
        let t = NegateBoolean;
        assert_eq!(t.transform(&Value::Bool(true)), Value::Bool(false));
        assert_eq!(t.reverse_transform(&Value::Bool(false)), Some(Value::Bool(true)));
    }

    #[test]
    fn test_fn_transformer_reverse_is_optional() {
        let double = FnTransformer::new(|v| Value::Int(v.as_int().unwrap_or(0) * 2));
        assert_eq!(double.transform(&Value::Int(4)), Value::Int(8));
        assert_eq!(double.reverse_transform(&Value::Int(8)), None);

        let double = double.with_reverse(|v| Value::Int(v.as_int().unwrap_or(0) / 2));
        assert_eq!(double.reverse_transform(&Value::Int(8)), Some(Value::Int(4)));
    }

    #[test]
    fn test_date_formatter_round_trip() {
        let formatter = DateFormatter::new("%-d %b %Y");
        let value = Value::Date(date(2024, 3, 9));
        let text = formatter.format(&value);
        assert_eq!(text, "9 Mar 2024");
        assert_eq!(formatter.parse(&text), Some(value));
        assert_eq!(formatter.parse("not a date"), None);
        assert_eq!(formatter.parse(""), Some(Value::None));
    }

    #[test]
    fn test_number_formatter() {
        let money = NumberFormatter::new(2);
        assert_eq!(money.format(&Value::Int(3)), "3.00");
        assert_eq!(money.format(&Value::Float(2.5)), "2.50");
        assert_eq!(money.parse(" 1.25 "), Some(Value::Float(1.25)));

        let count = NumberFormatter::new(0);
        assert_eq!(count.format(&Value::Int(12)), "12");
        assert_eq!(count.parse("12"), Some(Value::Int(12)));
        assert_eq!(count.parse("twelve"), None);
    }

    #[test]
    fn test_registry_builtins_and_custom() {
        let negate = transformer_named(NEGATE_BOOLEAN).unwrap();
        assert_eq!(negate.transform(&Value::Bool(false)), Value::Bool(true));
        assert_eq!(
            transformer_named(IS_NONE).unwrap().transform(&Value::None),
            Value::Bool(true)
        );

        register_transformer(
            "format_test_upper",
            Arc::new(FnTransformer::new(|v| {
                Value::from(v.as_str().unwrap_or_default().to_uppercase())
            })),
        );
        let upper = transformer_named("format_test_upper").unwrap();
        assert_eq!(upper.transform(&Value::from("abc")), Value::from("ABC"));
        assert!(transformer_named("format_test_missing").is_none());
    }
}
