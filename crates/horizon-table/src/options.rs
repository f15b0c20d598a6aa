//! Binding options.
//!
//! Options can be set with the typed `with_*` builder or parsed from
//! `(name, value)` entries using the option names below. An unknown name or a
//! value of the wrong kind is a configuration error: it is logged and the
//! binding being declared is not created.
//!
//! | Name | Value |
//! |---|---|
//! | `register-for-value-changed` | flag |
//! | `register-for-editing-events` | flag |
//! | `register-for-text-notifications` | flag |
//! | `value-transformer` | transformer, or a registered transformer name |
//! | `use-value-transformer-in-reverse` | flag |
//! | `formatter` | formatter |
//! | `cell-needs-layout-on-update` | flag |

use std::fmt;
use std::sync::Arc;

use horizon_table_core::logging::targets;
use horizon_table_core::ControlEvent;

use crate::error::{BindingError, Result};
use crate::format::{transformer_named, Formatter, ValueTransformer};

/// A recognized binding option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingOption {
    /// Write back on the target's value-changed events.
    RegisterForValueChanged,
    /// Write back on the target's editing begin/end events.
    RegisterForEditingEvents,
    /// Write back on the target's text-change notifications.
    RegisterForTextNotifications,
    /// Transform model values before display.
    ValueTransformer,
    /// Apply the transformer itself, not its inverse, when writing back.
    UseValueTransformerInReverse,
    /// Format for display and parse when writing back.
    Formatter,
    /// Request a layout pass on the cell after every push.
    CellNeedsLayoutOnUpdate,
}

impl BindingOption {
    /// All options in declaration order.
    pub const ALL: [BindingOption; 7] = [
        Self::RegisterForValueChanged,
        Self::RegisterForEditingEvents,
        Self::RegisterForTextNotifications,
        Self::ValueTransformer,
        Self::UseValueTransformerInReverse,
        Self::Formatter,
        Self::CellNeedsLayoutOnUpdate,
    ];

    /// The option's name.
    pub fn name(self) -> &'static str {
        match self {
            Self::RegisterForValueChanged => "register-for-value-changed",
            Self::RegisterForEditingEvents => "register-for-editing-events",
            Self::RegisterForTextNotifications => "register-for-text-notifications",
            Self::ValueTransformer => "value-transformer",
            Self::UseValueTransformerInReverse => "use-value-transformer-in-reverse",
            Self::Formatter => "formatter",
            Self::CellNeedsLayoutOnUpdate => "cell-needs-layout-on-update",
        }
    }

    /// Look up an option by name.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|option| option.name() == name)
            .ok_or_else(|| BindingError::UnknownOption(name.to_string()))
    }
}

impl fmt::Display for BindingOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value attached to a named option entry.
#[derive(Clone)]
pub enum OptionValue {
    /// On/off.
    Flag(bool),
    /// A registry name.
    Name(String),
    /// A transformer instance.
    Transformer(Arc<dyn ValueTransformer>),
    /// A formatter instance.
    Formatter(Arc<dyn Formatter>),
}

impl From<bool> for OptionValue {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<&str> for OptionValue {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// The full option set of a binding.
#[derive(Clone, Default)]
pub struct BindingOptions {
    /// Write back on value-changed events.
    pub register_for_value_changed: bool,
    /// Write back on editing begin/end events.
    pub register_for_editing_events: bool,
    /// Write back on text-change notifications.
    pub register_for_text_notifications: bool,
    /// Transformer applied model to view.
    pub value_transformer: Option<Arc<dyn ValueTransformer>>,
    /// Apply the transformer itself when writing back.
    pub use_value_transformer_in_reverse: bool,
    /// Formatter for display and parsing.
    pub formatter: Option<Arc<dyn Formatter>>,
    /// Request a cell layout pass after every push.
    pub cell_needs_layout_on_update: bool,
}

impl BindingOptions {
    /// No options: a one-way, unformatted binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse named entries.
    pub fn from_entries<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, OptionValue)>,
        K: AsRef<str>,
    {
        let mut options = Self::default();
        for (name, value) in entries {
            let result = BindingOption::from_name(name.as_ref())
                .and_then(|option| options.apply(option, value));
            if let Err(err) = result {
                tracing::warn!(target: targets::BINDING, error = %err, "rejecting binding options");
                return Err(err);
            }
        }
        Ok(options)
    }

    fn apply(&mut self, option: BindingOption, value: OptionValue) -> Result<()> {
        let flag = |value: &OptionValue| match value {
            OptionValue::Flag(flag) => Ok(*flag),
            _ => Err(BindingError::invalid_option_value(option.name(), "a flag")),
        };
        match option {
            BindingOption::RegisterForValueChanged => self.register_for_value_changed = flag(&value)?,
            BindingOption::RegisterForEditingEvents => {
                self.register_for_editing_events = flag(&value)?
            }
            BindingOption::RegisterForTextNotifications => {
                self.register_for_text_notifications = flag(&value)?
            }
            BindingOption::UseValueTransformerInReverse => {
                self.use_value_transformer_in_reverse = flag(&value)?
            }
            BindingOption::CellNeedsLayoutOnUpdate => {
                self.cell_needs_layout_on_update = flag(&value)?
            }
            BindingOption::ValueTransformer => {
                self.value_transformer = Some(match value {
                    OptionValue::Transformer(transformer) => transformer,
                    OptionValue::Name(name) => {
                        transformer_named(&name).ok_or(BindingError::MissingTransformer(name))?
                    }
                    _ => {
                        return Err(BindingError::invalid_option_value(
                            option.name(),
                            "a transformer or transformer name",
                        ));
                    }
                });
            }
            BindingOption::Formatter => match value {
                OptionValue::Formatter(formatter) => self.formatter = Some(formatter),
                _ => return Err(BindingError::invalid_option_value(option.name(), "a formatter")),
            },
        }
        Ok(())
    }

    /// Write back on value-changed events.
    pub fn with_value_changed(mut self) -> Self {
        self.register_for_value_changed = true;
        self
    }

    /// Write back on editing begin/end events.
    pub fn with_editing_events(mut self) -> Self {
        self.register_for_editing_events = true;
        self
    }

    /// Write back on text-change notifications.
    pub fn with_text_notifications(mut self) -> Self {
        self.register_for_text_notifications = true;
        self
    }

    /// Set the value transformer.
    pub fn with_transformer(mut self, transformer: Arc<dyn ValueTransformer>) -> Self {
        self.value_transformer = Some(transformer);
        self
    }

    /// Set a registered value transformer by name.
    pub fn with_transformer_named(mut self, name: &str) -> Result<Self> {
        let transformer = transformer_named(name)
            .ok_or_else(|| BindingError::MissingTransformer(name.to_string()))?;
        self.value_transformer = Some(transformer);
        Ok(self)
    }

    /// Apply the transformer itself when writing back.
    pub fn with_transformer_in_reverse(mut self) -> Self {
        self.use_value_transformer_in_reverse = true;
        self
    }

    /// Set the formatter.
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Request a cell layout pass after every push.
    pub fn with_cell_needs_layout(mut self) -> Self {
        self.cell_needs_layout_on_update = true;
        self
    }

    /// Returns `true` if any write-back channel is enabled.
    pub fn is_bidirectional(&self) -> bool {
        self.register_for_value_changed
            || self.register_for_editing_events
            || self.register_for_text_notifications
    }

    /// Returns `true` if `event` should trigger a write-back.
    pub fn writes_back_on(&self, event: ControlEvent) -> bool {
        match event {
            ControlEvent::ValueChanged => self.register_for_value_changed,
            ControlEvent::EditingDidBegin | ControlEvent::EditingDidEnd => {
                self.register_for_editing_events
            }
            ControlEvent::TextDidChange => self.register_for_text_notifications,
        }
    }
}

impl fmt::Debug for BindingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingOptions")
            .field("register_for_value_changed", &self.register_for_value_changed)
            .field("register_for_editing_events", &self.register_for_editing_events)
            .field(
                "register_for_text_notifications",
                &self.register_for_text_notifications,
            )
            .field("value_transformer", &self.value_transformer.is_some())
            .field(
                "use_value_transformer_in_reverse",
                &self.use_value_transformer_in_reverse,
            )
            .field("formatter", &self.formatter.is_some())
            .field("cell_needs_layout_on_update", &self.cell_needs_layout_on_update)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{NumberFormatter, NEGATE_BOOLEAN};
    use horizon_table_core::Value;

    #[test]
    fn test_option_names_round_trip() {
        for option in BindingOption::ALL {
            assert_eq!(BindingOption::from_name(option.name()), Ok(option));
        }
        assert_eq!(
            BindingOption::from_name("register-for-taps"),
            Err(BindingError::UnknownOption("register-for-taps".into()))
        );
    }

    #[test]
    fn test_from_entries() {
        let options = BindingOptions::from_entries([
            ("register-for-value-changed", OptionValue::from(true)),
            ("value-transformer", OptionValue::from(NEGATE_BOOLEAN)),
            (
                "formatter",
                OptionValue::Formatter(Arc::new(NumberFormatter::new(0))),
            ),
        ])
        .unwrap();

        assert!(options.register_for_value_changed);
        assert!(options.is_bidirectional());
        assert!(options.formatter.is_some());
        let transformer = options.value_transformer.unwrap();
        assert_eq!(transformer.transform(&Value::Bool(true)), Value::Bool(false));
    }

    #[test]
    fn test_from_entries_rejects_bad_input() {
        let err = BindingOptions::from_entries([("bogus", OptionValue::from(true))]).err();
        assert_eq!(err, Some(BindingError::UnknownOption("bogus".into())));

        let err = BindingOptions::from_entries([("formatter", OptionValue::from(true))]).err();
        assert!(matches!(err, Some(BindingError::InvalidOptionValue { .. })));

        let err =
            BindingOptions::from_entries([("value-transformer", OptionValue::from("nope"))]).err();
        assert_eq!(err, Some(BindingError::MissingTransformer("nope".into())));
    }

    #[test]
    fn test_writes_back_on() {
        let options = BindingOptions::new().with_editing_events();
        assert!(options.writes_back_on(ControlEvent::EditingDidEnd));
        assert!(options.writes_back_on(ControlEvent::EditingDidBegin));
        assert!(!options.writes_back_on(ControlEvent::ValueChanged));
        assert!(!options.writes_back_on(ControlEvent::TextDidChange));
    }
}
