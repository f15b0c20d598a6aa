//! Error types for the table binding layer.

use horizon_table_core::KeyPathError;

/// Result type alias for binding operations.
pub type Result<T> = std::result::Result<T, BindingError>;

/// Errors raised while declaring or materializing a binding.
///
/// These are configuration problems scoped to a single binding. They are
/// logged and returned; the offending binding is simply not created and the
/// rest of the table is unaffected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    /// A source or target keypath is malformed.
    #[error(transparent)]
    KeyPath(#[from] KeyPathError),

    /// An option name is not recognized.
    #[error("Unknown binding option '{0}'")]
    UnknownOption(String),

    /// An option was given a value of the wrong kind.
    #[error("Binding option '{option}' expects {expected}")]
    InvalidOptionValue {
        /// The option name.
        option: String,
        /// What the option accepts.
        expected: &'static str,
    },

    /// A named value transformer is not registered.
    #[error("No value transformer registered under '{0}'")]
    MissingTransformer(String),

    /// A prototype binding was asked to do something only a live binding can.
    #[error("Binding for '{0}' is a prototype and cannot be attached to a cell")]
    Prototype(String),

    /// The binding's cell has been recycled or dropped.
    #[error("Binding has no live cell")]
    NoLiveCell,

    /// The row has no object to read or write.
    #[error("Row has no object")]
    NoRowObject,

    /// No edit of the requested kind is in progress.
    #[error("No {0} edit in progress")]
    NotEditing(&'static str),
}

impl BindingError {
    /// Create an invalid option value error.
    pub fn invalid_option_value(option: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidOptionValue {
            option: option.into(),
            expected,
        }
    }
}

/// Errors raised while loading a [`TableConfig`](crate::TableConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML text could not be parsed or did not match the schema.
    #[error("Invalid table configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypath_error_is_transparent() {
        let err: BindingError = KeyPathError::Malformed {
            path: "a..b".into(),
            reason: "empty component",
        }
        .into();
        assert_eq!(err.to_string(), "Malformed keypath 'a..b': empty component");
    }

    #[test]
    fn test_option_errors_display() {
        assert_eq!(
            BindingError::UnknownOption("register-for-taps".into()).to_string(),
            "Unknown binding option 'register-for-taps'"
        );
        assert_eq!(
            BindingError::invalid_option_value("formatter", "a formatter").to_string(),
            "Binding option 'formatter' expects a formatter"
        );
    }
}
