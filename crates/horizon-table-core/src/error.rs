//! Error types for Horizon Table core.

/// Result type alias for keypath operations.
pub type Result<T> = std::result::Result<T, KeyPathError>;

/// Errors raised while parsing or resolving a keypath.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyPathError {
    /// The keypath text is not a dot-separated list of identifiers.
    #[error("Malformed keypath '{path}': {reason}")]
    Malformed {
        /// The offending keypath text.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A component of the keypath does not exist on the object it was
    /// looked up on.
    #[error("Key '{key}' of keypath '{path}' does not resolve")]
    Unresolved {
        /// The full keypath.
        path: String,
        /// The component that failed.
        key: String,
    },

    /// An intermediate component resolved to something that is not an object.
    #[error("Key '{key}' of keypath '{path}' is a {kind}, not an object")]
    NotAnObject {
        /// The full keypath.
        path: String,
        /// The component that failed.
        key: String,
        /// The kind of value found instead.
        kind: &'static str,
    },

    /// The final key exists but cannot be written.
    #[error("Key '{key}' is read-only")]
    ReadOnly {
        /// The read-only key.
        key: String,
    },

    /// The final key rejected the value that was written.
    #[error("Key '{key}' cannot hold a {kind} value")]
    TypeMismatch {
        /// The key being written.
        key: String,
        /// The kind of value that was rejected.
        kind: &'static str,
    },

    /// The object behind a weak reference is gone.
    #[error("Object has been dropped")]
    ObjectDropped,
}

impl KeyPathError {
    /// Returns `true` for syntax errors, which are programmer errors rather
    /// than transient resolution failures.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}
