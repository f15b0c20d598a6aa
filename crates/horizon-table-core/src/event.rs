//! Control events emitted by views.
//!
//! Model objects announce changes per key; views additionally announce user
//! interaction through a single event channel. Bindings subscribe to that
//! channel to carry edits back to the model.

/// An interaction event delivered on a view's event signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlEvent {
    /// The control's value changed (switch toggled, slider moved).
    ValueChanged,
    /// Text editing started.
    EditingDidBegin,
    /// Text editing finished.
    EditingDidEnd,
    /// Text changed during editing, delivered on the text notification channel.
    TextDidChange,
}

impl ControlEvent {
    /// Returns `true` for the editing begin/end pair.
    pub fn is_editing_event(self) -> bool {
        matches!(self, Self::EditingDidBegin | Self::EditingDidEnd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editing_events() {
        assert!(ControlEvent::EditingDidBegin.is_editing_event());
        assert!(ControlEvent::EditingDidEnd.is_editing_event());
        assert!(!ControlEvent::ValueChanged.is_editing_event());
        assert!(!ControlEvent::TextDidChange.is_editing_event());
    }
}
