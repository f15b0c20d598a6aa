//! Controller delegate.
//!
//! Every delegate callback is optional. A delegate announces which ones it
//! implements through [`TableDelegate::capabilities`]; the controller probes
//! that set before calling and falls back to the documented default when a
//! capability is absent.

use horizon_table_core::ObjectRef;

use crate::row::Row;

/// The optional callbacks a delegate implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelegateCapabilities {
    /// [`TableDelegate::is_row_visible`] decides delegate-mode visibility.
    /// Without it those rows use their `visible` flag.
    pub row_visibility: bool,
    /// [`TableDelegate::is_dynamic_row_visible`] filters dynamic rows.
    /// Without it every object is shown.
    pub dynamic_row_visibility: bool,
    /// [`TableDelegate::object_for_row`] supplies objects for delegate-mode
    /// rows. Without it those rows have no object.
    pub object_for_row: bool,
    /// [`TableDelegate::perform_action`] and
    /// [`TableDelegate::perform_accessory_action`] handle taps on rows
    /// without their own action.
    pub row_action: bool,
    /// [`TableDelegate::commit_insert`] and [`TableDelegate::commit_delete`]
    /// handle editing controls. Without it edits are ignored.
    pub insert_delete_action: bool,
    /// [`TableDelegate::value_source`] provides the object that owner
    /// keypaths and bound labels are resolved against.
    pub value_source: bool,
}

impl DelegateCapabilities {
    /// No capabilities.
    pub const NONE: Self = Self {
        row_visibility: false,
        dynamic_row_visibility: false,
        object_for_row: false,
        row_action: false,
        insert_delete_action: false,
        value_source: false,
    };

    /// Every capability.
    pub const ALL: Self = Self {
        row_visibility: true,
        dynamic_row_visibility: true,
        object_for_row: true,
        row_action: true,
        insert_delete_action: true,
        value_source: true,
    };
}

/// Callbacks a [`DataController`](crate::DataController) consults.
///
/// The controller holds its delegate weakly and never calls it while holding
/// internal locks, so callbacks may call back into the controller.
pub trait TableDelegate: Send + Sync {
    /// The callbacks this delegate implements.
    fn capabilities(&self) -> DelegateCapabilities {
        DelegateCapabilities::NONE
    }

    /// Whether a delegate-mode row is visible.
    fn is_row_visible(&self, _row: &Row) -> bool {
        true
    }

    /// Whether the dynamic row for `object` is visible.
    fn is_dynamic_row_visible(&self, _row: &Row, _object: &ObjectRef) -> bool {
        true
    }

    /// The object of a delegate-mode row.
    fn object_for_row(&self, _row: &Row) -> Option<ObjectRef> {
        None
    }

    /// A row without its own action was selected.
    fn perform_action(&self, _row: &Row) {}

    /// The accessory of a row without its own accessory action was tapped.
    fn perform_accessory_action(&self, _row: &Row) {}

    /// The insert control of a row was tapped.
    fn commit_insert(&self, _row: &Row) {}

    /// The delete control of a row was tapped.
    fn commit_delete(&self, _row: &Row) {}

    /// The object owner keypaths and bound labels resolve against.
    fn value_source(&self) -> Option<ObjectRef> {
        None
    }
}
