//! Headless views and table cells.
//!
//! The binding layer never renders anything. A [`View`] is an observable
//! property bag with a tag, a control event channel and child views; a
//! [`Cell`] is the root view of one table row plus its standard labels.
//! A host widget toolkit maps these onto real controls; tests drive them
//! directly.
//!
//! Standard cell layout, reachable by keypath from the cell root:
//!
//! | Keypath | View |
//! |---|---|
//! | `text_label.text` | main label |
//! | `detail_text_label.text` | detail label |
//! | `image_view.image` | image |

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use horizon_table_core::{ControlEvent, KeyPathError, KeyValueObject, Record, Signal, Value};
use parking_lot::{Mutex, RwLock};

use crate::row::Row;

/// Key of the main text label on a cell root.
pub const TEXT_LABEL: &str = "text_label";
/// Key of the detail text label on a cell root.
pub const DETAIL_TEXT_LABEL: &str = "detail_text_label";
/// Key of the image view on a cell root.
pub const IMAGE_VIEW: &str = "image_view";

/// An observable view.
///
/// Properties are read and written through [`KeyValueObject`]; nested views
/// stored as object values make dotted keypaths such as `text_label.text`
/// resolve.
pub struct View {
    tag: i64,
    properties: Record,
    events: Arc<Signal<ControlEvent>>,
    subviews: RwLock<Vec<Arc<View>>>,
    layout_passes: AtomicUsize,
}

impl View {
    /// Create a view with the given tag. Tag 0 means untagged.
    pub fn new(tag: i64) -> Self {
        Self {
            tag,
            properties: Record::new(),
            events: Arc::new(Signal::new()),
            subviews: RwLock::new(Vec::new()),
            layout_passes: AtomicUsize::new(0),
        }
    }

    /// Create a shared view.
    pub fn shared(tag: i64) -> Arc<Self> {
        Arc::new(Self::new(tag))
    }

    /// Builder-style initial property. Does not notify.
    pub fn with_value(self: Arc<Self>, key: &str, value: impl Into<Value>) -> Arc<Self> {
        self.properties.set_silent(key, value);
        self
    }

    /// The view's tag.
    pub fn tag(&self) -> i64 {
        self.tag
    }

    /// Read a property.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.properties.get(key)
    }

    /// Write a property programmatically. Returns `true` if it changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        self.properties.set(key, value)
    }

    /// The control event channel.
    pub fn events(&self) -> &Arc<Signal<ControlEvent>> {
        &self.events
    }

    /// Deliver a control event.
    pub fn send_event(&self, event: ControlEvent) {
        self.events.emit(event);
    }

    /// Simulate a user edit: write the property, then announce `event`.
    pub fn user_edit(&self, key: &str, value: impl Into<Value>, event: ControlEvent) {
        self.properties.set(key, value);
        self.send_event(event);
    }

    /// Add a child view.
    pub fn add_subview(&self, view: Arc<View>) {
        self.subviews.write().push(view);
    }

    /// Add a child view reachable by key as well as by tag.
    pub fn add_named_subview(&self, key: &str, view: Arc<View>) {
        self.properties.set_silent(key, Value::Object(view.clone()));
        self.add_subview(view);
    }

    /// Direct children.
    pub fn subviews(&self) -> Vec<Arc<View>> {
        self.subviews.read().clone()
    }

    /// Depth-first search of the children for a view with `tag`.
    ///
    /// The view itself is not considered.
    pub fn view_with_tag(&self, tag: i64) -> Option<Arc<View>> {
        let subviews = self.subviews();
        for view in &subviews {
            if view.tag == tag {
                return Some(view.clone());
            }
        }
        subviews.iter().find_map(|view| view.view_with_tag(tag))
    }

    /// Request a layout pass.
    pub fn set_needs_layout(&self) {
        self.layout_passes.fetch_add(1, Ordering::Relaxed);
    }

    /// How many layout passes were requested.
    pub fn layout_pass_count(&self) -> usize {
        self.layout_passes.load(Ordering::Relaxed)
    }

    /// Observers attached to this view and its children.
    pub fn observer_count(&self) -> usize {
        self.properties.observer_count()
            + self.events.connection_count()
            + self
                .subviews
                .read()
                .iter()
                .map(|v| v.observer_count())
                .sum::<usize>()
    }
}

impl KeyValueObject for View {
    fn value_for_key(&self, key: &str) -> Option<Value> {
        self.properties.get(key)
    }

    fn set_value_for_key(&self, key: &str, value: Value) -> Result<bool, KeyPathError> {
        Ok(self.properties.set(key, value))
    }

    fn key_signal(&self, key: &str) -> Option<Arc<Signal<Value>>> {
        Some(self.properties.signal(key))
    }

    fn control_events(&self) -> Option<Arc<Signal<ControlEvent>>> {
        Some(self.events.clone())
    }

    fn type_label(&self) -> &'static str {
        "View"
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("tag", &self.tag)
            .field("properties", &self.properties.keys())
            .field("subviews", &self.subviews.read().len())
            .finish()
    }
}

/// Unique identifier of a cell instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric form.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Accessory shown at the trailing edge of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessoryType {
    /// No accessory.
    #[default]
    None,
    /// A chevron hinting that tapping navigates.
    DisclosureIndicator,
    /// A detail button plus chevron.
    DetailDisclosureButton,
    /// A checkmark.
    Checkmark,
    /// A detail button.
    DetailButton,
}

/// One table cell: a root view with the standard labels.
pub struct Cell {
    id: CellId,
    reuse_identifier: String,
    root: Arc<View>,
    accessory: Mutex<AccessoryType>,
}

impl Cell {
    /// Create a cell with the standard labels and image view.
    pub fn new(reuse_identifier: impl Into<String>) -> Self {
        let root = View::shared(0);
        root.add_named_subview(TEXT_LABEL, View::shared(0));
        root.add_named_subview(DETAIL_TEXT_LABEL, View::shared(0));
        root.add_named_subview(IMAGE_VIEW, View::shared(0));
        Self {
            id: CellId::next(),
            reuse_identifier: reuse_identifier.into(),
            root,
            accessory: Mutex::new(AccessoryType::None),
        }
    }

    /// The cell's unique id.
    pub fn id(&self) -> CellId {
        self.id
    }

    /// The reuse identifier this cell was created for.
    pub fn reuse_identifier(&self) -> &str {
        &self.reuse_identifier
    }

    /// The root view.
    pub fn root(&self) -> &Arc<View> {
        &self.root
    }

    /// The main text label.
    pub fn text_label(&self) -> Option<Arc<View>> {
        self.named_view(TEXT_LABEL)
    }

    /// The detail text label.
    pub fn detail_text_label(&self) -> Option<Arc<View>> {
        self.named_view(DETAIL_TEXT_LABEL)
    }

    /// The image view.
    pub fn image_view(&self) -> Option<Arc<View>> {
        self.named_view(IMAGE_VIEW)
    }

    /// Text currently shown by the main label.
    pub fn text(&self) -> Option<String> {
        self.text_label()
            .and_then(|label| label.get("text"))
            .and_then(Value::into_string)
    }

    /// Text currently shown by the detail label.
    pub fn detail_text(&self) -> Option<String> {
        self.detail_text_label()
            .and_then(|label| label.get("text"))
            .and_then(Value::into_string)
    }

    /// Find a tagged view anywhere under the root.
    pub fn view_with_tag(&self, tag: i64) -> Option<Arc<View>> {
        self.root.view_with_tag(tag)
    }

    /// The current accessory.
    pub fn accessory(&self) -> AccessoryType {
        *self.accessory.lock()
    }

    /// Set the accessory.
    pub fn set_accessory(&self, accessory: AccessoryType) {
        *self.accessory.lock() = accessory;
    }

    /// Request a layout pass on the root view.
    pub fn set_needs_layout(&self) {
        self.root.set_needs_layout();
    }

    /// Observers attached anywhere in the cell.
    pub fn observer_count(&self) -> usize {
        self.root.observer_count()
    }

    fn named_view(&self, key: &str) -> Option<Arc<View>> {
        let value = self.root.get(key)?;
        let object = value.as_object()?.clone();
        self.root
            .subviews()
            .into_iter()
            .find(|view| std::ptr::addr_eq(Arc::as_ptr(view), Arc::as_ptr(&object)))
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.id)
            .field("reuse_identifier", &self.reuse_identifier)
            .finish()
    }
}

type CellFactory = Arc<dyn Fn(&str) -> Cell + Send + Sync>;
type DeclaredHeight = Arc<dyn Fn(&Row) -> Option<f64> + Send + Sync>;

/// Describes how to create the cells for a row.
///
/// The class name doubles as the default reuse identifier.
#[derive(Clone)]
pub struct CellClass {
    name: Arc<str>,
    factory: CellFactory,
    declared_height: Option<DeclaredHeight>,
}

impl CellClass {
    /// A class producing standard cells.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            factory: Arc::new(|reuse: &str| Cell::new(reuse)),
            declared_height: None,
        }
    }

    /// The standard cell class.
    pub fn standard() -> Self {
        Self::new("Cell")
    }

    /// Use a custom factory. It receives the reuse identifier.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Cell + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    /// Declare a per-row height, consulted after explicit heights and
    /// height callbacks.
    pub fn with_declared_height<F>(mut self, height: F) -> Self
    where
        F: Fn(&Row) -> Option<f64> + Send + Sync + 'static,
    {
        self.declared_height = Some(Arc::new(height));
        self
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a fresh cell.
    pub fn create(&self, reuse_identifier: &str) -> Arc<Cell> {
        Arc::new((self.factory)(reuse_identifier))
    }

    /// The height this class declares for `row`, if any.
    pub fn declared_height(&self, row: &Row) -> Option<f64> {
        self.declared_height.as_ref().and_then(|height| height(row))
    }
}

impl Default for CellClass {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for CellClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellClass")
            .field("name", &self.name)
            .field("declares_height", &self.declared_height.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_table_core::{KeyPath, ObjectRef};

    #[test]
    fn test_cell_standard_labels_by_keypath() {
        let cell = Cell::new("Cell");
        let root: ObjectRef = cell.root().clone();
        let path = KeyPath::parse("text_label.text").unwrap();

        path.set(&root, Value::from("Hello")).unwrap();
        assert_eq!(cell.text(), Some("Hello".to_string()));
        assert_eq!(cell.detail_text(), None);
    }

    #[test]
    fn test_view_with_tag_searches_depth_first() {
        let cell = Cell::new("Cell");
        let container = View::shared(10);
        let field = View::shared(9999);
        container.add_subview(field.clone());
        cell.root().add_subview(container);

        let found = cell.view_with_tag(9999).unwrap();
        assert!(Arc::ptr_eq(&found, &field));
        assert!(cell.view_with_tag(42).is_none());
    }

    #[test]
    fn test_user_edit_emits_event_after_write() {
        let view = View::shared(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let weak = Arc::downgrade(&view);
        let s = seen.clone();
        view.events().connect(move |event| {
            let text = weak.upgrade().and_then(|v| v.get("text"));
            s.lock().push((*event, text));
        });

        view.user_edit("text", "typed", ControlEvent::EditingDidEnd);
        assert_eq!(
            *seen.lock(),
            vec![(ControlEvent::EditingDidEnd, Some(Value::from("typed")))]
        );
    }

    #[test]
    fn test_cell_ids_are_unique() {
        let a = Cell::new("Cell");
        let b = Cell::new("Cell");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_cell_class_factory() {
        let class = CellClass::new("Field").with_factory(|reuse| {
            let cell = Cell::new(reuse);
            cell.root().add_subview(View::shared(9999));
            cell
        });
        let cell = class.create("Field");
        assert_eq!(cell.reuse_identifier(), "Field");
        assert!(cell.view_with_tag(9999).is_some());
        assert_eq!(class.name(), "Field");
    }
}
