//! Table rows.
//!
//! A [`Row`] describes one list item: which cell class displays it, where
//! its model object comes from, when it is visible, how tall it is, what
//! happens when it is tapped, and which [`Binding`]s connect the object to
//! the cell.
//!
//! A row is a template until it is bound to an object. In a dynamic section
//! the same row is rebound to each backing object in turn; rebinding always
//! tears down the bindings for the previous object before creating new ones.
//!
//! Rows are shared (`Arc<Row>`) between the caller, their section and the
//! controller, and use interior mutability throughout.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use horizon_table_core::logging::targets;
use horizon_table_core::{KeyPath, ObjectRef, Observation, Value};
use parking_lot::{Mutex, RwLock};

use crate::binding::{Binding, BindingSource, BindingTarget};
use crate::controller::{DataController, Shared};
use crate::error::{BindingError, Result};
use crate::options::BindingOptions;
use crate::view::{AccessoryType, Cell, CellClass};
use crate::widget::IndexPath;

/// Unique identifier of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl RowId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric form.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Where a row's model object comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectMode {
    /// The object assigned with [`Row::set_object`].
    #[default]
    Static,
    /// Read from the row's object keypath on the delegate's value source.
    /// The keypath is observed while the row is in a controller, and the
    /// row refreshes when it changes.
    OwnerKeyPath,
    /// Supplied by [`TableDelegate::object_for_row`](crate::TableDelegate::object_for_row).
    Delegate,
    /// One element of a section's backing collection. Set by the controller
    /// for dynamic rows.
    Collection,
}

/// How a row's visibility is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityMode {
    /// The row's `visible` flag.
    #[default]
    Standard,
    /// Hidden outside editing mode, otherwise as `Standard`.
    EditingOnly,
    /// Asked of the delegate.
    Delegate,
    /// Hidden outside editing mode, otherwise as `Delegate`.
    DelegateEditingOnly,
}

impl VisibilityMode {
    /// Returns `true` for the editing-only modes.
    pub fn is_editing_only(self) -> bool {
        matches!(self, Self::EditingOnly | Self::DelegateEditingOnly)
    }

    /// Returns `true` for the delegate-decided modes.
    pub fn asks_delegate(self) -> bool {
        matches!(self, Self::Delegate | Self::DelegateEditingOnly)
    }
}

/// Editing control shown next to a row in editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditingStyle {
    /// No control.
    #[default]
    None,
    /// A delete control.
    Delete,
    /// An insert control.
    Insert,
}

/// Runs after a cell is created (not when dequeued). May return a
/// replacement cell.
pub type InitialSetupFn = Arc<dyn Fn(Arc<Cell>, &Row) -> Arc<Cell> + Send + Sync>;
/// Runs every time a cell is configured for the row.
pub type ConfigureFn = Arc<dyn Fn(&Cell, &Row) + Send + Sync>;
/// Runs just before a cell is displayed.
pub type WillDisplayFn = Arc<dyn Fn(&Row, &Cell, IndexPath) + Send + Sync>;
/// Runs when the row, or its accessory, is tapped.
pub type ActionFn = Arc<dyn Fn(&Row) + Send + Sync>;
/// Computes the row's height.
pub type HeightFn = Arc<dyn Fn(&Row) -> f64 + Send + Sync>;

#[derive(Clone)]
struct RowConfig {
    tag: i64,
    cell_class: CellClass,
    reuse_identifier: Option<String>,
    object_mode: ObjectMode,
    object_key_path: Option<KeyPath>,
    visible: bool,
    visibility_mode: VisibilityMode,
    row_height: Option<f64>,
    estimated_height: Option<f64>,
    height: Option<HeightFn>,
    calculate_height_with_auto_layout: bool,
    calculate_height_with_prototype_cell: bool,
    auto_height_for_text: bool,
    auto_height_for_object_key_path: Option<KeyPath>,
    initial_setup: Option<InitialSetupFn>,
    configure: Option<ConfigureFn>,
    will_display: Option<WillDisplayFn>,
    action: Option<ActionFn>,
    accessory_action: Option<ActionFn>,
    text: Option<String>,
    detail_text: Option<String>,
    text_bound_to_key_path: Option<KeyPath>,
    detail_text_bound_to_key_path: Option<KeyPath>,
    configuration_values: Vec<(KeyPath, Value)>,
    initial_setup_values: Vec<(KeyPath, Value)>,
    accessory: Option<AccessoryType>,
    has_delete_action: bool,
    has_insert_action: bool,
    can_select_during_editing: bool,
    text_field_tag: Option<i64>,
}

impl RowConfig {
    fn new(cell_class: CellClass) -> Self {
        Self {
            tag: 0,
            cell_class,
            reuse_identifier: None,
            object_mode: ObjectMode::default(),
            object_key_path: None,
            visible: true,
            visibility_mode: VisibilityMode::default(),
            row_height: None,
            estimated_height: None,
            height: None,
            calculate_height_with_auto_layout: false,
            calculate_height_with_prototype_cell: false,
            auto_height_for_text: false,
            auto_height_for_object_key_path: None,
            initial_setup: None,
            configure: None,
            will_display: None,
            action: None,
            accessory_action: None,
            text: None,
            detail_text: None,
            text_bound_to_key_path: None,
            detail_text_bound_to_key_path: None,
            configuration_values: Vec::new(),
            initial_setup_values: Vec::new(),
            accessory: None,
            has_delete_action: false,
            has_insert_action: false,
            can_select_during_editing: false,
            text_field_tag: None,
        }
    }
}

/// Parse a keypath given to a row setting; malformed paths are logged and
/// the setting is left unchanged.
fn parse_setting(setting: &'static str, path: &str) -> Option<KeyPath> {
    match KeyPath::parse(path) {
        Ok(key_path) => Some(key_path),
        Err(err) => {
            tracing::warn!(target: targets::ROW, setting, error = %err, "ignoring row setting");
            None
        }
    }
}

/// One table row.
pub struct Row {
    id: RowId,
    config: RwLock<RowConfig>,
    object: RwLock<Option<ObjectRef>>,
    last_returned_object: RwLock<Option<ObjectRef>>,
    bindings: RwLock<Vec<Arc<Binding>>>,
    live_bindings: Mutex<Vec<Binding>>,
    controller: RwLock<Weak<Shared>>,
    section_tag: RwLock<Option<i64>>,
    owner_observation: Mutex<Option<Observation>>,
}

impl Row {
    /// Create a row displayed with `cell_class`.
    pub fn new(cell_class: CellClass) -> Self {
        Self {
            id: RowId::next(),
            config: RwLock::new(RowConfig::new(cell_class)),
            object: RwLock::new(None),
            last_returned_object: RwLock::new(None),
            bindings: RwLock::new(Vec::new()),
            live_bindings: Mutex::new(Vec::new()),
            controller: RwLock::new(Weak::new()),
            section_tag: RwLock::new(None),
            owner_observation: Mutex::new(None),
        }
    }

    /// Create a row with the standard cell class.
    pub fn standard() -> Self {
        Self::new(CellClass::standard())
    }

    /// Finish building and share the row.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    // -------------------------------------------------------------------------
    // Builder
    // -------------------------------------------------------------------------

    /// Set the caller-assigned tag.
    pub fn with_tag(self, tag: i64) -> Self {
        self.config.write().tag = tag;
        self
    }

    /// Set an explicit reuse identifier.
    pub fn with_reuse_identifier(self, reuse_identifier: impl Into<String>) -> Self {
        self.config.write().reuse_identifier = Some(reuse_identifier.into());
        self
    }

    /// Set a static object.
    pub fn with_object(self, object: ObjectRef) -> Self {
        *self.object.write() = Some(object);
        self
    }

    /// Set the object mode.
    pub fn with_object_mode(self, mode: ObjectMode) -> Self {
        self.config.write().object_mode = mode;
        self
    }

    /// Read the object from `path` on the delegate's value source, observing
    /// it for changes. Switches the object mode to [`ObjectMode::OwnerKeyPath`].
    pub fn with_object_key_path(self, path: &str) -> Self {
        if let Some(key_path) = parse_setting("object_key_path", path) {
            let mut config = self.config.write();
            config.object_key_path = Some(key_path);
            config.object_mode = ObjectMode::OwnerKeyPath;
        }
        self
    }

    /// Set the visibility flag.
    pub fn with_visible(self, visible: bool) -> Self {
        self.config.write().visible = visible;
        self
    }

    /// Set the visibility mode.
    pub fn with_visibility_mode(self, mode: VisibilityMode) -> Self {
        self.config.write().visibility_mode = mode;
        self
    }

    /// Set a fixed row height.
    pub fn with_row_height(self, height: f64) -> Self {
        self.config.write().row_height = Some(height);
        self
    }

    /// Set the estimated height reported before the first layout pass.
    pub fn with_estimated_height(self, height: f64) -> Self {
        self.config.write().estimated_height = Some(height);
        self
    }

    /// Compute the height with a callback.
    pub fn with_height<F>(self, height: F) -> Self
    where
        F: Fn(&Row) -> f64 + Send + Sync + 'static,
    {
        self.config.write().height = Some(Arc::new(height));
        self
    }

    /// Measure the height by laying out a configured cell.
    pub fn with_auto_layout_height(self) -> Self {
        self.config.write().calculate_height_with_auto_layout = true;
        self
    }

    /// Measure the height on a throwaway prototype cell filled with the
    /// row's data.
    pub fn with_prototype_cell_height(self) -> Self {
        self.config.write().calculate_height_with_prototype_cell = true;
        self
    }

    /// Estimate the height from the row's text.
    pub fn with_auto_height_for_text(self) -> Self {
        self.config.write().auto_height_for_text = true;
        self
    }

    /// Estimate the height from the text at `path` on the row's object.
    pub fn with_auto_height_for_object_key_path(self, path: &str) -> Self {
        if let Some(key_path) = parse_setting("auto_height_for_object_key_path", path) {
            self.config.write().auto_height_for_object_key_path = Some(key_path);
        }
        self
    }

    /// Run `setup` after a cell is created.
    pub fn with_initial_setup<F>(self, setup: F) -> Self
    where
        F: Fn(Arc<Cell>, &Row) -> Arc<Cell> + Send + Sync + 'static,
    {
        self.config.write().initial_setup = Some(Arc::new(setup));
        self
    }

    /// Run `configure` whenever a cell is configured.
    pub fn with_configure<F>(self, configure: F) -> Self
    where
        F: Fn(&Cell, &Row) + Send + Sync + 'static,
    {
        self.config.write().configure = Some(Arc::new(configure));
        self
    }

    /// Run `will_display` before a cell is displayed.
    pub fn with_will_display<F>(self, will_display: F) -> Self
    where
        F: Fn(&Row, &Cell, IndexPath) + Send + Sync + 'static,
    {
        self.config.write().will_display = Some(Arc::new(will_display));
        self
    }

    /// Run `action` when the row is selected.
    pub fn with_action<F>(self, action: F) -> Self
    where
        F: Fn(&Row) + Send + Sync + 'static,
    {
        self.config.write().action = Some(Arc::new(action));
        self
    }

    /// Run `action` when the row's accessory is tapped.
    pub fn with_accessory_action<F>(self, action: F) -> Self
    where
        F: Fn(&Row) + Send + Sync + 'static,
    {
        self.config.write().accessory_action = Some(Arc::new(action));
        self
    }

    /// Set the main label text.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.config.write().text = Some(text.into());
        self
    }

    /// Set the detail label text.
    pub fn with_detail_text(self, text: impl Into<String>) -> Self {
        self.config.write().detail_text = Some(text.into());
        self
    }

    /// Bind the main label to `path` on the delegate's value source.
    pub fn with_text_bound_to_key_path(self, path: &str) -> Self {
        if let Some(key_path) = parse_setting("text_bound_to_key_path", path) {
            self.config.write().text_bound_to_key_path = Some(key_path);
        }
        self
    }

    /// Bind the detail label to `path` on the delegate's value source.
    pub fn with_detail_text_bound_to_key_path(self, path: &str) -> Self {
        if let Some(key_path) = parse_setting("detail_text_bound_to_key_path", path) {
            self.config.write().detail_text_bound_to_key_path = Some(key_path);
        }
        self
    }

    /// Write `value` at `path` on the cell root every time it is configured.
    pub fn with_configuration_value(self, path: &str, value: impl Into<Value>) -> Self {
        if let Err(err) = self.add_configuration_value(value, path) {
            tracing::warn!(target: targets::ROW, error = %err, "ignoring configuration value");
        }
        self
    }

    /// Write `value` at `path` on the cell root when a cell is created.
    pub fn with_initial_setup_value(self, path: &str, value: impl Into<Value>) -> Self {
        if let Some(key_path) = parse_setting("initial_setup_value", path) {
            self.config
                .write()
                .initial_setup_values
                .push((key_path, value.into()));
        }
        self
    }

    /// Set an explicit accessory.
    pub fn with_accessory(self, accessory: AccessoryType) -> Self {
        self.config.write().accessory = Some(accessory);
        self
    }

    /// Show a delete control in editing mode.
    pub fn with_delete_action(self) -> Self {
        self.config.write().has_delete_action = true;
        self
    }

    /// Show an insert control in editing mode.
    pub fn with_insert_action(self) -> Self {
        self.config.write().has_insert_action = true;
        self
    }

    /// Allow selection while the table is editing.
    pub fn with_select_during_editing(self) -> Self {
        self.config.write().can_select_during_editing = true;
        self
    }

    /// Override the tag of the text field used for text editing.
    pub fn with_text_field_tag(self, tag: i64) -> Self {
        self.config.write().text_field_tag = Some(tag);
        self
    }

    // -------------------------------------------------------------------------
    // Identity and position
    // -------------------------------------------------------------------------

    /// Unique id.
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Caller-assigned tag.
    pub fn tag(&self) -> i64 {
        self.config.read().tag
    }

    /// The cell class.
    pub fn cell_class(&self) -> CellClass {
        self.config.read().cell_class.clone()
    }

    /// The reuse identifier: explicit, or the cell class name.
    pub fn reuse_identifier(&self) -> String {
        let config = self.config.read();
        config
            .reuse_identifier
            .clone()
            .unwrap_or_else(|| config.cell_class.name().to_string())
    }

    /// The owning controller, while the row is in one.
    pub fn controller(&self) -> Option<DataController> {
        self.controller.read().upgrade().map(DataController::from_shared)
    }

    /// Tag of the section containing the row.
    pub fn section_tag(&self) -> Option<i64> {
        *self.section_tag.read()
    }

    /// The row's current index path, if it is displayed.
    ///
    /// For a dynamic row this is the position of its currently bound object.
    pub fn table_index_path(&self) -> Option<IndexPath> {
        self.controller()?.index_path_for_row(self)
    }

    /// The displayed row number within its section.
    pub fn row_number(&self) -> Option<usize> {
        self.table_index_path().map(|path| path.row)
    }

    /// For a dynamic row, the index of its current object in the backing
    /// collection.
    pub fn object_index(&self) -> Option<usize> {
        let object = self.object.read().clone()?;
        self.controller()?.section_tagged(self.section_tag()?)?.index_of_dynamic_object(&object)
    }

    // -------------------------------------------------------------------------
    // Objects
    // -------------------------------------------------------------------------

    /// Resolve the row's object through its object mode.
    ///
    /// The result is cached as [`last_returned_object`](Self::last_returned_object).
    pub fn object(&self) -> Option<ObjectRef> {
        let (mode, key_path) = {
            let config = self.config.read();
            (config.object_mode, config.object_key_path.clone())
        };
        let resolved = match mode {
            ObjectMode::Static | ObjectMode::Collection => self.object.read().clone(),
            ObjectMode::OwnerKeyPath => key_path.and_then(|key_path| {
                self.controller()?
                    .delegate_value_for_key_path(&key_path)
                    .as_object()
                    .cloned()
            }),
            ObjectMode::Delegate => self.controller().and_then(|c| c.delegate_object_for_row(self)),
        };
        *self.last_returned_object.write() = resolved.clone();
        resolved
    }

    /// The object most recently returned by [`object`](Self::object) or set
    /// with [`set_object`](Self::set_object).
    pub fn last_returned_object(&self) -> Option<ObjectRef> {
        self.last_returned_object.read().clone()
    }

    /// Bind the row to `object` and redisplay it.
    ///
    /// Bindings for the previous object are torn down before bindings for the
    /// new one are created. If the row is displayed by a controller, its
    /// visibility is re-evaluated and its cell reconfigured.
    pub fn set_object(&self, object: Option<ObjectRef>) {
        self.bind_object(object);
        if self.object_mode() != ObjectMode::Collection {
            if let Some(controller) = self.controller() {
                controller.content_changed_for_row(self);
            }
        }
    }

    /// Rebind without notifying the controller.
    pub(crate) fn bind_object(&self, object: Option<ObjectRef>) {
        let stale = std::mem::take(&mut *self.live_bindings.lock());
        for binding in &stale {
            binding.unbind_all();
        }
        drop(stale);

        *self.object.write() = object.clone();
        *self.last_returned_object.write() = object.clone();

        let live: Vec<Binding> = self
            .bindings()
            .iter()
            .map(|prototype| prototype.copy_with_model_object(object.as_ref()))
            .collect();
        *self.live_bindings.lock() = live;
    }

    /// The object mode.
    pub fn object_mode(&self) -> ObjectMode {
        self.config.read().object_mode
    }

    /// Change the object mode.
    pub fn set_object_mode(&self, mode: ObjectMode) {
        self.config.write().object_mode = mode;
    }

    /// The object keypath on the delegate's value source.
    pub fn object_key_path(&self) -> Option<KeyPath> {
        self.config.read().object_key_path.clone()
    }

    // -------------------------------------------------------------------------
    // Visibility
    // -------------------------------------------------------------------------

    /// The visibility flag used by the standard modes.
    pub fn is_visible_flag(&self) -> bool {
        self.config.read().visible
    }

    /// Change the visibility flag. Call [`refresh`](Self::refresh) to apply.
    pub fn set_visible(&self, visible: bool) {
        self.config.write().visible = visible;
    }

    /// The visibility mode.
    pub fn visibility_mode(&self) -> VisibilityMode {
        self.config.read().visibility_mode
    }

    /// Change the visibility mode. Call [`refresh`](Self::refresh) to apply.
    pub fn set_visibility_mode(&self, mode: VisibilityMode) {
        self.config.write().visibility_mode = mode;
    }

    /// Whether the row is currently visible, as decided by its controller.
    /// Rows outside a controller answer from their flag and mode alone.
    pub fn is_visible(&self) -> bool {
        match self.controller() {
            Some(controller) => controller.perform_visibility_check_for_row(self),
            None => self.is_visible_flag() && !self.visibility_mode().is_editing_only(),
        }
    }

    /// Ask the controller to re-resolve and redisplay only this row.
    pub fn refresh(&self) {
        match self.controller() {
            Some(controller) => controller.content_changed_for_row(self),
            None => tracing::debug!(target: targets::ROW, row = self.tag(), "refresh on detached row"),
        }
    }

    // -------------------------------------------------------------------------
    // Height
    // -------------------------------------------------------------------------

    /// Explicit row height.
    pub fn row_height(&self) -> Option<f64> {
        self.config.read().row_height
    }

    /// Change the explicit row height.
    pub fn set_row_height(&self, height: Option<f64>) {
        self.config.write().row_height = height;
    }

    /// Estimated height.
    pub fn estimated_height(&self) -> Option<f64> {
        self.config.read().estimated_height
    }

    /// Height callback.
    pub fn height_callback(&self) -> Option<HeightFn> {
        self.config.read().height.clone()
    }

    /// Returns `true` if the height is measured on a configured cell.
    pub fn measures_cell_height(&self) -> bool {
        let config = self.config.read();
        config.calculate_height_with_auto_layout || config.calculate_height_with_prototype_cell
    }

    /// Text used for the text-based height estimate, if enabled.
    pub fn auto_height_text(&self) -> Option<String> {
        let (key_path, from_text, text) = {
            let config = self.config.read();
            (
                config.auto_height_for_object_key_path.clone(),
                config.auto_height_for_text,
                config.text.clone(),
            )
        };
        if let Some(key_path) = key_path {
            let object = self.last_returned_object()?;
            return Some(
                key_path
                    .get(&object)
                    .map(|value| value.to_display_string())
                    .unwrap_or_default(),
            );
        }
        from_text.then(|| text.unwrap_or_default())
    }

    // -------------------------------------------------------------------------
    // Cell configuration
    // -------------------------------------------------------------------------

    /// Initial setup callback.
    pub fn initial_setup(&self) -> Option<InitialSetupFn> {
        self.config.read().initial_setup.clone()
    }

    /// Configuration callback.
    pub fn configure_callback(&self) -> Option<ConfigureFn> {
        self.config.read().configure.clone()
    }

    /// Will-display callback.
    pub fn will_display(&self) -> Option<WillDisplayFn> {
        self.config.read().will_display.clone()
    }

    /// Action callback.
    pub fn action(&self) -> Option<ActionFn> {
        self.config.read().action.clone()
    }

    /// Accessory action callback.
    pub fn accessory_action(&self) -> Option<ActionFn> {
        self.config.read().accessory_action.clone()
    }

    /// Main label text.
    pub fn text(&self) -> Option<String> {
        self.config.read().text.clone()
    }

    /// Change the main label text. Call [`refresh`](Self::refresh) to apply.
    pub fn set_text(&self, text: Option<String>) {
        self.config.write().text = text;
    }

    /// Detail label text.
    pub fn detail_text(&self) -> Option<String> {
        self.config.read().detail_text.clone()
    }

    /// Change the detail label text. Call [`refresh`](Self::refresh) to apply.
    pub fn set_detail_text(&self, text: Option<String>) {
        self.config.write().detail_text = text;
    }

    /// Keypath bound to the main label.
    pub fn text_bound_to_key_path(&self) -> Option<KeyPath> {
        self.config.read().text_bound_to_key_path.clone()
    }

    /// Keypath bound to the detail label.
    pub fn detail_text_bound_to_key_path(&self) -> Option<KeyPath> {
        self.config.read().detail_text_bound_to_key_path.clone()
    }

    /// Add a value written at `path` on the cell root at every configuration.
    pub fn add_configuration_value(&self, value: impl Into<Value>, path: &str) -> Result<()> {
        let key_path = KeyPath::parse(path)?;
        self.config
            .write()
            .configuration_values
            .push((key_path, value.into()));
        Ok(())
    }

    /// Values written at every configuration.
    pub fn configuration_values(&self) -> Vec<(KeyPath, Value)> {
        self.config.read().configuration_values.clone()
    }

    /// Values written when a cell is created.
    pub fn initial_setup_values(&self) -> Vec<(KeyPath, Value)> {
        self.config.read().initial_setup_values.clone()
    }

    /// Explicit accessory.
    pub fn accessory(&self) -> Option<AccessoryType> {
        self.config.read().accessory
    }

    /// Tag of the text field used for text editing, if overridden.
    pub fn text_field_tag(&self) -> Option<i64> {
        self.config.read().text_field_tag
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    /// Returns `true` if the row shows a delete control.
    pub fn has_delete_action(&self) -> bool {
        self.config.read().has_delete_action
    }

    /// Returns `true` if the row shows an insert control.
    pub fn has_insert_action(&self) -> bool {
        self.config.read().has_insert_action
    }

    /// Returns `true` if the row can be selected during editing.
    pub fn can_select_during_editing(&self) -> bool {
        self.config.read().can_select_during_editing
    }

    /// The editing control. Delete wins over insert.
    pub fn editing_style(&self) -> EditingStyle {
        let config = self.config.read();
        if config.has_delete_action {
            EditingStyle::Delete
        } else if config.has_insert_action {
            EditingStyle::Insert
        } else {
            EditingStyle::None
        }
    }

    // -------------------------------------------------------------------------
    // Bindings
    // -------------------------------------------------------------------------

    /// Bind `path` on `object` to `cell_path` on the cell root.
    pub fn bind(&self, object: &ObjectRef, path: &str, cell_path: &str, options: BindingOptions) -> Result<()> {
        let target = self.checked(BindingTarget::cell(cell_path))?;
        self.add_binding(BindingSource::object(object), path, target, options)
    }

    /// Bind `path` on `object` to `view_path` on the view tagged `tag`.
    pub fn bind_to_view_with_tag(
        &self,
        object: &ObjectRef,
        path: &str,
        tag: i64,
        view_path: &str,
        options: BindingOptions,
    ) -> Result<()> {
        let target = self.checked(BindingTarget::view_with_tag(tag, view_path))?;
        self.add_binding(BindingSource::object(object), path, target, options)
    }

    /// Bind `path` on the row's object to `cell_path` on the cell root.
    pub fn bind_data_object_key_path(&self, path: &str, cell_path: &str, options: BindingOptions) -> Result<()> {
        let target = self.checked(BindingTarget::cell(cell_path))?;
        self.add_binding(BindingSource::RowObject, path, target, options)
    }

    /// Bind `path` on the row's object to `view_path` on the view tagged
    /// `tag`.
    pub fn bind_data_object_key_path_to_view_with_tag(
        &self,
        path: &str,
        tag: i64,
        view_path: &str,
        options: BindingOptions,
    ) -> Result<()> {
        let target = self.checked(BindingTarget::view_with_tag(tag, view_path))?;
        self.add_binding(BindingSource::RowObject, path, target, options)
    }

    fn checked<T>(&self, result: Result<T>) -> Result<T> {
        result.inspect_err(|err| {
            tracing::warn!(target: targets::BINDING, row = self.tag(), error = %err, "binding not created");
        })
    }

    fn add_binding(
        &self,
        source: BindingSource,
        path: &str,
        target: BindingTarget,
        options: BindingOptions,
    ) -> Result<()> {
        let prototype = Arc::new(Binding::new(source, path, target, options)?);
        let live = prototype.copy_with_model_object(self.object.read().as_ref());
        self.bindings.write().push(prototype.clone());
        self.live_bindings.lock().push(live);
        if let Some(controller) = self.controller() {
            controller.binding_added(self, &prototype);
        }
        Ok(())
    }

    /// Remove the bindings for `source`, `path` and `target`, tearing down
    /// every live copy. Returns how many were removed.
    pub fn unbind(&self, source: &BindingSource, path: &str, target: &BindingTarget) -> usize {
        let Ok(key_path) = self.checked(KeyPath::parse(path).map_err(BindingError::from)) else {
            return 0;
        };
        let removed = {
            let mut bindings = self.bindings.write();
            let before = bindings.len();
            bindings.retain(|b| !b.matches(source, &key_path, target));
            before - bindings.len()
        };
        if removed == 0 {
            return 0;
        }

        let stale: Vec<Binding> = {
            let mut live = self.live_bindings.lock();
            let (stale, keep) = std::mem::take(&mut *live)
                .into_iter()
                .partition(|b| b.matches(source, &key_path, target));
            *live = keep;
            stale
        };
        for binding in &stale {
            binding.unbind_all();
        }
        if let Some(controller) = self.controller() {
            controller.unbind_live(self, |b| b.matches(source, &key_path, target));
        }
        removed
    }

    /// Remove the binding from `path` on `object` to `cell_path`.
    pub fn unbind_cell_key_path(&self, object: &ObjectRef, path: &str, cell_path: &str) -> usize {
        match BindingTarget::cell(cell_path) {
            Ok(target) => self.unbind(&BindingSource::object(object), path, &target),
            Err(_) => 0,
        }
    }

    /// Remove the binding from `path` on `object` to `view_path` on the view
    /// tagged `tag`.
    pub fn unbind_view_with_tag(&self, object: &ObjectRef, path: &str, tag: i64, view_path: &str) -> usize {
        match BindingTarget::view_with_tag(tag, view_path) {
            Ok(target) => self.unbind(&BindingSource::object(object), path, &target),
            Err(_) => 0,
        }
    }

    /// Remove the binding from `path` on the row's object to `cell_path`.
    pub fn unbind_data_object_key_path(&self, path: &str, cell_path: &str) -> usize {
        match BindingTarget::cell(cell_path) {
            Ok(target) => self.unbind(&BindingSource::RowObject, path, &target),
            Err(_) => 0,
        }
    }

    /// Remove the binding from `path` on the row's object to `view_path` on
    /// the view tagged `tag`.
    pub fn unbind_data_object_key_path_view_with_tag(&self, path: &str, tag: i64, view_path: &str) -> usize {
        match BindingTarget::view_with_tag(tag, view_path) {
            Ok(target) => self.unbind(&BindingSource::RowObject, path, &target),
            Err(_) => 0,
        }
    }

    /// Remove every binding and tear down every live copy.
    pub fn unbind_all(&self) {
        self.bindings.write().clear();
        let stale = std::mem::take(&mut *self.live_bindings.lock());
        for binding in &stale {
            binding.unbind_all();
        }
        if let Some(controller) = self.controller() {
            controller.unbind_live(self, |_| true);
        }
    }

    /// The prototype bindings, in declaration order.
    pub fn bindings(&self) -> Vec<Arc<Binding>> {
        self.bindings.read().clone()
    }

    /// The current model value of the binding targeting `cell_path`.
    pub fn value_for_bound_cell_key_path(&self, cell_path: &str) -> Option<Value> {
        let target = BindingTarget::cell(cell_path).ok()?;
        self.value_for_target(&target)
    }

    /// The current model value of the binding targeting `view_path` on the
    /// view tagged `tag`.
    pub fn value_for_bound_view_tag(&self, tag: i64, view_path: &str) -> Option<Value> {
        let target = BindingTarget::view_with_tag(tag, view_path).ok()?;
        self.value_for_target(&target)
    }

    fn value_for_target(&self, target: &BindingTarget) -> Option<Value> {
        self.live_bindings
            .lock()
            .iter()
            .find(|b| b.target() == target)
            .map(Binding::current_model_value)
    }

    /// Current model values of the row's bindings, in declaration order.
    pub fn current_model_values(&self) -> Vec<Value> {
        self.live_bindings
            .lock()
            .iter()
            .map(Binding::current_model_value)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Controller attachment
    // -------------------------------------------------------------------------

    pub(crate) fn attach(self: &Arc<Self>, controller: &Arc<Shared>, section_tag: i64) {
        *self.controller.write() = Arc::downgrade(controller);
        *self.section_tag.write() = Some(section_tag);
        self.observe_owner_key_path();
    }

    pub(crate) fn detach(&self) {
        self.owner_observation.lock().take();
        *self.controller.write() = Weak::new();
        *self.section_tag.write() = None;
    }

    /// Observe the object keypath on the delegate's value source.
    pub(crate) fn observe_owner_key_path(self: &Arc<Self>) {
        let stale = self.owner_observation.lock().take();
        drop(stale);

        if self.object_mode() != ObjectMode::OwnerKeyPath {
            return;
        }
        let Some(key_path) = self.object_key_path() else { return };
        let Some(source) = self.controller().and_then(|c| c.delegate_value_source()) else {
            tracing::debug!(target: targets::ROW, row = self.tag(), "no value source to observe yet");
            return;
        };

        let weak = Arc::downgrade(self);
        let observation = key_path.observe(&source, move |_| {
            if let Some(row) = weak.upgrade() {
                tracing::trace!(target: targets::ROW, row = row.tag(), "owner keypath changed");
                row.refresh();
            }
        });
        *self.owner_observation.lock() = Some(observation);
    }

    /// Returns `true` while the owner keypath is observed.
    pub fn is_observing_owner_key_path(&self) -> bool {
        self.owner_observation.lock().is_some()
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.config.read();
        f.debug_struct("Row")
            .field("id", &self.id)
            .field("tag", &config.tag)
            .field("cell_class", &config.cell_class.name())
            .field("object_mode", &config.object_mode)
            .field("visibility_mode", &config.visibility_mode)
            .field("bindings", &self.bindings.read().len())
            .finish()
    }
}
