//! The data controller.
//!
//! [`DataController`] owns the sections of one table and drives a
//! [`TableWidget`]. It answers the widget's data-source questions (counts,
//! cells, heights), turns structural changes into update passes, keeps the
//! live bindings of every displayed cell, and routes taps and edits back to
//! rows, models and the delegate.
//!
//! # Update passes
//!
//! The controller remembers the layout the widget last saw. Every structural
//! change (adding or removing rows and sections, visibility changes, backing
//! list mutations, row refreshes) recomputes the layout and hands the
//! difference to the widget as one [`TableUpdate`]. Inside
//! [`begin_updates`](DataController::begin_updates) /
//! [`end_updates`](DataController::end_updates) the diff is deferred until
//! the outermost scope closes, so nested scopes produce exactly one pass.
//!
//! Before [`reload_data`](DataController::reload_data) the widget has seen
//! nothing, and changes only update the model.
//!
//! # Live cells
//!
//! Every configured cell gets its own live copies of its row's bindings. They
//! are torn down when the cell is dequeued for reuse, when it ends
//! displaying, and when its row disappears, so a recycled cell never hears
//! from the object it showed before.
//!
//! # Example
//!
//! ```
//! use horizon_table::{BindingOptions, DataController, HeadlessTable, IndexPath, Row, Section, TableConfig};
//! use horizon_table_core::Record;
//!
//! let table = HeadlessTable::shared();
//! let controller = DataController::new(table.clone(), TableConfig::default());
//!
//! let person = Record::shared().with_value("name", "Ada");
//! let row = Row::standard().with_object(person.clone()).into_shared();
//! row.bind_data_object_key_path("name", "text_label.text", BindingOptions::new()).unwrap();
//! controller.add_section(Section::new(0).with_row(row).into_shared());
//!
//! controller.reload_data();
//! table.render(&controller);
//! let cell = table.visible_cell(IndexPath::new(0, 0)).unwrap();
//! assert_eq!(cell.text(), Some("Ada".into()));
//!
//! person.set("name", "Grace");
//! assert_eq!(cell.text(), Some("Grace".into()));
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use chrono::NaiveDateTime;
use horizon_table_core::logging::{span_names, targets};
use horizon_table_core::{ControlEvent, KeyPath, KeyValueObject, ObjectId, ObjectRef, Value};
use parking_lot::{Mutex, RwLock};

use crate::binding::{Binding, BindingSource, BindingTarget};
use crate::config::TableConfig;
use crate::delegate::TableDelegate;
use crate::error::{BindingError, Result};
use crate::format::DateFormatter;
use crate::layout::{Layout, SectionLayout, SlotId};
use crate::options::BindingOptions;
use crate::row::{EditingStyle, ObjectMode, Row};
use crate::section::Section;
use crate::view::{AccessoryType, Cell, CellId, View, DETAIL_TEXT_LABEL, TEXT_LABEL};
use crate::widget::{IndexPath, TableWidget};

/// Bindings materialized for one displayed cell.
struct LiveCell {
    cell: Weak<Cell>,
    slot: SlotId,
    row: Weak<Row>,
    object: Option<Weak<dyn KeyValueObject>>,
    bindings: Vec<Binding>,
}

#[derive(Default)]
struct State {
    sections: Vec<Arc<Section>>,
    displayed: Layout,
    /// Keeps the allocation of every object in `displayed` from being
    /// reused, so an [`ObjectId`] in the layout never names a newer object.
    pinned: Vec<Weak<dyn KeyValueObject>>,
    loaded: bool,
    batch_depth: usize,
    pending_reloads: HashSet<SlotId>,
    editing: bool,
    layout_done: bool,
}

struct TextEdit {
    field: Weak<View>,
    slot: SlotId,
}

struct ImageEdit {
    view: Weak<View>,
    slot: SlotId,
}

struct DateEdit {
    row: Weak<Row>,
    object: Weak<dyn KeyValueObject>,
    key_path: KeyPath,
}

#[derive(Default)]
struct Editing {
    text: Option<TextEdit>,
    image: Option<ImageEdit>,
    date: Option<DateEdit>,
}

pub(crate) struct Shared {
    widget: Arc<dyn TableWidget>,
    config: TableConfig,
    date_formatter: Arc<DateFormatter>,
    delegate: RwLock<Option<Weak<dyn TableDelegate>>>,
    state: Mutex<State>,
    live_cells: Mutex<HashMap<CellId, LiveCell>>,
    editing: Mutex<Editing>,
}

/// Orchestrates sections and rows against a list widget.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct DataController {
    shared: Arc<Shared>,
}

impl DataController {
    /// Create a controller driving `widget`.
    pub fn new(widget: Arc<dyn TableWidget>, config: TableConfig) -> Self {
        let date_formatter = Arc::new(DateFormatter::new(config.date_format.clone()));
        Self {
            shared: Arc::new(Shared {
                widget,
                config,
                date_formatter,
                delegate: RwLock::new(None),
                state: Mutex::new(State::default()),
                live_cells: Mutex::new(HashMap::new()),
                editing: Mutex::new(Editing::default()),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// The configuration.
    pub fn config(&self) -> &TableConfig {
        &self.shared.config
    }

    // -------------------------------------------------------------------------
    // Delegate
    // -------------------------------------------------------------------------

    /// Set the delegate. It is held weakly.
    ///
    /// Rows reading their object from the delegate's value source start
    /// observing it, and visibility is re-evaluated.
    pub fn set_delegate<D: TableDelegate + 'static>(&self, delegate: &Arc<D>) {
        let delegate: Arc<dyn TableDelegate> = delegate.clone();
        *self.shared.delegate.write() = Some(Arc::downgrade(&delegate));
        tracing::debug!(target: targets::CONTROLLER, capabilities = ?delegate.capabilities(), "delegate set");
        self.delegate_changed();
    }

    /// Remove the delegate.
    pub fn clear_delegate(&self) {
        *self.shared.delegate.write() = None;
        self.delegate_changed();
    }

    fn delegate_changed(&self) {
        for section in self.sections() {
            for row in section.all_rows() {
                row.observe_owner_key_path();
            }
        }
        self.commit();
    }

    fn delegate(&self) -> Option<Arc<dyn TableDelegate>> {
        self.shared.delegate.read().as_ref().and_then(Weak::upgrade)
    }

    /// Returns `true` if the delegate filters dynamic rows.
    pub fn delegate_implements_dynamic_row_visibility(&self) -> bool {
        self.delegate()
            .is_some_and(|d| d.capabilities().dynamic_row_visibility)
    }

    /// The delegate's value source.
    pub fn delegate_value_source(&self) -> Option<ObjectRef> {
        let delegate = self.delegate()?;
        if !delegate.capabilities().value_source {
            return None;
        }
        delegate.value_source()
    }

    /// Resolve `key_path` on the delegate's value source.
    ///
    /// Anything unresolvable is [`Value::None`].
    pub fn delegate_value_for_key_path(&self, key_path: &KeyPath) -> Value {
        let Some(source) = self.delegate_value_source() else {
            tracing::debug!(target: targets::CONTROLLER, key_path = %key_path, "no value source");
            return Value::None;
        };
        key_path.get(&source).unwrap_or_else(|err| {
            tracing::debug!(target: targets::CONTROLLER, error = %err, "delegate keypath unresolved");
            Value::None
        })
    }

    /// The object at `path` on the delegate's value source.
    pub fn delegate_object_for_key_path(&self, path: &str) -> Option<ObjectRef> {
        let key_path = KeyPath::parse(path)
            .inspect_err(|err| tracing::warn!(target: targets::CONTROLLER, error = %err, "bad delegate keypath"))
            .ok()?;
        self.delegate_value_for_key_path(&key_path).as_object().cloned()
    }

    pub(crate) fn delegate_object_for_row(&self, row: &Row) -> Option<ObjectRef> {
        let delegate = self.delegate()?;
        if !delegate.capabilities().object_for_row {
            return None;
        }
        delegate.object_for_row(row)
    }

    // -------------------------------------------------------------------------
    // Sections and rows
    // -------------------------------------------------------------------------

    /// All sections, in display order.
    pub fn sections(&self) -> Vec<Arc<Section>> {
        self.shared.state.lock().sections.clone()
    }

    /// The section tagged `tag`.
    pub fn section_tagged(&self, tag: i64) -> Option<Arc<Section>> {
        self.shared
            .state
            .lock()
            .sections
            .iter()
            .find(|s| s.tag() == tag)
            .cloned()
    }

    /// Append a section. Returns `false` if a section with the same tag is
    /// already present.
    pub fn add_section(&self, section: Arc<Section>) -> bool {
        {
            let mut state = self.shared.state.lock();
            if state.sections.iter().any(|s| s.tag() == section.tag()) {
                tracing::warn!(target: targets::CONTROLLER, section = section.tag(), "duplicate section tag");
                return false;
            }
            state.sections.push(section.clone());
        }
        section.attach(&self.shared);
        tracing::debug!(target: targets::CONTROLLER, section = section.tag(), "section added");
        self.commit();
        true
    }

    /// Remove the section tagged `tag`, tearing down its rows' live cells
    /// and its backing list subscriptions.
    pub fn remove_section(&self, tag: i64) -> Option<Arc<Section>> {
        let section = {
            let mut state = self.shared.state.lock();
            let index = state.sections.iter().position(|s| s.tag() == tag)?;
            state.sections.remove(index)
        };
        section.detach();
        tracing::debug!(target: targets::CONTROLLER, section = tag, "section removed");
        self.commit();
        Some(section)
    }

    /// Append a row to the last section, creating section `0` if there is
    /// none.
    pub fn add_row(&self, row: Arc<Row>) {
        let last = self.shared.state.lock().sections.last().map(|s| s.tag());
        let tag = match last {
            Some(tag) => tag,
            None => {
                self.add_section(Section::new(0).into_shared());
                0
            }
        };
        self.add_row_to_section(row, tag);
    }

    /// Append a row to the section tagged `section_tag`.
    pub fn add_row_to_section(&self, row: Arc<Row>, section_tag: i64) -> bool {
        let Some(section) = self.section_tagged(section_tag) else {
            tracing::warn!(target: targets::CONTROLLER, section = section_tag, "add_row: no such section");
            return false;
        };
        section.push_row(row.clone());
        row.attach(&self.shared, section_tag);
        tracing::trace!(target: targets::CONTROLLER, section = section_tag, row = row.tag(), "row added");
        self.commit();
        true
    }

    /// Remove a static row from its section.
    pub fn remove_row(&self, row: &Row) -> bool {
        let Some(section) = row.section_tag().and_then(|tag| self.section_tagged(tag)) else {
            return false;
        };
        if section.take_row(row).is_none() {
            return false;
        }
        row.detach();
        tracing::trace!(target: targets::CONTROLLER, section = section.tag(), row = row.tag(), "row removed");
        self.commit();
        true
    }

    /// Redisplay the row tagged `row_tag` in the section tagged
    /// `section_tag`. Returns `false` if there is no such row.
    pub fn refresh_row_tagged(&self, row_tag: i64, section_tag: i64) -> bool {
        match self.section_tagged(section_tag).and_then(|s| s.row_tagged(row_tag)) {
            Some(row) => {
                self.content_changed_for_row(&row);
                true
            }
            None => {
                tracing::debug!(target: targets::CONTROLLER, row = row_tag, section = section_tag, "refresh: no such row");
                false
            }
        }
    }

    /// Re-resolve `row` and redisplay it alone.
    ///
    /// Visibility is re-evaluated: a row that became hidden is deleted, one
    /// that became visible is inserted, otherwise it is reloaded. For a
    /// dynamic prototype every displayed object row is reloaded.
    pub fn content_changed_for_row(&self, row: &Row) {
        {
            let mut state = self.shared.state.lock();
            let slots: Vec<SlotId> = match row.object_mode() {
                ObjectMode::Collection => state
                    .displayed
                    .sections
                    .iter()
                    .flat_map(|s| s.slots.iter())
                    .filter(|slot| matches!(slot, SlotId::Dynamic { .. }) && slot.row_id() == row.id())
                    .copied()
                    .collect(),
                _ => vec![SlotId::Static(row.id())],
            };
            state.pending_reloads.extend(slots);
        }
        self.commit();
    }

    pub(crate) fn dynamic_objects_changed(&self, section_tag: i64) {
        tracing::trace!(target: targets::CONTROLLER, section = section_tag, "backing list changed");
        self.commit();
    }

    // -------------------------------------------------------------------------
    // Batched updates
    // -------------------------------------------------------------------------

    /// Start collecting structural changes. Scopes nest.
    pub fn begin_updates(&self) {
        let mut state = self.shared.state.lock();
        state.batch_depth += 1;
        tracing::trace!(target: targets::UPDATES, depth = state.batch_depth, "begin updates");
    }

    /// Close a scope. Closing the outermost one applies everything collected
    /// as one update pass.
    pub fn end_updates(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.batch_depth == 0 {
                tracing::warn!(target: targets::UPDATES, "end_updates without begin_updates");
                return;
            }
            state.batch_depth -= 1;
            tracing::trace!(target: targets::UPDATES, depth = state.batch_depth, "end updates");
            if state.batch_depth > 0 {
                return;
            }
        }
        self.commit();
    }

    /// Run `changes` inside one update scope.
    pub fn perform_batch<F: FnOnce(&DataController)>(&self, changes: F) {
        self.begin_updates();
        changes(self);
        self.end_updates();
    }

    /// Returns `true` inside an update scope.
    pub fn in_update_block(&self) -> bool {
        self.shared.state.lock().batch_depth > 0
    }

    /// Discard the displayed layout and have the widget request everything
    /// again. Must be called once before the widget displays anything.
    #[tracing::instrument(skip(self), target = "horizon_table::controller", level = "debug")]
    pub fn reload_data(&self) {
        let (layout, pinned) = self.compute_layout();
        {
            let mut state = self.shared.state.lock();
            state.loaded = true;
            state.displayed = layout;
            state.pinned = pinned;
            state.pending_reloads.clear();
        }
        self.tear_down_all();
        tracing::debug!(target: targets::CONTROLLER, "reload data");
        self.shared.widget.reload_data();
    }

    fn commit(&self) {
        {
            let state = self.shared.state.lock();
            if !state.loaded || state.batch_depth > 0 {
                return;
            }
        }
        let _span = tracing::debug_span!(target: targets::UPDATES, span_names::UPDATE_FLUSH).entered();

        let (next, pinned) = self.compute_layout();
        let (update, stale) = {
            let mut state = self.shared.state.lock();
            let reloads = std::mem::take(&mut state.pending_reloads);
            let update = state.displayed.diff(&next, &reloads, self.shared.config.row_animation);
            let stale: HashSet<SlotId> = state
                .displayed
                .sections
                .iter()
                .flat_map(|s| s.slots.iter())
                .filter(|slot| reloads.contains(slot) || !next.contains(slot))
                .copied()
                .collect();
            state.displayed = next;
            state.pinned = pinned;
            (update, stale)
        };
        self.tear_down_where(|live| stale.contains(&live.slot));

        if update.is_empty() {
            tracing::trace!(target: targets::UPDATES, "nothing to update");
            return;
        }
        tracing::debug!(
            target: targets::UPDATES,
            deleted_sections = update.deleted_sections.len(),
            inserted_sections = update.inserted_sections.len(),
            deleted = update.deleted_rows.len(),
            inserted = update.inserted_rows.len(),
            moved = update.moved_rows.len(),
            reloaded = update.reloaded_rows.len(),
            "update pass"
        );
        self.shared.widget.perform_updates(&update);
    }

    fn compute_layout(&self) -> (Layout, Vec<Weak<dyn KeyValueObject>>) {
        let mut pinned = Vec::new();
        let layout = Layout {
            sections: self
                .sections()
                .iter()
                .map(|section| SectionLayout {
                    tag: section.tag(),
                    slots: self.section_slots(section, &mut pinned),
                })
                .collect(),
        };
        (layout, pinned)
    }

    fn section_slots(&self, section: &Section, pinned: &mut Vec<Weak<dyn KeyValueObject>>) -> Vec<SlotId> {
        let mut slots: Vec<SlotId> = section
            .rows()
            .iter()
            .filter(|row| self.perform_visibility_check_for_row(row))
            .map(|row| SlotId::Static(row.id()))
            .collect();

        if let (Some(prototype), Some(objects)) = (section.dynamic_prototype(), section.dynamic_objects()) {
            let mut seen: HashMap<ObjectId, usize> = HashMap::new();
            for object in objects.snapshot() {
                let id = ObjectId::of(&object);
                let count = seen.entry(id).or_insert(0);
                let occurrence = *count;
                *count += 1;
                if self.visibility_for_dynamic_row(&prototype, &object) {
                    pinned.push(Arc::downgrade(&object));
                    slots.push(SlotId::Dynamic {
                        prototype: prototype.id(),
                        object: id,
                        occurrence,
                    });
                }
            }
        }
        slots
    }

    // -------------------------------------------------------------------------
    // Visibility and editing mode
    // -------------------------------------------------------------------------

    /// Whether `row` is visible.
    ///
    /// Standard rows use their flag. Editing-only rows are hidden outside
    /// editing mode and otherwise behave like their non-editing counterpart.
    /// Delegate-decided rows ask the delegate, falling back to their flag
    /// when it cannot answer.
    pub fn perform_visibility_check_for_row(&self, row: &Row) -> bool {
        let mode = row.visibility_mode();
        if mode.is_editing_only() && !self.is_editing() {
            return false;
        }
        if !mode.asks_delegate() || row.object_mode() == ObjectMode::Collection {
            return row.is_visible_flag();
        }
        match self.delegate() {
            Some(delegate) if delegate.capabilities().row_visibility => delegate.is_row_visible(row),
            _ => row.is_visible_flag(),
        }
    }

    /// Whether the dynamic row for `object` is visible.
    ///
    /// Without the delegate's dynamic visibility callback every object is
    /// shown, subject to the prototype's editing-only rule and flag.
    pub fn visibility_for_dynamic_row(&self, row: &Row, object: &ObjectRef) -> bool {
        if !self.perform_visibility_check_for_row(row) {
            return false;
        }
        match self.delegate() {
            Some(delegate) if delegate.capabilities().dynamic_row_visibility => {
                delegate.is_dynamic_row_visible(row, object)
            }
            _ => true,
        }
    }

    /// Returns `true` in editing mode.
    pub fn is_editing(&self) -> bool {
        self.shared.state.lock().editing
    }

    /// Enter or leave editing mode. Rows whose visibility depends on it are
    /// inserted or deleted in one pass.
    pub fn set_editing(&self, editing: bool) {
        {
            let mut state = self.shared.state.lock();
            if state.editing == editing {
                return;
            }
            state.editing = editing;
        }
        tracing::debug!(target: targets::CONTROLLER, editing, "editing mode changed");
        self.commit();
    }

    // -------------------------------------------------------------------------
    // Index paths
    // -------------------------------------------------------------------------

    /// Number of displayed sections.
    pub fn number_of_sections(&self) -> usize {
        self.shared.state.lock().displayed.section_count()
    }

    /// Number of displayed rows in `section`.
    pub fn number_of_rows_in_section(&self, section: usize) -> usize {
        self.shared.state.lock().displayed.row_count(section)
    }

    /// The section displayed at `index`.
    pub fn section_at(&self, index: usize) -> Option<Arc<Section>> {
        let tag = self.shared.state.lock().displayed.section_tag(index)?;
        self.section_tagged(tag)
    }

    /// Header title of the section displayed at `index`.
    pub fn title_for_header_in_section(&self, index: usize) -> Option<String> {
        self.section_at(index)?.header_title()
    }

    /// Footer title of the section displayed at `index`.
    pub fn title_for_footer_in_section(&self, index: usize) -> Option<String> {
        self.section_at(index)?.footer_title()
    }

    /// Where `row` is displayed. A dynamic prototype answers for its
    /// currently bound object, at that object's first position in the list.
    /// Use [`index_path_for_row_occurrence`](Self::index_path_for_row_occurrence)
    /// when the list holds the object more than once.
    pub fn index_path_for_row(&self, row: &Row) -> Option<IndexPath> {
        self.index_path_for_row_occurrence(row, 0)
    }

    /// Where `row` is displayed for the `occurrence`-th appearance of its
    /// bound object in a dynamic list. Static rows ignore `occurrence`.
    pub fn index_path_for_row_occurrence(&self, row: &Row, occurrence: usize) -> Option<IndexPath> {
        let slot = match row.object_mode() {
            ObjectMode::Collection => {
                let object = row.last_returned_object()?;
                SlotId::Dynamic {
                    prototype: row.id(),
                    object: ObjectId::of(&object),
                    occurrence,
                }
            }
            _ => SlotId::Static(row.id()),
        };
        self.shared.state.lock().displayed.index_of(&slot)
    }

    /// The row displayed at `index`.
    pub fn row_at(&self, index: IndexPath) -> Option<Arc<Row>> {
        self.resolve(index).map(|(row, _, _)| row)
    }

    /// Index of the backing object displayed at `index`, or `None` for a
    /// static row.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the displayed layout or the object it
    /// shows is no longer in the backing list. Either means the widget and
    /// the backing list are out of sync.
    pub fn index_of_dynamic_object_at(&self, index: IndexPath) -> Option<usize> {
        let (slot, tag) = self.displayed_slot(index).unwrap_or_else(|| {
            tracing::error!(target: targets::CONTROLLER, %index, "index path out of range");
            panic!("index path {index} is outside the displayed table");
        });
        match slot {
            SlotId::Static(_) => None,
            SlotId::Dynamic { object, occurrence, .. } => {
                Some(self.dynamic_object_position(tag, object, occurrence, index).0)
            }
        }
    }

    /// The backing object displayed at `index`, or `None` for a static row.
    ///
    /// # Panics
    ///
    /// As [`index_of_dynamic_object_at`](Self::index_of_dynamic_object_at).
    pub fn dynamic_object_at(&self, index: IndexPath) -> Option<ObjectRef> {
        let (slot, tag) = self.displayed_slot(index).unwrap_or_else(|| {
            tracing::error!(target: targets::CONTROLLER, %index, "index path out of range");
            panic!("index path {index} is outside the displayed table");
        });
        match slot {
            SlotId::Static(_) => None,
            SlotId::Dynamic { object, occurrence, .. } => {
                Some(self.dynamic_object_position(tag, object, occurrence, index).1)
            }
        }
    }

    fn displayed_slot(&self, index: IndexPath) -> Option<(SlotId, i64)> {
        let state = self.shared.state.lock();
        Some((
            state.displayed.slot_at(index)?,
            state.displayed.section_tag(index.section)?,
        ))
    }

    fn dynamic_object_position(
        &self,
        section_tag: i64,
        object: ObjectId,
        occurrence: usize,
        index: IndexPath,
    ) -> (usize, ObjectRef) {
        let found = self
            .section_tagged(section_tag)
            .and_then(|section| section.dynamic_objects())
            .and_then(|objects| {
                objects
                    .snapshot()
                    .into_iter()
                    .enumerate()
                    .filter(|(_, o)| ObjectId::of(o) == object)
                    .nth(occurrence)
            });
        match found {
            Some(found) => found,
            None => {
                tracing::error!(target: targets::CONTROLLER, %index, section = section_tag, "displayed object missing from backing list");
                panic!("object displayed at {index} is no longer in the backing list of section {section_tag}");
            }
        }
    }

    /// Resolve the row, slot and object at `index`.
    fn resolve(&self, index: IndexPath) -> Option<(Arc<Row>, SlotId, Option<ObjectRef>)> {
        let Some((slot, tag)) = self.displayed_slot(index) else {
            tracing::warn!(target: targets::CONTROLLER, %index, "no row displayed at index path");
            return None;
        };
        let section = self.section_tagged(tag)?;
        match slot {
            SlotId::Static(id) => {
                let row = section.rows().into_iter().find(|r| r.id() == id)?;
                let object = row.object();
                Some((row, slot, object))
            }
            SlotId::Dynamic { object, occurrence, .. } => {
                let row = section.dynamic_prototype()?;
                let (_, object) = self.dynamic_object_position(tag, object, occurrence, index);
                row.bind_object(Some(object.clone()));
                Some((row, slot, Some(object)))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Cells
    // -------------------------------------------------------------------------

    /// Produce the configured cell for `index`.
    ///
    /// A dequeued cell has its previous live bindings torn down before it is
    /// configured. A new cell gets the row's initial setup first.
    pub fn cell_for_row_at(&self, index: IndexPath) -> Option<Arc<Cell>> {
        let _span = tracing::trace_span!(target: targets::CONTROLLER, span_names::CELL_CONFIGURE, %index).entered();
        let (row, slot, object) = self.resolve(index)?;
        let reuse_identifier = row.reuse_identifier();

        let cell = match self.shared.widget.dequeue_reusable_cell(&reuse_identifier) {
            Some(cell) => {
                self.tear_down_where(|live| live.cell.ptr_eq(&Arc::downgrade(&cell)) || live.cell.strong_count() == 0);
                cell
            }
            None => self.create_cell(&row, &reuse_identifier),
        };
        self.configure_cell(&row, &cell, object.as_ref(), slot);
        Some(cell)
    }

    fn create_cell(&self, row: &Row, reuse_identifier: &str) -> Arc<Cell> {
        let cell = row.cell_class().create(reuse_identifier);
        let root: ObjectRef = cell.root().clone();
        for (key_path, value) in row.initial_setup_values() {
            if let Err(err) = key_path.set(&root, value) {
                tracing::debug!(target: targets::ROW, error = %err, "initial setup value not applied");
            }
        }
        match row.initial_setup() {
            Some(setup) => setup(cell, row),
            None => cell,
        }
    }

    fn configure_cell(&self, row: &Arc<Row>, cell: &Arc<Cell>, object: Option<&ObjectRef>, slot: SlotId) {
        if let Some(text) = row.text() {
            if let Some(label) = cell.text_label() {
                label.set("text", text);
            }
        }
        if let Some(text) = row.detail_text() {
            if let Some(label) = cell.detail_text_label() {
                label.set("text", text);
            }
        }
        let root: ObjectRef = cell.root().clone();
        for (key_path, value) in row.configuration_values() {
            if let Err(err) = key_path.set(&root, value) {
                tracing::debug!(target: targets::ROW, error = %err, "configuration value not applied");
            }
        }
        cell.set_accessory(self.accessory_for_row(row));

        let mut bindings = Vec::new();
        for prototype in row.bindings() {
            let live = self.live_binding(&prototype, object);
            match live.bind_to_cell(cell) {
                Ok(()) => bindings.push(live),
                Err(err) => tracing::debug!(target: targets::BINDING, error = %err, "binding not attached"),
            }
        }
        bindings.extend(self.bound_label_bindings(row, cell));

        self.shared.live_cells.lock().insert(
            cell.id(),
            LiveCell {
                cell: Arc::downgrade(cell),
                slot,
                row: Arc::downgrade(row),
                object: object.map(Arc::downgrade),
                bindings,
            },
        );

        if let Some(configure) = row.configure_callback() {
            configure(cell, row);
        }
    }

    /// A live copy of `prototype` that renders dates with the shared formatter.
    fn live_binding(&self, prototype: &Binding, object: Option<&ObjectRef>) -> Binding {
        let live = prototype.copy_with_model_object(object);
        live.set_date_formatter(self.shared.date_formatter.clone());
        live
    }

    fn bound_label_bindings(&self, row: &Row, cell: &Arc<Cell>) -> Vec<Binding> {
        let labels = [
            (row.text_bound_to_key_path(), TEXT_LABEL),
            (row.detail_text_bound_to_key_path(), DETAIL_TEXT_LABEL),
        ];
        if labels.iter().all(|(key_path, _)| key_path.is_none()) {
            return Vec::new();
        }
        let Some(source) = self.delegate_value_source() else {
            tracing::debug!(target: targets::ROW, row = row.tag(), "bound label has no value source");
            return Vec::new();
        };

        let mut bindings = Vec::new();
        for (key_path, label) in labels {
            let Some(key_path) = key_path else { continue };
            let binding = BindingTarget::cell(&format!("{label}.text")).and_then(|target| {
                Binding::new(
                    BindingSource::object(&source),
                    key_path.as_str(),
                    target,
                    BindingOptions::new(),
                )
            });
            let live = binding.map(|prototype| self.live_binding(&prototype, None));
            match live.and_then(|live| live.bind_to_cell(cell).map(|()| live)) {
                Ok(live) => bindings.push(live),
                Err(err) => tracing::debug!(target: targets::BINDING, error = %err, "label binding not attached"),
            }
        }
        bindings
    }

    /// The accessory shown for `row`.
    pub fn accessory_for_row(&self, row: &Row) -> AccessoryType {
        if let Some(accessory) = row.accessory() {
            return accessory;
        }
        if self.shared.config.automatic_disclosure_indicator && self.can_perform_action_for_row(row) {
            AccessoryType::DisclosureIndicator
        } else {
            AccessoryType::None
        }
    }

    /// The cell is about to be displayed at `index`.
    pub fn will_display(&self, cell: &Cell, index: IndexPath) {
        let Some((row, _, _)) = self.resolve(index) else { return };
        if let Some(will_display) = row.will_display() {
            will_display(&row, cell, index);
        }
    }

    /// The cell left the screen. Its live bindings are torn down, and an
    /// edit in progress inside it is concluded.
    pub fn did_end_displaying(&self, cell: &Cell, index: IndexPath) {
        let editing_here = {
            let editing = self.shared.editing.lock();
            editing
                .text
                .as_ref()
                .and_then(|edit| edit.field.upgrade())
                .is_some_and(|field| cell.view_with_tag(field.tag()).is_some_and(|v| Arc::ptr_eq(&v, &field)))
        };
        if editing_here {
            self.end_text_editing();
        }
        let id = cell.id();
        self.tear_down_where(|live| live.cell.upgrade().is_some_and(|c| c.id() == id));
        tracing::trace!(target: targets::CONTROLLER, %index, cell = id.as_u64(), "cell ended displaying");
    }

    /// The widget finished a layout pass. From now on estimated heights are
    /// no longer returned as row heights.
    pub fn did_complete_layout(&self) {
        self.shared.state.lock().layout_done = true;
    }

    /// Number of displayed cells with live bindings.
    pub fn live_cell_count(&self) -> usize {
        self.shared.live_cells.lock().len()
    }

    /// Number of live bindings across every displayed cell.
    pub fn live_binding_count(&self) -> usize {
        self.shared
            .live_cells
            .lock()
            .values()
            .map(|live| live.bindings.len())
            .sum()
    }

    fn live_cell_for_slot(&self, slot: SlotId) -> Option<(Arc<Cell>, Arc<Row>)> {
        self.shared.live_cells.lock().values().find_map(|live| {
            if live.slot != slot {
                return None;
            }
            Some((live.cell.upgrade()?, live.row.upgrade()?))
        })
    }

    fn tear_down_where<F: Fn(&LiveCell) -> bool>(&self, predicate: F) {
        let stale: Vec<LiveCell> = {
            let mut live_cells = self.shared.live_cells.lock();
            let ids: Vec<CellId> = live_cells
                .iter()
                .filter(|(_, live)| predicate(live))
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| live_cells.remove(id)).collect()
        };
        for live in &stale {
            for binding in &live.bindings {
                binding.unbind_all();
            }
        }
        if !stale.is_empty() {
            tracing::trace!(target: targets::CONTROLLER, cells = stale.len(), "live cells torn down");
        }
    }

    fn tear_down_all(&self) {
        self.tear_down_where(|_| true);
    }

    pub(crate) fn binding_added(&self, row: &Row, prototype: &Binding) {
        let targets: Vec<(CellId, Arc<Cell>, Option<ObjectRef>)> = self
            .shared
            .live_cells
            .lock()
            .iter()
            .filter(|(_, live)| live.row.upgrade().is_some_and(|r| r.id() == row.id()))
            .filter_map(|(id, live)| {
                let object = live.object.as_ref().and_then(Weak::upgrade);
                Some((*id, live.cell.upgrade()?, object))
            })
            .collect();

        for (id, cell, object) in targets {
            let live = self.live_binding(prototype, object.as_ref());
            if let Err(err) = live.bind_to_cell(&cell) {
                tracing::debug!(target: targets::BINDING, error = %err, "binding not attached");
                continue;
            }
            if let Some(entry) = self.shared.live_cells.lock().get_mut(&id) {
                entry.bindings.push(live);
            }
        }
    }

    pub(crate) fn unbind_live<F: Fn(&Binding) -> bool>(&self, row: &Row, predicate: F) {
        let stale: Vec<Binding> = {
            let mut live_cells = self.shared.live_cells.lock();
            let mut stale = Vec::new();
            for live in live_cells.values_mut() {
                if !live.row.upgrade().is_some_and(|r| r.id() == row.id()) {
                    continue;
                }
                let (removed, kept): (Vec<Binding>, Vec<Binding>) = std::mem::take(&mut live.bindings)
                    .into_iter()
                    .partition(|binding| predicate(binding));
                live.bindings = kept;
                stale.extend(removed);
            }
            stale
        };
        for binding in &stale {
            binding.unbind_all();
        }
    }

    // -------------------------------------------------------------------------
    // Heights
    // -------------------------------------------------------------------------

    /// Height of the row at `index`.
    ///
    /// Sources, first match wins: explicit row height, height callback, cell
    /// class declared height, measurement of a configured throwaway cell,
    /// text estimate, estimated height (only before the first layout pass),
    /// default row height.
    pub fn height_for_row_at(&self, index: IndexPath) -> f64 {
        let _span = tracing::trace_span!(target: targets::CONTROLLER, span_names::HEIGHT, %index).entered();
        let Some((row, _, object)) = self.resolve(index) else {
            return self.shared.config.default_row_height;
        };
        if let Some(height) = row.row_height() {
            return height;
        }
        if let Some(height) = row.height_callback() {
            return height(&row);
        }
        if let Some(height) = row.cell_class().declared_height(&row) {
            return height;
        }
        if row.measures_cell_height() {
            if let Some(height) = self.measure(&row, object.as_ref()) {
                return height;
            }
        }
        if let Some(text) = row.auto_height_text() {
            return self.shared.config.auto_text.estimate(&text);
        }
        let layout_done = self.shared.state.lock().layout_done;
        match row.estimated_height() {
            Some(estimate) if !layout_done => estimate,
            _ => self.shared.config.default_row_height,
        }
    }

    /// Estimated height of the row at `index`.
    pub fn estimated_height_for_row_at(&self, index: IndexPath) -> f64 {
        self.row_at(index)
            .and_then(|row| row.estimated_height())
            .unwrap_or(self.shared.config.estimated_row_height)
    }

    fn measure(&self, row: &Row, object: Option<&ObjectRef>) -> Option<f64> {
        let cell = self.create_cell(row, &row.reuse_identifier());
        if let Some(text) = row.text() {
            if let Some(label) = cell.text_label() {
                label.set("text", text);
            }
        }
        let root: ObjectRef = cell.root().clone();
        for (key_path, value) in row.configuration_values() {
            if let Err(err) = key_path.set(&root, value) {
                tracing::debug!(target: targets::CONTROLLER, error = %err, "configuration value not applied to sizing cell");
            }
        }
        for prototype in row.bindings() {
            self.live_binding(&prototype, object).apply_data_to_cell(&cell, object);
        }
        if let Some(configure) = row.configure_callback() {
            configure(&cell, row);
        }
        self.shared.widget.fitting_height(&cell)
    }

    // -------------------------------------------------------------------------
    // Actions and editing controls
    // -------------------------------------------------------------------------

    /// Returns `true` if selecting `row` does something.
    pub fn can_perform_action_for_row(&self, row: &Row) -> bool {
        row.action().is_some() || self.delegate().is_some_and(|d| d.capabilities().row_action)
    }

    /// The row at `index` was selected. Returns `true` if an action ran.
    pub fn did_select_row_at(&self, index: IndexPath) -> bool {
        let Some((row, _, _)) = self.resolve(index) else { return false };
        if self.is_editing() && !row.can_select_during_editing() {
            tracing::trace!(target: targets::CONTROLLER, %index, "selection ignored while editing");
            return false;
        }
        if let Some(action) = row.action() {
            action(&row);
            return true;
        }
        match self.delegate() {
            Some(delegate) if delegate.capabilities().row_action => {
                delegate.perform_action(&row);
                true
            }
            _ => false,
        }
    }

    /// The accessory of the row at `index` was tapped. Returns `true` if an
    /// action ran.
    pub fn accessory_button_tapped(&self, index: IndexPath) -> bool {
        let Some((row, _, _)) = self.resolve(index) else { return false };
        if let Some(action) = row.accessory_action() {
            action(&row);
            return true;
        }
        match self.delegate() {
            Some(delegate) if delegate.capabilities().row_action => {
                delegate.perform_accessory_action(&row);
                true
            }
            _ => false,
        }
    }

    /// The editing control of the row at `index`.
    pub fn editing_style_for_row_at(&self, index: IndexPath) -> EditingStyle {
        self.row_at(index)
            .map_or(EditingStyle::None, |row| row.editing_style())
    }

    /// The editing control of the row at `index` was tapped. Returns `true`
    /// if the delegate handled it.
    pub fn commit_edit(&self, index: IndexPath, style: EditingStyle) -> bool {
        let Some(delegate) = self.delegate().filter(|d| d.capabilities().insert_delete_action) else {
            tracing::debug!(target: targets::CONTROLLER, %index, "no delegate for editing controls");
            return false;
        };
        let Some((row, _, _)) = self.resolve(index) else { return false };
        match style {
            EditingStyle::Delete => delegate.commit_delete(&row),
            EditingStyle::Insert => delegate.commit_insert(&row),
            EditingStyle::None => return false,
        }
        true
    }

    // -------------------------------------------------------------------------
    // Text, image and date editing
    // -------------------------------------------------------------------------

    /// Start editing the text field of the row displayed at `index`.
    ///
    /// The field is the view tagged with the row's text field tag. An edit
    /// already in progress elsewhere is concluded first. The field receives
    /// [`ControlEvent::EditingDidBegin`].
    pub fn begin_text_editing(&self, index: IndexPath) -> Option<Arc<View>> {
        let (slot, _) = self.displayed_slot(index)?;
        let (cell, row) = self.live_cell_for_slot(slot)?;
        let tag = row
            .text_field_tag()
            .unwrap_or(self.shared.config.default_text_field_tag);
        let Some(field) = cell.view_with_tag(tag) else {
            tracing::debug!(target: targets::CONTROLLER, %index, tag, "row has no text field");
            return None;
        };

        if let Some(current) = self.editing_text_field() {
            if Arc::ptr_eq(&current, &field) {
                return Some(field);
            }
            self.end_text_editing();
        }
        self.shared.editing.lock().text = Some(TextEdit {
            field: Arc::downgrade(&field),
            slot,
        });
        field.send_event(ControlEvent::EditingDidBegin);
        Some(field)
    }

    /// Conclude the text edit in progress. The field receives
    /// [`ControlEvent::EditingDidEnd`].
    pub fn end_text_editing(&self) -> bool {
        let edit = self.shared.editing.lock().text.take();
        match edit.and_then(|edit| edit.field.upgrade()) {
            Some(field) => {
                field.send_event(ControlEvent::EditingDidEnd);
                true
            }
            None => false,
        }
    }

    /// The text field being edited.
    pub fn editing_text_field(&self) -> Option<Arc<View>> {
        self.shared
            .editing
            .lock()
            .text
            .as_ref()
            .and_then(|edit| edit.field.upgrade())
    }

    /// Where the text field being edited is displayed.
    pub fn text_editing_index_path(&self) -> Option<IndexPath> {
        let slot = self.shared.editing.lock().text.as_ref()?.slot;
        self.shared.state.lock().displayed.index_of(&slot)
    }

    /// Start choosing an image for the row displayed at `index`. An image
    /// edit already in progress is concluded without an image, so a later
    /// [`apply_image`](Self::apply_image) only reaches this row.
    pub fn begin_image_editing(&self, index: IndexPath) -> bool {
        let Some((slot, _)) = self.displayed_slot(index) else { return false };
        let Some(view) = self.live_cell_for_slot(slot).and_then(|(cell, _)| cell.image_view()) else {
            tracing::debug!(target: targets::CONTROLLER, %index, "row has no image view");
            return false;
        };
        let previous = self.shared.editing.lock().image.replace(ImageEdit {
            view: Arc::downgrade(&view),
            slot,
        });
        if previous.is_some() {
            tracing::debug!(target: targets::CONTROLLER, "previous image edit concluded");
        }
        true
    }

    /// Deliver the chosen image and conclude the image edit.
    ///
    /// The image view's `image` is set as a user edit, so value-changed
    /// bindings on it write the image back to the model.
    pub fn apply_image(&self, image: impl Into<Value>) -> bool {
        let edit = self.shared.editing.lock().image.take();
        match edit.and_then(|edit| edit.view.upgrade()) {
            Some(view) => {
                view.user_edit("image", image, ControlEvent::ValueChanged);
                true
            }
            None => false,
        }
    }

    /// Abandon the image edit in progress.
    pub fn cancel_image_editing(&self) -> bool {
        self.shared.editing.lock().image.take().is_some()
    }

    /// Where the row being given an image is displayed.
    pub fn image_editing_index_path(&self) -> Option<IndexPath> {
        let slot = self.shared.editing.lock().image.as_ref()?.slot;
        self.shared.state.lock().displayed.index_of(&slot)
    }

    /// Start editing the date at `path` on the object of the row displayed
    /// at `index`.
    pub fn begin_date_editing(&self, index: IndexPath, path: &str) -> Result<()> {
        let key_path = KeyPath::parse(path)?;
        let (row, _, object) = self.resolve(index).ok_or(BindingError::NoLiveCell)?;
        let object = object.ok_or(BindingError::NoRowObject)?;
        self.shared.editing.lock().date = Some(DateEdit {
            row: Arc::downgrade(&row),
            object: Arc::downgrade(&object),
            key_path,
        });
        Ok(())
    }

    /// Write `date` to the object under date editing.
    ///
    /// If none of the row's bindings observes the edited keypath, the row is
    /// redisplayed so its configuration picks the new date up.
    pub fn apply_date(&self, date: NaiveDateTime) -> Result<()> {
        let (row, object, key_path) = {
            let editing = self.shared.editing.lock();
            let edit = editing.date.as_ref().ok_or(BindingError::NotEditing("date"))?;
            (edit.row.upgrade(), edit.object.upgrade(), edit.key_path.clone())
        };
        let object = object.ok_or(BindingError::NoRowObject)?;
        key_path.set(&object, Value::Date(date))?;
        tracing::debug!(
            target: targets::CONTROLLER,
            key_path = %key_path,
            date = %self.shared.date_formatter.format_date(&date),
            "date applied"
        );

        if let Some(row) = row {
            let observed = row.bindings().iter().any(|b| *b.source_key_path() == key_path);
            if !observed {
                self.content_changed_for_row(&row);
            }
        }
        Ok(())
    }

    /// Conclude the date edit in progress.
    pub fn end_date_editing(&self) -> bool {
        self.shared.editing.lock().date.take().is_some()
    }

    /// The row under date editing.
    pub fn row_for_date_editing(&self) -> Option<Arc<Row>> {
        self.shared
            .editing
            .lock()
            .date
            .as_ref()
            .and_then(|edit| edit.row.upgrade())
    }

    /// The shared date formatter.
    pub fn date_formatter(&self) -> &DateFormatter {
        &self.shared.date_formatter
    }

    /// Display text for a date value. Anything that is not a date renders as
    /// text, and no value renders empty.
    pub fn date_display_text(&self, value: &Value) -> String {
        match value {
            Value::Date(date) => self.shared.date_formatter.format_date(date),
            other => other.to_display_string(),
        }
    }
}

impl std::fmt::Debug for DataController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("DataController")
            .field("sections", &state.sections.len())
            .field("loaded", &state.loaded)
            .field("batch_depth", &state.batch_depth)
            .field("editing", &state.editing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::HeadlessTable;
    use horizon_table_core::{ObservableList, Record};

    fn setup() -> (Arc<HeadlessTable>, DataController) {
        let table = HeadlessTable::shared();
        let controller = DataController::new(table.clone(), TableConfig::default());
        (table, controller)
    }

    fn object(name: &str) -> ObjectRef {
        Record::shared().with_value("name", name)
    }

    #[test]
    fn test_mutations_before_reload_emit_nothing() {
        let (table, controller) = setup();
        controller.add_row(Row::standard().into_shared());
        controller.add_row(Row::standard().into_shared());
        assert_eq!(table.update_pass_count(), 0);
        assert_eq!(controller.number_of_sections(), 0);

        controller.reload_data();
        assert_eq!(table.reload_count(), 1);
        assert_eq!(controller.number_of_sections(), 1);
        assert_eq!(controller.number_of_rows_in_section(0), 2);
    }

    #[test]
    fn test_add_row_after_reload_inserts() {
        let (table, controller) = setup();
        controller.add_section(Section::new(3).into_shared());
        controller.reload_data();

        controller.add_row_to_section(Row::standard().into_shared(), 3);
        let passes = table.update_passes();
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].inserted_rows, vec![IndexPath::new(0, 0)]);
        assert!(!controller.add_row_to_section(Row::standard().into_shared(), 99));
    }

    #[test]
    fn test_duplicate_section_tag_rejected() {
        let (_, controller) = setup();
        assert!(controller.add_section(Section::new(1).into_shared()));
        assert!(!controller.add_section(Section::new(1).into_shared()));
        assert_eq!(controller.sections().len(), 1);
    }

    #[test]
    fn test_unbalanced_end_updates_is_ignored() {
        let (table, controller) = setup();
        controller.reload_data();
        controller.end_updates();
        assert!(!controller.in_update_block());
        assert_eq!(table.update_pass_count(), 0);
    }

    #[test]
    fn test_empty_batch_emits_nothing() {
        let (table, controller) = setup();
        controller.reload_data();
        controller.perform_batch(|_| {});
        assert_eq!(table.update_pass_count(), 0);
    }

    #[test]
    fn test_dynamic_object_lookup() {
        let (_, controller) = setup();
        let a = object("A");
        let b = object("B");
        let list = ObservableList::shared(vec![a.clone(), b.clone()]);
        let header = Row::standard().into_shared();
        controller.add_section(
            Section::new(0)
                .with_row(header)
                .with_dynamic_rows(Row::standard().into_shared(), list)
                .into_shared(),
        );
        controller.reload_data();

        assert_eq!(controller.index_of_dynamic_object_at(IndexPath::new(0, 0)), None);
        assert_eq!(controller.index_of_dynamic_object_at(IndexPath::new(0, 2)), Some(1));
        let found = controller.dynamic_object_at(IndexPath::new(0, 1)).unwrap();
        assert!(Arc::ptr_eq(&found, &a));
    }

    #[test]
    #[should_panic(expected = "outside the displayed table")]
    fn test_out_of_range_dynamic_index_panics() {
        let (_, controller) = setup();
        let list = ObservableList::shared(vec![object("A")]);
        controller.add_section(
            Section::new(0)
                .with_dynamic_rows(Row::standard().into_shared(), list)
                .into_shared(),
        );
        controller.reload_data();
        controller.index_of_dynamic_object_at(IndexPath::new(0, 5));
    }

    #[test]
    fn test_height_resolution_order() {
        let (table, controller) = setup();
        let class = crate::view::CellClass::new("Declared").with_declared_height(|_| Some(60.0));
        let rows = [
            Row::standard().with_row_height(30.0).with_height(|_| 99.0),
            Row::standard().with_height(|_| 99.0),
            Row::new(class),
            Row::standard()
                .with_prototype_cell_height()
                .with_configuration_value("preferred_height", 77.0),
            Row::standard().with_text("short").with_auto_height_for_text(),
            Row::standard().with_estimated_height(120.0),
        ];
        for row in rows {
            controller.add_row(row.into_shared());
        }
        controller.reload_data();

        let height = |row| controller.height_for_row_at(IndexPath::new(0, row));
        assert_eq!(height(0), 30.0);
        assert_eq!(height(1), 99.0);
        assert_eq!(height(2), 60.0);
        assert_eq!(height(3), 77.0);
        assert_eq!(height(4), 43.0);
        assert_eq!(height(5), 120.0);
        assert_eq!(controller.estimated_height_for_row_at(IndexPath::new(0, 5)), 120.0);
        assert_eq!(controller.estimated_height_for_row_at(IndexPath::new(0, 0)), 44.0);

        table.render(&controller);
        assert_eq!(height(5), 44.0);
    }

    #[test]
    fn test_automatic_disclosure_indicator() {
        let (table, controller) = setup();
        controller.add_row(Row::standard().with_action(|_| {}).into_shared());
        controller.add_row(Row::standard().into_shared());
        controller.add_row(
            Row::standard()
                .with_action(|_| {})
                .with_accessory(AccessoryType::Checkmark)
                .into_shared(),
        );
        controller.reload_data();
        table.render(&controller);

        let accessory = |row| table.visible_cell(IndexPath::new(0, row)).unwrap().accessory();
        assert_eq!(accessory(0), AccessoryType::DisclosureIndicator);
        assert_eq!(accessory(1), AccessoryType::None);
        assert_eq!(accessory(2), AccessoryType::Checkmark);
    }

    #[test]
    fn test_date_display_text() {
        let (_, controller) = setup();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(controller.date_display_text(&Value::Date(date)), "5 Jan 2024");
        assert_eq!(controller.date_display_text(&Value::None), "");
        assert_eq!(controller.date_formatter().format_string(), "%-d %b %Y");
    }
}
