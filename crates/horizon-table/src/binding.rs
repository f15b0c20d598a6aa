//! Bidirectional keypath bindings between model objects and cell views.
//!
//! A [`Binding`] links a keypath on a model object (the *source*) to a
//! keypath on a cell (the *target*). Targets are either relative to the cell
//! root or to a tagged view somewhere inside the cell.
//!
//! Bindings come in two flavours:
//!
//! - **Prototypes** are declared on a [`Row`](crate::Row). They describe the
//!   link but hold no observers. A prototype whose source is the row's
//!   object has no model until it is copied.
//! - **Live bindings** are produced by
//!   [`copy_with_model_object`](Binding::copy_with_model_object) and attached
//!   to one cell with [`bind_to_cell`](Binding::bind_to_cell). A live binding
//!   owns every observer it registers and removes them in
//!   [`unbind_all`](Binding::unbind_all) or when dropped.
//!
//! # Value flow
//!
//! Model to view: read the source keypath, apply the value transformer, then
//! the formatter, then write the target keypath. A source keypath that does
//! not resolve pushes [`Value::None`]. A target write that fails leaves the
//! view unchanged. Without a formatter of its own, a live binding renders
//! dates through the date formatter its controller hands it.
//!
//! View to model (only with a write-back option): read the target keypath,
//! parse it with the formatter, apply the transformer's inverse (or the
//! transformer itself with `use-value-transformer-in-reverse`), then write
//! the source keypath.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_table_core::logging::targets;
use horizon_table_core::{KeyPath, KeyValueObject, ObjectRef, Observation, Subscription, Value};
use parking_lot::Mutex;

use crate::error::{BindingError, Result};
use crate::format::Formatter;
use crate::options::BindingOptions;
use crate::view::Cell;

/// Where a binding reads its model value from.
#[derive(Clone)]
pub enum BindingSource {
    /// The object of the row the binding is declared on.
    RowObject,
    /// A specific object, held weakly.
    Object(Weak<dyn KeyValueObject>),
}

impl BindingSource {
    /// A specific object.
    pub fn object(object: &ObjectRef) -> Self {
        Self::Object(Arc::downgrade(object))
    }

    /// Returns `true` if both name the same source.
    pub fn same_as(&self, other: &BindingSource) -> bool {
        match (self, other) {
            (Self::RowObject, Self::RowObject) => true,
            (Self::Object(a), Self::Object(b)) => Weak::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowObject => write!(f, "RowObject"),
            Self::Object(weak) => write!(f, "Object(alive: {})", weak.strong_count() > 0),
        }
    }
}

/// Where a binding writes its display value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingTarget {
    /// A keypath relative to the cell root.
    Cell(KeyPath),
    /// A keypath relative to the view with `tag` inside the cell.
    TaggedView {
        /// The view tag.
        tag: i64,
        /// The keypath on that view.
        key_path: KeyPath,
    },
}

impl BindingTarget {
    /// A cell-root keypath target.
    pub fn cell(key_path: &str) -> Result<Self> {
        Ok(Self::Cell(KeyPath::parse(key_path)?))
    }

    /// A tagged-view keypath target.
    pub fn view_with_tag(tag: i64, key_path: &str) -> Result<Self> {
        Ok(Self::TaggedView {
            tag,
            key_path: KeyPath::parse(key_path)?,
        })
    }

    /// The keypath written on the target root.
    pub fn key_path(&self) -> &KeyPath {
        match self {
            Self::Cell(key_path) | Self::TaggedView { key_path, .. } => key_path,
        }
    }

    /// The view tag, for tagged-view targets.
    pub fn tag(&self) -> Option<i64> {
        match self {
            Self::Cell(_) => None,
            Self::TaggedView { tag, .. } => Some(*tag),
        }
    }

    /// The object the keypath is resolved against.
    fn root(&self, cell: &Cell) -> Option<ObjectRef> {
        match self {
            Self::Cell(_) => Some(cell.root().clone()),
            Self::TaggedView { tag, .. } => cell.view_with_tag(*tag).map(|view| view as ObjectRef),
        }
    }
}

impl fmt::Display for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(key_path) => write!(f, "cell.{key_path}"),
            Self::TaggedView { tag, key_path } => write!(f, "view[{tag}].{key_path}"),
        }
    }
}

struct Inner {
    source: BindingSource,
    model: Option<Weak<dyn KeyValueObject>>,
    source_key_path: KeyPath,
    target: BindingTarget,
    options: BindingOptions,
    is_prototype: bool,
    cell: Mutex<Option<Weak<Cell>>>,
    date_formatter: Mutex<Option<Arc<dyn Formatter>>>,
    source_observation: Mutex<Option<Observation>>,
    target_subscriptions: Mutex<Vec<Subscription>>,
    writing_back: AtomicBool,
}

/// A link between a model keypath and a cell keypath.
pub struct Binding {
    inner: Arc<Inner>,
}

impl Binding {
    /// Declare a prototype binding.
    ///
    /// Fails if the source keypath is malformed. Target keypaths are
    /// validated when the [`BindingTarget`] is built.
    pub fn new(
        source: BindingSource,
        source_key_path: &str,
        target: BindingTarget,
        options: BindingOptions,
    ) -> Result<Self> {
        let source_key_path = KeyPath::parse(source_key_path).map_err(|err| {
            tracing::warn!(target: targets::BINDING, error = %err, "binding not created");
            BindingError::from(err)
        })?;
        let model = match &source {
            BindingSource::RowObject => None,
            BindingSource::Object(weak) => Some(weak.clone()),
        };
        Ok(Self::from_parts(source, model, source_key_path, target, options, true))
    }

    fn from_parts(
        source: BindingSource,
        model: Option<Weak<dyn KeyValueObject>>,
        source_key_path: KeyPath,
        target: BindingTarget,
        options: BindingOptions,
        is_prototype: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                model,
                source_key_path,
                target,
                options,
                is_prototype,
                cell: Mutex::new(None),
                date_formatter: Mutex::new(None),
                source_observation: Mutex::new(None),
                target_subscriptions: Mutex::new(Vec::new()),
                writing_back: AtomicBool::new(false),
            }),
        }
    }

    /// Clone into a live binding for `object`.
    ///
    /// Row-object sources take `object` as their model; explicit sources keep
    /// theirs. The copy shares no observers with `self`.
    pub fn copy_with_model_object(&self, object: Option<&ObjectRef>) -> Binding {
        let inner = &self.inner;
        let copy = Self::from_parts(
            inner.source.clone(),
            inner.resolve_model_for(object),
            inner.source_key_path.clone(),
            inner.target.clone(),
            inner.options.clone(),
            false,
        );
        *copy.inner.date_formatter.lock() = inner.date_formatter.lock().clone();
        copy
    }

    /// Render and parse [`Value::Date`] with `formatter` whenever the options
    /// carry no formatter.
    pub fn set_date_formatter(&self, formatter: Arc<dyn Formatter>) {
        *self.inner.date_formatter.lock() = Some(formatter);
    }

    /// Returns `true` for prototypes.
    pub fn is_prototype(&self) -> bool {
        self.inner.is_prototype
    }

    /// The declared source.
    pub fn source(&self) -> &BindingSource {
        &self.inner.source
    }

    /// The source keypath.
    pub fn source_key_path(&self) -> &KeyPath {
        &self.inner.source_key_path
    }

    /// The target.
    pub fn target(&self) -> &BindingTarget {
        &self.inner.target
    }

    /// The options.
    pub fn options(&self) -> &BindingOptions {
        &self.inner.options
    }

    /// The model object, if it is still alive.
    pub fn model_object(&self) -> Option<ObjectRef> {
        self.inner.model_object()
    }

    /// The cell this binding is attached to, if any.
    pub fn cell(&self) -> Option<Arc<Cell>> {
        self.inner.cell()
    }

    /// Returns `true` if this binding names the given source and target.
    pub fn matches(&self, source: &BindingSource, source_key_path: &KeyPath, target: &BindingTarget) -> bool {
        self.inner.source.same_as(source)
            && self.inner.source_key_path == *source_key_path
            && self.inner.target == *target
    }

    /// The live source value, without side effects.
    pub fn current_model_value(&self) -> Value {
        self.inner.current_model_value()
    }

    /// The value that would be displayed for the current model value.
    pub fn display_value(&self) -> Value {
        self.inner.display_value(&self.inner.current_model_value())
    }

    /// Push `object`'s value into `cell` once, without observing either side.
    ///
    /// Used for cells that will not stay live, such as height measurement.
    pub fn apply_data_to_cell(&self, cell: &Cell, object: Option<&ObjectRef>) {
        let inner = &self.inner;
        let model = inner.resolve_model_for(object).and_then(|weak| weak.upgrade());
        let value = inner.read_source(model.as_ref());
        inner.write_target(cell, inner.display_value(&value));
    }

    /// Attach to `cell`: push the current value and register observers.
    ///
    /// Any previous attachment of this binding is torn down first.
    pub fn bind_to_cell(&self, cell: &Arc<Cell>) -> Result<()> {
        let inner = &self.inner;
        if inner.is_prototype {
            return Err(BindingError::Prototype(inner.source_key_path.to_string()));
        }

        self.unbind_all();
        *inner.cell.lock() = Some(Arc::downgrade(cell));
        Inner::push(inner);

        if let Some(model) = inner.model_object() {
            let weak = Arc::downgrade(inner);
            let observation = inner.source_key_path.observe(&model, move |_| {
                if let Some(inner) = weak.upgrade() {
                    Inner::push(&inner);
                }
            });
            *inner.source_observation.lock() = Some(observation);
        }

        if inner.options.is_bidirectional() {
            let events = inner
                .target
                .root(cell)
                .and_then(|root| inner.target.key_path().resolve_owner(&root).ok())
                .and_then(|owner| owner.control_events());
            match events {
                Some(events) => {
                    let weak = Arc::downgrade(inner);
                    let subscription = events.subscribe(move |event| {
                        if let Some(inner) = weak.upgrade() {
                            if inner.options.writes_back_on(*event) {
                                Inner::write_back(&inner);
                            }
                        }
                    });
                    inner.target_subscriptions.lock().push(subscription);
                }
                None => tracing::debug!(
                    target: targets::BINDING,
                    target_path = %inner.target,
                    "target has no control events, binding is one-way"
                ),
            }
        }

        tracing::trace!(
            target: targets::BINDING,
            source = %inner.source_key_path,
            target_path = %inner.target,
            cell = cell.id().as_u64(),
            "binding attached"
        );
        Ok(())
    }

    /// Re-push the current model value into the attached cell.
    pub fn refresh(&self) {
        Inner::push(&self.inner);
    }

    /// Simulate a write-back as if the target had reported an edit.
    pub fn write_back(&self) {
        Inner::write_back(&self.inner);
    }

    /// Remove every observer this binding owns and detach from its cell.
    pub fn unbind_all(&self) {
        let inner = &self.inner;
        let observation = inner.source_observation.lock().take();
        let subscriptions = std::mem::take(&mut *inner.target_subscriptions.lock());
        inner.cell.lock().take();
        drop(observation);
        drop(subscriptions);
    }

    /// Returns `true` while attached to a live cell.
    pub fn is_bound(&self) -> bool {
        self.inner.cell().is_some()
    }

    /// Number of observer registrations this binding currently holds.
    pub fn observer_count(&self) -> usize {
        let source = self
            .inner
            .source_observation
            .lock()
            .as_ref()
            .map(Observation::subscription_count)
            .unwrap_or(0);
        let target = self
            .inner
            .target_subscriptions
            .lock()
            .iter()
            .filter(|s| s.is_active())
            .count();
        source + target
    }
}

impl Inner {
    fn resolve_model_for(&self, object: Option<&ObjectRef>) -> Option<Weak<dyn KeyValueObject>> {
        match &self.source {
            BindingSource::RowObject => object.map(Arc::downgrade),
            BindingSource::Object(weak) => Some(weak.clone()),
        }
    }

    fn model_object(&self) -> Option<ObjectRef> {
        self.model.as_ref().and_then(Weak::upgrade)
    }

    fn cell(&self) -> Option<Arc<Cell>> {
        self.cell.lock().as_ref().and_then(Weak::upgrade)
    }

    fn current_model_value(&self) -> Value {
        self.read_source(self.model_object().as_ref())
    }

    fn read_source(&self, model: Option<&ObjectRef>) -> Value {
        let Some(model) = model else {
            return Value::None;
        };
        self.source_key_path.get(model).unwrap_or_else(|err| {
            tracing::debug!(target: targets::BINDING, error = %err, "source does not resolve, pushing no value");
            Value::None
        })
    }

    fn display_value(&self, model_value: &Value) -> Value {
        let value = match &self.options.value_transformer {
            Some(transformer) => transformer.transform(model_value),
            None => model_value.clone(),
        };
        match (&self.options.formatter, &value) {
            (Some(formatter), _) => Value::String(formatter.format(&value)),
            (None, Value::Date(_)) => match self.date_formatter.lock().clone() {
                Some(formatter) => Value::String(formatter.format(&value)),
                None => value,
            },
            (None, _) => value,
        }
    }

    /// The formatter used to parse `edited` back, if any. The date fallback
    /// only applies to text edits of a date-valued source.
    fn parsing_formatter(&self, edited: &Value) -> Option<Arc<dyn Formatter>> {
        if let Some(formatter) = &self.options.formatter {
            return Some(formatter.clone());
        }
        if !matches!(edited, Value::String(_)) {
            return None;
        }
        let formatter = self.date_formatter.lock().clone()?;
        matches!(self.current_model_value(), Value::Date(_)).then_some(formatter)
    }

    fn write_target(&self, cell: &Cell, value: Value) {
        let Some(root) = self.target.root(cell) else {
            tracing::debug!(target: targets::BINDING, target_path = %self.target, "target view not found");
            return;
        };
        if let Err(err) = self.target.key_path().set(&root, value) {
            tracing::debug!(target: targets::BINDING, error = %err, "target does not resolve, keeping prior value");
            return;
        }
        if self.options.cell_needs_layout_on_update {
            cell.set_needs_layout();
        }
    }

    fn push(this: &Arc<Self>) {
        if this.writing_back.load(Ordering::Acquire) {
            return;
        }
        let Some(cell) = this.cell() else {
            tracing::trace!(target: targets::BINDING, source = %this.source_key_path, "no live cell, skipping push");
            return;
        };
        let value = this.display_value(&this.current_model_value());
        this.write_target(&cell, value);
    }

    fn write_back(this: &Arc<Self>) {
        let Some(cell) = this.cell() else { return };
        let Some(root) = this.target.root(&cell) else { return };
        let mut value = match this.target.key_path().get(&root) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(target: targets::BINDING, error = %err, "target does not resolve, nothing to write back");
                return;
            }
        };

        if let Some(formatter) = this.parsing_formatter(&value) {
            let text = match &value {
                Value::String(text) => text.clone(),
                other => other.to_display_string(),
            };
            match formatter.parse(&text) {
                Some(parsed) => value = parsed,
                None => {
                    tracing::warn!(target: targets::BINDING, text = %text, "formatter rejected edited text");
                    return;
                }
            }
        }

        if let Some(transformer) = &this.options.value_transformer {
            let transformed = if this.options.use_value_transformer_in_reverse {
                Some(transformer.transform(&value))
            } else {
                transformer.reverse_transform(&value)
            };
            match transformed {
                Some(transformed) => value = transformed,
                None => {
                    tracing::warn!(
                        target: targets::BINDING,
                        source = %this.source_key_path,
                        "value transformer has no inverse, edit not written back"
                    );
                    return;
                }
            }
        }

        let Some(model) = this.model_object() else {
            tracing::debug!(target: targets::BINDING, "model object dropped, edit not written back");
            return;
        };

        this.writing_back.store(true, Ordering::Release);
        let result = this.source_key_path.set(&model, value);
        this.writing_back.store(false, Ordering::Release);

        if let Err(err) = result {
            tracing::debug!(target: targets::BINDING, error = %err, "write-back failed");
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("source", &self.inner.source)
            .field("source_key_path", &self.inner.source_key_path)
            .field("target", &self.inner.target)
            .field("is_prototype", &self.inner.is_prototype)
            .field("bound", &self.is_bound())
            .finish()
    }
}
