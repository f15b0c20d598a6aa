//! Table sections.
//!
//! A [`Section`] holds static rows in display order and, optionally, a
//! dynamic part: one prototype row rendered once per object of an
//! [`ObservableList`]. Static rows are displayed first.
//!
//! While a section is in a controller it observes its backing list and
//! reports every insert, remove, move or reset to the controller, which
//! turns the change into the minimal update pass.

use std::fmt;
use std::sync::{Arc, Weak};

use horizon_table_core::logging::targets;
use horizon_table_core::{ObjectRef, ObservableList, Subscription};
use parking_lot::{Mutex, RwLock};

use crate::controller::{DataController, Shared};
use crate::row::{ObjectMode, Row};

struct DynamicRows {
    prototype: Arc<Row>,
    objects: Arc<ObservableList>,
}

/// A group of rows.
pub struct Section {
    tag: i64,
    header_title: RwLock<Option<String>>,
    footer_title: RwLock<Option<String>>,
    rows: RwLock<Vec<Arc<Row>>>,
    dynamic: Option<DynamicRows>,
    controller: RwLock<Weak<Shared>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Section {
    /// Create an empty static section.
    pub fn new(tag: i64) -> Self {
        Self {
            tag,
            header_title: RwLock::new(None),
            footer_title: RwLock::new(None),
            rows: RwLock::new(Vec::new()),
            dynamic: None,
            controller: RwLock::new(Weak::new()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Finish building and share the section.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Set the header title.
    pub fn with_header_title(self, title: impl Into<String>) -> Self {
        *self.header_title.write() = Some(title.into());
        self
    }

    /// Set the footer title.
    pub fn with_footer_title(self, title: impl Into<String>) -> Self {
        *self.footer_title.write() = Some(title.into());
        self
    }

    /// Append a static row.
    pub fn with_row(self, row: Arc<Row>) -> Self {
        self.rows.write().push(row);
        self
    }

    /// Render `prototype` once per object of `objects`, after the static
    /// rows.
    pub fn with_dynamic_rows(mut self, prototype: Arc<Row>, objects: Arc<ObservableList>) -> Self {
        prototype.set_object_mode(ObjectMode::Collection);
        self.dynamic = Some(DynamicRows { prototype, objects });
        self
    }

    /// The section tag.
    pub fn tag(&self) -> i64 {
        self.tag
    }

    /// Header title.
    pub fn header_title(&self) -> Option<String> {
        self.header_title.read().clone()
    }

    /// Change the header title.
    pub fn set_header_title(&self, title: Option<String>) {
        *self.header_title.write() = title;
    }

    /// Footer title.
    pub fn footer_title(&self) -> Option<String> {
        self.footer_title.read().clone()
    }

    /// Change the footer title.
    pub fn set_footer_title(&self, title: Option<String>) {
        *self.footer_title.write() = title;
    }

    /// Static rows in display order.
    pub fn rows(&self) -> Vec<Arc<Row>> {
        self.rows.read().clone()
    }

    /// The static row tagged `tag`, or the dynamic prototype if it has that
    /// tag.
    pub fn row_tagged(&self, tag: i64) -> Option<Arc<Row>> {
        self.rows
            .read()
            .iter()
            .find(|row| row.tag() == tag)
            .cloned()
            .or_else(|| self.dynamic_prototype().filter(|row| row.tag() == tag))
    }

    /// Returns `true` if the section has a dynamic part.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic.is_some()
    }

    /// The dynamic prototype row.
    pub fn dynamic_prototype(&self) -> Option<Arc<Row>> {
        self.dynamic.as_ref().map(|d| d.prototype.clone())
    }

    /// The backing list of the dynamic part.
    pub fn dynamic_objects(&self) -> Option<Arc<ObservableList>> {
        self.dynamic.as_ref().map(|d| d.objects.clone())
    }

    /// Index of `object` in the backing list.
    pub fn index_of_dynamic_object(&self, object: &ObjectRef) -> Option<usize> {
        self.dynamic.as_ref()?.objects.index_of(object)
    }

    /// Every row of the section: static rows, then the prototype.
    pub fn all_rows(&self) -> Vec<Arc<Row>> {
        let mut rows = self.rows();
        rows.extend(self.dynamic_prototype());
        rows
    }

    /// Number of live subscriptions on the backing list.
    pub fn observer_count(&self) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|s| s.is_active())
            .count()
    }

    /// The owning controller, while the section is in one.
    pub fn controller(&self) -> Option<DataController> {
        self.controller.read().upgrade().map(DataController::from_shared)
    }

    pub(crate) fn push_row(&self, row: Arc<Row>) {
        self.rows.write().push(row);
    }

    pub(crate) fn take_row(&self, row: &Row) -> Option<Arc<Row>> {
        let mut rows = self.rows.write();
        let index = rows.iter().position(|r| r.id() == row.id())?;
        Some(rows.remove(index))
    }

    pub(crate) fn attach(&self, controller: &Arc<Shared>) {
        *self.controller.write() = Arc::downgrade(controller);
        for row in self.all_rows() {
            row.attach(controller, self.tag);
        }

        let Some(dynamic) = &self.dynamic else { return };
        let signals = dynamic.objects.signals();
        let tag = self.tag;
        let notify = {
            let weak = Arc::downgrade(controller);
            move || {
                if let Some(shared) = weak.upgrade() {
                    DataController::from_shared(shared).dynamic_objects_changed(tag);
                }
            }
        };

        let on_insert = notify.clone();
        let on_remove = notify.clone();
        let on_move = notify.clone();
        let subscriptions = vec![
            signals.rows_inserted.subscribe(move |&(first, last)| {
                tracing::trace!(target: targets::SECTION, section = tag, first, last, "objects inserted");
                on_insert();
            }),
            signals.rows_removed.subscribe(move |&(first, last)| {
                tracing::trace!(target: targets::SECTION, section = tag, first, last, "objects removed");
                on_remove();
            }),
            signals.rows_moved.subscribe(move |&(from, to)| {
                tracing::trace!(target: targets::SECTION, section = tag, from, to, "object moved");
                on_move();
            }),
            signals.reset.subscribe(move |_| {
                tracing::trace!(target: targets::SECTION, section = tag, "objects reset");
                notify();
            }),
        ];
        *self.subscriptions.lock() = subscriptions;
    }

    pub(crate) fn detach(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        drop(subscriptions);
        for row in self.all_rows() {
            row.detach();
        }
        *self.controller.write() = Weak::new();
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("tag", &self.tag)
            .field("rows", &self.rows.read().len())
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_table_core::Record;

    #[test]
    fn test_builder() {
        let first = Row::standard().with_tag(1).into_shared();
        let second = Row::standard().with_tag(2).into_shared();
        let section = Section::new(10)
            .with_header_title("Header")
            .with_row(first.clone())
            .with_row(second);

        assert_eq!(section.tag(), 10);
        assert_eq!(section.header_title(), Some("Header".into()));
        assert_eq!(section.footer_title(), None);
        assert_eq!(section.rows().len(), 2);
        assert!(Arc::ptr_eq(&section.row_tagged(1).unwrap(), &first));
        assert!(section.row_tagged(3).is_none());
        assert!(!section.is_dynamic());
    }

    #[test]
    fn test_dynamic_rows() {
        let a: ObjectRef = Record::shared();
        let b: ObjectRef = Record::shared();
        let list = ObservableList::shared(vec![a.clone(), b.clone()]);
        let prototype = Row::standard().with_tag(5).into_shared();
        let section = Section::new(1).with_dynamic_rows(prototype.clone(), list);

        assert!(section.is_dynamic());
        assert_eq!(prototype.object_mode(), ObjectMode::Collection);
        assert_eq!(section.index_of_dynamic_object(&b), Some(1));
        assert!(Arc::ptr_eq(&section.row_tagged(5).unwrap(), &prototype));
        assert_eq!(section.all_rows().len(), 1);
        assert_eq!(section.observer_count(), 0);
    }

    #[test]
    fn test_take_row() {
        let row = Row::standard().into_shared();
        let section = Section::new(0).with_row(row.clone());
        assert!(section.take_row(&row).is_some());
        assert!(section.take_row(&row).is_none());
        assert!(section.rows().is_empty());
    }
}
