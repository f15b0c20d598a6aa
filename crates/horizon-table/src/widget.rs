//! The list widget the controller drives.
//!
//! [`TableWidget`] is the narrow surface a host list view exposes: full
//! reloads, batched structural updates, and a reuse pool. The controller
//! never touches scroll state or selection; it only describes what changed.
//!
//! [`HeadlessTable`] is a complete in-memory widget. It keeps a reuse pool,
//! tracks which cell displays which index path, re-keys those cells when an
//! update is applied, and records every update pass for inspection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use horizon_table_core::logging::targets;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::controller::DataController;
use crate::view::Cell;

/// Position of a row in the displayed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IndexPath {
    /// Section index.
    pub section: usize,
    /// Row index within the section.
    pub row: usize,
}

impl IndexPath {
    /// Create an index path.
    pub const fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.row)
    }
}

/// Animation used for an update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowAnimation {
    /// No animation.
    None,
    /// Cross-fade.
    Fade,
    /// Slide from or to the right.
    Right,
    /// Slide from or to the left.
    Left,
    /// Slide from or to the top.
    Top,
    /// Slide from or to the bottom.
    Bottom,
    /// Let the widget choose.
    #[default]
    Automatic,
}

/// One batched update pass.
///
/// Deleted and reloaded index paths refer to the layout before the pass;
/// inserted index paths and move destinations refer to the layout after it.
/// Each list is sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableUpdate {
    /// Sections removed, by prior index.
    pub deleted_sections: Vec<usize>,
    /// Sections added, by new index.
    pub inserted_sections: Vec<usize>,
    /// Rows removed.
    pub deleted_rows: Vec<IndexPath>,
    /// Rows added.
    pub inserted_rows: Vec<IndexPath>,
    /// Rows moved, as (prior, new).
    pub moved_rows: Vec<(IndexPath, IndexPath)>,
    /// Rows whose content must be requested again.
    pub reloaded_rows: Vec<IndexPath>,
    /// Animation for the whole pass.
    pub animation: RowAnimation,
}

impl TableUpdate {
    /// Returns `true` if the pass changes nothing.
    pub fn is_empty(&self) -> bool {
        self.deleted_sections.is_empty()
            && self.inserted_sections.is_empty()
            && self.deleted_rows.is_empty()
            && self.inserted_rows.is_empty()
            && self.moved_rows.is_empty()
            && self.reloaded_rows.is_empty()
    }

    /// Map an index path from before this pass to after it.
    ///
    /// Returns `None` for rows that were deleted or reloaded, or whose section
    /// was deleted.
    pub fn map_index_path(&self, prior: IndexPath) -> Option<IndexPath> {
        if self.deleted_sections.contains(&prior.section)
            || self.deleted_rows.contains(&prior)
            || self.reloaded_rows.contains(&prior)
        {
            return None;
        }
        if let Some((_, to)) = self.moved_rows.iter().find(|(from, _)| *from == prior) {
            return Some(*to);
        }
        let section = shift_index(
            prior.section,
            |s| self.deleted_sections.contains(&s),
            |s| self.inserted_sections.contains(&s),
        );

        let moved_from: HashSet<IndexPath> = self.moved_rows.iter().map(|(from, _)| *from).collect();
        let moved_to: HashSet<IndexPath> = self.moved_rows.iter().map(|(_, to)| *to).collect();
        let row = shift_index(
            prior.row,
            |r| {
                let path = IndexPath::new(prior.section, r);
                self.deleted_rows.contains(&path) || moved_from.contains(&path)
            },
            |r| {
                let path = IndexPath::new(section, r);
                self.inserted_rows.contains(&path) || moved_to.contains(&path)
            },
        );
        Some(IndexPath::new(section, row))
    }
}

/// Position of the `prior`-th surviving item once `removed` items are gone
/// and `occupied` positions are taken by new items.
fn shift_index(prior: usize, removed: impl Fn(usize) -> bool, occupied: impl Fn(usize) -> bool) -> usize {
    let rank = (0..prior).filter(|&i| !removed(i)).count();
    let mut seen = 0;
    let mut index = 0;
    loop {
        if !occupied(index) {
            if seen == rank {
                return index;
            }
            seen += 1;
        }
        index += 1;
    }
}

/// A host list widget.
pub trait TableWidget: Send + Sync {
    /// Discard everything and request all content again.
    fn reload_data(&self);

    /// Apply one batched update pass.
    fn perform_updates(&self, update: &TableUpdate);

    /// Take a recycled cell for `reuse_identifier` from the reuse pool.
    fn dequeue_reusable_cell(&self, reuse_identifier: &str) -> Option<Arc<Cell>>;

    /// Height a configured cell wants, if the widget can measure it.
    fn fitting_height(&self, _cell: &Cell) -> Option<f64> {
        None
    }
}

/// Root key a cell sets to report its fitting height to [`HeadlessTable`].
pub const PREFERRED_HEIGHT: &str = "preferred_height";

#[derive(Default)]
struct HeadlessState {
    pool: HashMap<String, Vec<Arc<Cell>>>,
    visible: BTreeMap<IndexPath, Arc<Cell>>,
    updates: Vec<TableUpdate>,
    reloads: usize,
}

/// An in-memory [`TableWidget`].
///
/// Nothing is displayed until [`render`](Self::render) is called, which asks
/// the controller for every row it does not already show. Update passes
/// re-key visible cells and send deleted or reloaded ones to the reuse pool.
#[derive(Default)]
pub struct HeadlessTable {
    state: Mutex<HeadlessState>,
}

impl HeadlessTable {
    /// Create an empty widget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared widget.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Display the row at `index`, replacing any cell already there.
    pub fn display(&self, controller: &DataController, index: IndexPath) -> Option<Arc<Cell>> {
        self.recycle(controller, index);
        let cell = controller.cell_for_row_at(index)?;
        controller.will_display(&cell, index);
        self.state.lock().visible.insert(index, cell.clone());
        Some(cell)
    }

    /// Scroll the row at `index` off screen and pool its cell.
    pub fn recycle(&self, controller: &DataController, index: IndexPath) -> bool {
        let Some(cell) = self.state.lock().visible.remove(&index) else {
            return false;
        };
        controller.did_end_displaying(&cell, index);
        self.pool(cell);
        true
    }

    /// Display every row the controller reports, then finish a layout pass.
    pub fn render(&self, controller: &DataController) {
        let stale: Vec<IndexPath> = {
            let state = self.state.lock();
            state
                .visible
                .keys()
                .filter(|index| {
                    index.section >= controller.number_of_sections()
                        || index.row >= controller.number_of_rows_in_section(index.section)
                })
                .copied()
                .collect()
        };
        for index in stale {
            self.recycle(controller, index);
        }

        for section in 0..controller.number_of_sections() {
            for row in 0..controller.number_of_rows_in_section(section) {
                let index = IndexPath::new(section, row);
                if !self.state.lock().visible.contains_key(&index) {
                    self.display(controller, index);
                }
            }
        }
        controller.did_complete_layout();
    }

    /// The cell displaying `index`.
    pub fn visible_cell(&self, index: IndexPath) -> Option<Arc<Cell>> {
        self.state.lock().visible.get(&index).cloned()
    }

    /// Index paths currently displayed, in order.
    pub fn visible_index_paths(&self) -> Vec<IndexPath> {
        self.state.lock().visible.keys().copied().collect()
    }

    /// Every update pass applied so far.
    pub fn update_passes(&self) -> Vec<TableUpdate> {
        self.state.lock().updates.clone()
    }

    /// Number of update passes applied so far.
    pub fn update_pass_count(&self) -> usize {
        self.state.lock().updates.len()
    }

    /// Number of full reloads.
    pub fn reload_count(&self) -> usize {
        self.state.lock().reloads
    }

    /// Number of pooled cells for `reuse_identifier`.
    pub fn pooled_count(&self, reuse_identifier: &str) -> usize {
        self.state
            .lock()
            .pool
            .get(reuse_identifier)
            .map_or(0, Vec::len)
    }

    fn pool(&self, cell: Arc<Cell>) {
        self.state
            .lock()
            .pool
            .entry(cell.reuse_identifier().to_string())
            .or_default()
            .push(cell);
    }
}

impl TableWidget for HeadlessTable {
    fn reload_data(&self) {
        let mut state = self.state.lock();
        state.reloads += 1;
        let visible = std::mem::take(&mut state.visible);
        for cell in visible.into_values() {
            state
                .pool
                .entry(cell.reuse_identifier().to_string())
                .or_default()
                .push(cell);
        }
    }

    fn perform_updates(&self, update: &TableUpdate) {
        let mut state = self.state.lock();
        let visible = std::mem::take(&mut state.visible);
        for (index, cell) in visible {
            match update.map_index_path(index) {
                Some(new_index) => {
                    state.visible.insert(new_index, cell);
                }
                None => state
                    .pool
                    .entry(cell.reuse_identifier().to_string())
                    .or_default()
                    .push(cell),
            }
        }
        tracing::debug!(
            target: targets::UPDATES,
            deleted = update.deleted_rows.len(),
            inserted = update.inserted_rows.len(),
            moved = update.moved_rows.len(),
            reloaded = update.reloaded_rows.len(),
            "headless update pass applied"
        );
        state.updates.push(update.clone());
    }

    fn dequeue_reusable_cell(&self, reuse_identifier: &str) -> Option<Arc<Cell>> {
        self.state.lock().pool.get_mut(reuse_identifier)?.pop()
    }

    fn fitting_height(&self, cell: &Cell) -> Option<f64> {
        cell.root().get(PREFERRED_HEIGHT)?.as_float()
    }
}

impl fmt::Debug for HeadlessTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HeadlessTable")
            .field("visible", &state.visible.len())
            .field("pooled", &state.pool.values().map(Vec::len).sum::<usize>())
            .field("updates", &state.updates.len())
            .field("reloads", &state.reloads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(section: usize, row: usize) -> IndexPath {
        IndexPath::new(section, row)
    }

    #[test]
    fn test_empty_update() {
        let update = TableUpdate::default();
        assert!(update.is_empty());
        assert_eq!(update.map_index_path(path(0, 3)), Some(path(0, 3)));
    }

    #[test]
    fn test_map_after_delete_and_insert() {
        let update = TableUpdate {
            deleted_rows: vec![path(0, 1)],
            inserted_rows: vec![path(0, 0)],
            ..Default::default()
        };
        assert_eq!(update.map_index_path(path(0, 0)), Some(path(0, 1)));
        assert_eq!(update.map_index_path(path(0, 1)), None);
        assert_eq!(update.map_index_path(path(0, 2)), Some(path(0, 2)));
    }

    #[test]
    fn test_map_moves_and_sections() {
        let update = TableUpdate {
            deleted_sections: vec![0],
            moved_rows: vec![(path(1, 0), path(0, 2))],
            ..Default::default()
        };
        assert_eq!(update.map_index_path(path(0, 0)), None);
        assert_eq!(update.map_index_path(path(1, 0)), Some(path(0, 2)));
        assert_eq!(update.map_index_path(path(1, 1)), Some(path(0, 0)));
        assert_eq!(update.map_index_path(path(1, 2)), Some(path(0, 1)));
    }

    #[test]
    fn test_reloaded_rows_leave_the_visible_set() {
        let table = HeadlessTable::new();
        let cell = Arc::new(Cell::new("Cell"));
        table.state.lock().visible.insert(path(0, 0), cell.clone());

        table.perform_updates(&TableUpdate {
            reloaded_rows: vec![path(0, 0)],
            ..Default::default()
        });
        assert!(table.visible_cell(path(0, 0)).is_none());
        assert_eq!(table.pooled_count("Cell"), 1);
        assert!(Arc::ptr_eq(&table.dequeue_reusable_cell("Cell").unwrap(), &cell));
        assert_eq!(table.update_pass_count(), 1);
    }

    #[test]
    fn test_row_animation_names() {
        #[derive(Deserialize)]
        struct Holder {
            animation: RowAnimation,
        }
        let holder: Holder = toml::from_str(r#"animation = "fade""#).unwrap();
        assert_eq!(holder.animation, RowAnimation::Fade);
        assert_eq!(RowAnimation::default(), RowAnimation::Automatic);
    }
}
