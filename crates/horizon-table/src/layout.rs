//! Displayed layout snapshots and the deltas between them.
//!
//! The controller keeps the layout the widget last saw. A structural change
//! computes a fresh layout and diffs it against that snapshot; the diff is
//! the update pass handed to the widget. Diffing snapshots, instead of
//! replaying individual mutations, is what lets nested batches coalesce into
//! one pass.

use std::collections::{HashMap, HashSet};

use horizon_table_core::ObjectId;

use crate::row::RowId;
use crate::widget::{IndexPath, RowAnimation, TableUpdate};

/// Identity of one displayed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SlotId {
    /// A static row.
    Static(RowId),
    /// One object of a dynamic section. `occurrence` tells apart repeated
    /// appearances of the same object.
    Dynamic {
        prototype: RowId,
        object: ObjectId,
        occurrence: usize,
    },
}

impl SlotId {
    pub(crate) fn row_id(&self) -> RowId {
        match self {
            Self::Static(id) => *id,
            Self::Dynamic { prototype, .. } => *prototype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SectionLayout {
    pub(crate) tag: i64,
    pub(crate) slots: Vec<SlotId>,
}

/// The rows of every section, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Layout {
    pub(crate) sections: Vec<SectionLayout>,
}

impl Layout {
    pub(crate) fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub(crate) fn row_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, |s| s.slots.len())
    }

    pub(crate) fn slot_at(&self, index: IndexPath) -> Option<SlotId> {
        self.sections.get(index.section)?.slots.get(index.row).copied()
    }

    pub(crate) fn section_tag(&self, section: usize) -> Option<i64> {
        self.sections.get(section).map(|s| s.tag)
    }

    pub(crate) fn index_of(&self, slot: &SlotId) -> Option<IndexPath> {
        self.sections.iter().enumerate().find_map(|(section, layout)| {
            layout
                .slots
                .iter()
                .position(|s| s == slot)
                .map(|row| IndexPath::new(section, row))
        })
    }

    pub(crate) fn contains(&self, slot: &SlotId) -> bool {
        self.sections.iter().any(|s| s.slots.contains(slot))
    }

    /// Compute the update pass turning `self` into `next`.
    ///
    /// Sections are matched by tag, rows by slot. Rows that stay in place
    /// (a longest run keeping relative order) are untouched or reloaded; the
    /// rest of the surviving rows are reported as moves. A row that is both
    /// moved and reloaded is reported as a delete plus an insert.
    pub(crate) fn diff(&self, next: &Layout, reloads: &HashSet<SlotId>, animation: RowAnimation) -> TableUpdate {
        let mut update = TableUpdate {
            animation,
            ..TableUpdate::default()
        };

        let next_sections: HashMap<i64, usize> =
            next.sections.iter().enumerate().map(|(i, s)| (s.tag, i)).collect();
        let common: Vec<(usize, usize)> = self
            .sections
            .iter()
            .enumerate()
            .filter_map(|(i, s)| next_sections.get(&s.tag).map(|&j| (i, j)))
            .collect();
        let keep = longest_increasing_run(&common.iter().map(|&(_, j)| j).collect::<Vec<_>>());
        let matched: Vec<(usize, usize)> = common
            .iter()
            .zip(&keep)
            .filter(|(_, kept)| **kept)
            .map(|(pair, _)| *pair)
            .collect();
        let matched_old: HashSet<usize> = matched.iter().map(|&(i, _)| i).collect();
        let matched_new: HashSet<usize> = matched.iter().map(|&(_, j)| j).collect();

        update.deleted_sections = (0..self.sections.len()).filter(|i| !matched_old.contains(i)).collect();
        update.inserted_sections = (0..next.sections.len()).filter(|j| !matched_new.contains(j)).collect();

        for (i, j) in matched {
            diff_section(&self.sections[i].slots, i, &next.sections[j].slots, j, reloads, &mut update);
        }

        update.deleted_rows.sort();
        update.inserted_rows.sort();
        update.moved_rows.sort();
        update.reloaded_rows.sort();
        update
    }
}

fn diff_section(
    old: &[SlotId],
    old_section: usize,
    new: &[SlotId],
    new_section: usize,
    reloads: &HashSet<SlotId>,
    update: &mut TableUpdate,
) {
    let old_index: HashMap<SlotId, usize> = old.iter().enumerate().map(|(r, s)| (*s, r)).collect();
    let new_index: HashMap<SlotId, usize> = new.iter().enumerate().map(|(r, s)| (*s, r)).collect();

    for (r, slot) in old.iter().enumerate() {
        if !new_index.contains_key(slot) {
            update.deleted_rows.push(IndexPath::new(old_section, r));
        }
    }

    // Surviving rows in new order, as their old positions.
    let survivors: Vec<(usize, usize, SlotId)> = new
        .iter()
        .enumerate()
        .filter_map(|(r, slot)| old_index.get(slot).map(|&from| (from, r, *slot)))
        .collect();
    let stays = longest_increasing_run(&survivors.iter().map(|&(from, _, _)| from).collect::<Vec<_>>());

    for (&(from, to, slot), stays) in survivors.iter().zip(stays) {
        let prior = IndexPath::new(old_section, from);
        let next = IndexPath::new(new_section, to);
        match (stays, reloads.contains(&slot)) {
            (true, false) => {}
            (true, true) => update.reloaded_rows.push(prior),
            (false, false) => update.moved_rows.push((prior, next)),
            (false, true) => {
                update.deleted_rows.push(prior);
                update.inserted_rows.push(next);
            }
        }
    }

    for (r, slot) in new.iter().enumerate() {
        if !old_index.contains_key(slot) {
            update.inserted_rows.push(IndexPath::new(new_section, r));
        }
    }
}

/// Mark the members of one longest strictly increasing subsequence.
fn longest_increasing_run(values: &[usize]) -> Vec<bool> {
    // tails[k] is the index of the smallest tail of a run of length k + 1.
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; values.len()];
    for (i, &value) in values.iter().enumerate() {
        let k = tails.partition_point(|&t| values[t] < value);
        previous[i] = k.checked_sub(1).map(|p| tails[p]);
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }

    let mut members = vec![false; values.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        members[i] = true;
        cursor = previous[i];
    }
    members
}
