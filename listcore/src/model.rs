//! The authoritative in-memory sequence for one screen state.

use log::warn;

use crate::changes::{ChangeSet, ListChange};
use crate::diff::{DiffOutcome, diff};
use crate::error::ModelError;
use crate::index::SectionIndex;
use crate::item::ListItem;
use crate::patch::{Patch, PatchOp};
use crate::section::{Section, build_sections, insert_at, remove_at};

/// Ordered item sequence plus derived section boundaries, owned by exactly
/// one screen instance and mutated from a single logical thread of control.
#[derive(Debug)]
pub struct ListModel<I: ListItem> {
    items: Vec<I>,
    sections: Vec<Section<I::Group>>,
    index: SectionIndex,
}

impl<I: ListItem + Clone> ListModel<I> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            sections: Vec::new(),
            index: SectionIndex::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[I] {
        &self.items
    }

    pub fn get(&self, pos: usize) -> Option<&I> {
        self.items.get(pos)
    }

    pub fn sections(&self) -> &[Section<I::Group>] {
        &self.sections
    }

    /// Section containing flat position `pos`, resolved through the cached
    /// index.
    pub fn section_of(&mut self, pos: usize) -> Option<&Section<I::Group>> {
        let idx = self.index.locate(&self.sections, pos)?;
        self.sections.get(idx)
    }

    #[doc(hidden)]
    pub fn section_index(&self) -> &SectionIndex {
        &self.index
    }

    /// Discards the current sequence and rebuilds from scratch. Used for
    /// first load and for filter/query changes.
    ///
    /// Replacing with an identity-and-group-identical sequence refreshes
    /// payloads in place and reports nothing; replacing with an empty
    /// sequence reports the distinct [`ListChange::Cleared`].
    pub fn replace(&mut self, new_items: Vec<I>) -> ChangeSet {
        if self.same_shape(&new_items) {
            self.items = new_items;
            return ChangeSet::new();
        }

        let was_empty = self.items.is_empty();
        self.sections = build_sections(&new_items);
        self.items = new_items;
        self.index.invalidate();

        let mut changes = ChangeSet::new();
        if self.items.is_empty() {
            if !was_empty {
                changes.push(ListChange::Cleared);
            }
        } else {
            changes.push(ListChange::FullReplace);
        }
        changes
    }

    /// Appends a fetched page to the tail, merging the boundary section when
    /// the group key continues. Reports exactly one insertion range.
    pub fn append(&mut self, new_items: Vec<I>) -> ChangeSet {
        if new_items.is_empty() {
            return ChangeSet::new();
        }
        let start = self.items.len();
        let count = new_items.len();

        for (offset, item) in new_items.iter().enumerate() {
            match self.sections.last_mut() {
                Some(last) if last.key == item.group() => last.len += 1,
                _ => self.sections.push(Section {
                    key: item.group(),
                    start: start + offset,
                    len: 1,
                }),
            }
        }
        self.items.extend(new_items);
        debug_assert!(crate::section::check_cover(&self.sections, self.items.len()));

        let mut changes = ChangeSet::new();
        changes.push(ListChange::RangeInserted { start, count });
        changes
    }

    /// Applies a validated patch computed against `new_items`, adjusting
    /// section offsets per operation. Insert indices address `new_items`.
    pub fn apply(&mut self, patch: &Patch, new_items: &[I]) -> Result<ChangeSet, ModelError> {
        patch.validate()?;

        let mut changes: Vec<ListChange> = Vec::new();
        for op in patch.ops() {
            match *op {
                PatchOp::Remove { index } => {
                    if index >= self.items.len() {
                        return Err(ModelError::OutOfBounds {
                            index,
                            len: self.items.len(),
                        });
                    }
                    self.items.remove(index);
                    remove_at(&mut self.sections, index);
                    coalesce_removal(&mut changes, index);
                }
                PatchOp::Insert { index } => {
                    let Some(item) = new_items.get(index) else {
                        return Err(ModelError::OutOfBounds {
                            index,
                            len: new_items.len(),
                        });
                    };
                    if index > self.items.len() {
                        return Err(ModelError::OutOfBounds {
                            index,
                            len: self.items.len(),
                        });
                    }
                    self.items.insert(index, item.clone());
                    insert_at(&mut self.sections, index, item.group());
                    coalesce_insertion(&mut changes, index);
                }
                PatchOp::Move { from, to } => {
                    if from >= self.items.len() || to >= self.items.len() {
                        return Err(ModelError::OutOfBounds {
                            index: from.max(to),
                            len: self.items.len(),
                        });
                    }
                    let item = self.items.remove(from);
                    let group = item.group();
                    remove_at(&mut self.sections, from);
                    self.items.insert(to, item);
                    insert_at(&mut self.sections, to, group);
                    changes.push(ListChange::RangeMoved { from, to, count: 1 });
                }
            }
        }

        self.index.invalidate();
        debug_assert!(crate::section::check_cover(&self.sections, self.items.len()));
        Ok(ChangeSet::from(changes))
    }

    /// Reconciles the model against a freshly fetched snapshot: diffs the
    /// identity sequences and applies the incremental outcome, falling back
    /// to a full replace when the snapshot cannot be reconciled.
    pub fn reconcile(&mut self, new_items: Vec<I>) -> ChangeSet {
        // A kept item whose group key changed would invalidate section
        // bookkeeping under an identity-only diff; that snapshot gets the
        // replace path.
        if self.kept_group_changed(&new_items) {
            warn!(target: "ListCore/Model", "group key changed for a kept item, replacing");
            return self.replace(new_items);
        }

        let old_ids: Vec<I::Id> = self.items.iter().map(|i| i.id()).collect();
        let new_ids: Vec<I::Id> = new_items.iter().map(|i| i.id()).collect();

        match diff(&old_ids, &new_ids) {
            DiffOutcome::Unchanged => {
                self.items = new_items;
                ChangeSet::new()
            }
            DiffOutcome::Cleared => self.replace(new_items),
            DiffOutcome::FullReload => {
                warn!(target: "ListCore/Model", "incremental reconcile not possible, replacing");
                self.replace(new_items)
            }
            DiffOutcome::Patch(patch) => match self.apply(&patch, &new_items) {
                Ok(changes) => {
                    debug_assert!(
                        self.items.iter().map(|i| i.id()).eq(new_items.iter().map(|i| i.id()))
                    );
                    // In-place payload refresh for kept items.
                    self.items = new_items;
                    changes
                }
                Err(e) => {
                    warn!(target: "ListCore/Model", "patch application failed ({e}), replacing");
                    self.replace(new_items)
                }
            },
        }
    }

    /// True when identities and group keys both match positionally.
    fn same_shape(&self, new_items: &[I]) -> bool {
        self.items.len() == new_items.len()
            && self
                .items
                .iter()
                .zip(new_items)
                .all(|(a, b)| a.id() == b.id() && a.group() == b.group())
    }

    fn kept_group_changed(&self, new_items: &[I]) -> bool {
        use std::collections::HashMap;
        let old_groups: HashMap<I::Id, I::Group> =
            self.items.iter().map(|i| (i.id(), i.group())).collect();
        new_items
            .iter()
            .any(|i| old_groups.get(&i.id()).is_some_and(|g| *g != i.group()))
    }
}

/// Folds a removal into the previous change when it extends the same range.
/// Removals arrive highest-index-first, so removing `index` right after
/// removing `index + 1`-adjacent positions means the range grows downward.
fn coalesce_removal(changes: &mut Vec<ListChange>, index: usize) {
    if let Some(ListChange::RangeRemoved { start, count }) = changes.last_mut()
        && index + 1 == *start
    {
        *start = index;
        *count += 1;
        return;
    }
    changes.push(ListChange::RangeRemoved { start: index, count: 1 });
}

/// Folds an insertion into the previous change when it extends the range
/// upward (insertions arrive lowest-index-first).
fn coalesce_insertion(changes: &mut Vec<ListChange>, index: usize) {
    if let Some(ListChange::RangeInserted { start, count }) = changes.last_mut()
        && index == *start + *count
    {
        *count += 1;
        return;
    }
    changes.push(ListChange::RangeInserted { start: index, count: 1 });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::check_cover;
    use crate::testing::Row;

    fn rows(spec: &[(u64, u32)]) -> Vec<Row> {
        spec.iter().map(|&(id, g)| Row::new(id, g)).collect()
    }

    fn sec(key: u32, start: usize, len: usize) -> Section<u32> {
        Section { key, start, len }
    }

    fn ids(model: &ListModel<Row>) -> Vec<u64> {
        model.items().iter().map(|r| r.id).collect()
    }

    #[test]
    fn append_merges_boundary_section_and_reports_one_range() {
        let mut model = ListModel::new();
        model.replace(rows(&[(1, 1), (2, 1), (3, 2)]));

        let changes = model.append(rows(&[(4, 2), (5, 3)]));

        assert_eq!(
            changes.into_vec(),
            vec![ListChange::RangeInserted { start: 3, count: 2 }]
        );
        assert_eq!(
            model.sections(),
            &[sec(1, 0, 2), sec(2, 2, 2), sec(3, 4, 1)]
        );
    }

    #[test]
    fn replace_is_idempotent() {
        let mut model = ListModel::new();
        let first = model.replace(rows(&[(1, 1), (2, 2)]));
        assert_eq!(first.into_vec(), vec![ListChange::FullReplace]);

        let again = model.replace(rows(&[(1, 1), (2, 2)]));
        assert!(again.is_empty());
    }

    #[test]
    fn idempotent_replace_still_refreshes_payloads() {
        let mut model = ListModel::new();
        model.replace(rows(&[(1, 1)]));

        let mut updated = rows(&[(1, 1)]);
        updated[0].payload = "renamed".into();
        let changes = model.replace(updated);

        assert!(changes.is_empty());
        assert_eq!(model.get(0).unwrap().payload, "renamed");
    }

    #[test]
    fn replacing_with_empty_signals_cleared() {
        let mut model = ListModel::new();
        model.replace(rows(&[(1, 1)]));
        let changes = model.replace(Vec::new());
        assert_eq!(changes.into_vec(), vec![ListChange::Cleared]);
        assert!(model.is_empty());
        assert!(model.sections().is_empty());

        // Replacing an already-empty model with nothing reports nothing.
        let silent = model.replace(Vec::new());
        assert!(silent.is_empty());
    }

    #[test]
    fn apply_adjusts_sections_without_gaps_or_overlaps() {
        let mut model = ListModel::new();
        model.replace(rows(&[(1, 1), (2, 1), (3, 2), (4, 2), (5, 3)]));

        // Remove item 2, insert item 6 (group 2) at the head of the group-2
        // run, move item 5 to the front.
        let new_items = rows(&[(5, 3), (1, 1), (6, 2), (3, 2), (4, 2)]);
        let changes = model.reconcile(new_items.clone());

        assert_eq!(ids(&model), vec![5, 1, 6, 3, 4]);
        assert!(check_cover(model.sections(), model.len()));
        assert!(!changes.is_empty());
    }

    #[test]
    fn reconcile_identical_snapshot_reports_nothing() {
        let mut model = ListModel::new();
        model.replace(rows(&[(1, 1), (2, 2)]));
        let changes = model.reconcile(rows(&[(1, 1), (2, 2)]));
        assert!(changes.is_empty());
    }

    #[test]
    fn reconcile_emptied_snapshot_reports_cleared() {
        let mut model = ListModel::new();
        model.replace(rows(&[(1, 1)]));
        let changes = model.reconcile(Vec::new());
        assert_eq!(changes.into_vec(), vec![ListChange::Cleared]);
    }

    #[test]
    fn duplicate_identities_fall_back_to_full_replace() {
        let mut model = ListModel::new();
        model.replace(rows(&[(1, 1), (2, 1)]));
        let changes = model.reconcile(rows(&[(2, 1), (2, 1), (3, 1)]));
        assert_eq!(changes.into_vec(), vec![ListChange::FullReplace]);
        assert_eq!(ids(&model), vec![2, 2, 3]);
    }

    #[test]
    fn kept_item_group_change_falls_back_to_full_replace() {
        let mut model = ListModel::new();
        model.replace(rows(&[(1, 1), (2, 2)]));
        // Item 1 migrates to group 2; identity diff alone cannot express it.
        let changes = model.reconcile(rows(&[(2, 2), (1, 2)]));
        assert_eq!(changes.into_vec(), vec![ListChange::FullReplace]);
        assert!(check_cover(model.sections(), model.len()));
        assert_eq!(model.sections(), &[sec(2, 0, 2)]);
    }

    #[test]
    fn contiguous_removals_coalesce_into_one_range() {
        let mut model = ListModel::new();
        model.replace(rows(&[(1, 1), (2, 1), (3, 1), (4, 1)]));
        let changes = model.reconcile(rows(&[(1, 1), (4, 1)]));
        assert_eq!(
            changes.into_vec(),
            vec![ListChange::RangeRemoved { start: 1, count: 2 }]
        );
    }

    #[test]
    fn sections_match_full_rebuild_after_random_reconciles() {
        let mut model = ListModel::new();
        let mut seed = 0x2545f4914f6cdd1du64;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };
        for round in 0..40u64 {
            let count = next() % 10;
            let mut seen = std::collections::HashSet::new();
            let mut snapshot = Vec::new();
            for _ in 0..count {
                // Group is a stable function of the id so the identity diff
                // path is taken every round.
                let id = next() % 15;
                if seen.insert(id) {
                    snapshot.push(Row::new(id, (id % 4) as u32));
                }
            }
            model.reconcile(snapshot);
            assert_eq!(
                model.sections(),
                build_sections(model.items()).as_slice(),
                "sections diverged from rebuild in round {round}"
            );
            assert!(check_cover(model.sections(), model.len()));
        }
    }
}
