//! Abstract change descriptions handed to the display layer.
//!
//! The model never talks to a UI toolkit directly; it emits these and a thin
//! adapter owned by the display layer translates them into whatever its
//! recycler/list widget expects.

use serde::{Deserialize, Serialize};

/// A single range-level mutation of the flat item sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListChange {
    /// `count` items inserted starting at `start`.
    RangeInserted { start: usize, count: usize },
    /// `count` items removed starting at `start` (indices before removal).
    RangeRemoved { start: usize, count: usize },
    /// `count` items moved from `from` to `to`.
    RangeMoved { from: usize, to: usize, count: usize },
    /// The whole sequence was rebuilt; positions are no longer comparable.
    FullReplace,
    /// The sequence became empty. Distinct from an empty change set so the
    /// display layer can show an empty-state placeholder.
    Cleared,
}

/// An ordered batch of changes produced by one model mutation.
///
/// Changes are already in a safe application order (removals high-to-low,
/// insertions low-to-high, moves last), so a consumer may replay them
/// verbatim without index fixups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    changes: Vec<ListChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: ListChange) {
        self.changes.push(change);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListChange> {
        self.changes.iter()
    }

    pub fn into_vec(self) -> Vec<ListChange> {
        self.changes
    }
}

impl From<Vec<ListChange>> for ChangeSet {
    fn from(changes: Vec<ListChange>) -> Self {
        Self { changes }
    }
}

impl IntoIterator for ChangeSet {
    type Item = ListChange;
    type IntoIter = std::vec::IntoIter<ListChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
