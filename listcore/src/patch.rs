//! Patch operations produced by the diff engine.

use crate::error::ModelError;

/// One list operation. `Insert.index` is both the final position of the item
/// and its index into the new snapshot the patch was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    Insert { index: usize },
    Remove { index: usize },
    Move { from: usize, to: usize },
}

/// An ordered list of operations transforming one identity sequence into
/// another.
///
/// Operation order is an invariant, not a convention: removals come first in
/// strictly descending index order, then insertions in strictly ascending
/// order, then moves. That ordering keeps every index valid at the moment it
/// is applied, with no recomputation between steps. [`Patch::validate`]
/// enforces it; [`crate::ListModel::apply`] refuses unvalidated shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

/// Application phases, in required order.
#[derive(PartialEq, PartialOrd)]
enum Phase {
    Removals,
    Insertions,
    Moves,
}

impl Patch {
    pub fn new(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Checks the phase-ordering invariant.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut phase = Phase::Removals;
        let mut last_removal: Option<usize> = None;
        let mut last_insert: Option<usize> = None;

        for (i, op) in self.ops.iter().enumerate() {
            match *op {
                PatchOp::Remove { index } => {
                    if phase > Phase::Removals {
                        return Err(ModelError::PhaseOrder { index: i });
                    }
                    if let Some(prev) = last_removal
                        && index >= prev
                    {
                        return Err(ModelError::RemovalOrder { index: i });
                    }
                    last_removal = Some(index);
                }
                PatchOp::Insert { index } => {
                    if phase > Phase::Insertions {
                        return Err(ModelError::PhaseOrder { index: i });
                    }
                    phase = Phase::Insertions;
                    if let Some(prev) = last_insert
                        && index <= prev
                    {
                        return Err(ModelError::InsertionOrder { index: i });
                    }
                    last_insert = Some(index);
                }
                PatchOp::Move { from, to } => {
                    phase = Phase::Moves;
                    if from == to {
                        return Err(ModelError::NoopMove { at: i });
                    }
                }
            }
        }
        Ok(())
    }
}
