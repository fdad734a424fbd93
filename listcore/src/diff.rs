//! Identity-sequence diffing.
//!
//! Operates on item identities only; payload refresh for unmoved items is a
//! separate in-place concern handled by the model. The common pagination
//! cases (append-only, delete-only) are detected up front and bypass the
//! general reconciliation entirely.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use log::warn;

use crate::patch::{Patch, PatchOp};

/// Result of reconciling an old identity sequence against a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    /// Sequences are identical; payloads may still need an in-place refresh.
    Unchanged,
    /// The new sequence is empty. A distinct signal, not a zero-op patch,
    /// so consumers can surface a "became empty" state.
    Cleared,
    /// Incremental reconciliation: removals (descending), insertions
    /// (ascending), then moves.
    Patch(Patch),
    /// The sequences cannot be reconciled incrementally (duplicate identity
    /// or a conflicting position assignment). The caller must fall back to a
    /// full replace. An explicit escape hatch, never silent data loss.
    FullReload,
}

/// Computes the operations transforming `old` into `new`.
pub fn diff<Id: Eq + Hash + Clone + Debug>(old: &[Id], new: &[Id]) -> DiffOutcome {
    // Cheap identical-sequence detection: length and endpoints first, full
    // comparison only when those agree.
    if old.len() == new.len()
        && (old.is_empty()
            || (old.first() == new.first() && old.last() == new.last() && old == new))
    {
        return DiffOutcome::Unchanged;
    }

    if new.is_empty() {
        return DiffOutcome::Cleared;
    }

    let Some(old_pos) = position_map(old) else {
        warn!(target: "ListCore/Diff", "duplicate identity in old sequence, forcing full reload");
        return DiffOutcome::FullReload;
    };
    let Some(new_pos) = position_map(new) else {
        warn!(target: "ListCore/Diff", "duplicate identity in new sequence, forcing full reload");
        return DiffOutcome::FullReload;
    };

    if old.is_empty() {
        let ops = (0..new.len()).map(|index| PatchOp::Insert { index }).collect();
        return DiffOutcome::Patch(Patch::new(ops));
    }

    // Append-only fast path: the old sequence is a strict prefix of the new.
    if new.len() > old.len() && new[..old.len()] == *old {
        let ops = (old.len()..new.len())
            .map(|index| PatchOp::Insert { index })
            .collect();
        return DiffOutcome::Patch(Patch::new(ops));
    }

    // Delete-only fast path: the new sequence is a subsequence of the old
    // with no additions.
    if new.len() < old.len()
        && let Some(ops) = delete_only_ops(old, &new_pos, &old_pos, new)
    {
        return DiffOutcome::Patch(Patch::new(ops));
    }

    general_diff(old, new, &old_pos, &new_pos)
}

/// Maps each identity to its position, or `None` when an identity repeats.
fn position_map<Id: Eq + Hash + Clone>(seq: &[Id]) -> Option<HashMap<Id, usize>> {
    let mut map = HashMap::with_capacity(seq.len());
    for (pos, id) in seq.iter().enumerate() {
        if map.insert(id.clone(), pos).is_some() {
            return None;
        }
    }
    Some(map)
}

fn delete_only_ops<Id: Eq + Hash + Clone>(
    old: &[Id],
    new_pos: &HashMap<Id, usize>,
    old_pos: &HashMap<Id, usize>,
    new: &[Id],
) -> Option<Vec<PatchOp>> {
    // Every new item must come from the old sequence, in preserved order.
    let mut last_old = None;
    for id in new {
        let p = *old_pos.get(id)?;
        if let Some(prev) = last_old
            && p <= prev
        {
            return None;
        }
        last_old = Some(p);
    }
    let mut ops: Vec<PatchOp> = old
        .iter()
        .enumerate()
        .filter(|(_, id)| !new_pos.contains_key(*id))
        .map(|(index, _)| PatchOp::Remove { index })
        .collect();
    ops.reverse();
    Some(ops)
}

/// Removed-then-inserted-then-moved reconciliation over the two sequences.
fn general_diff<Id: Eq + Hash + Clone + Debug>(
    old: &[Id],
    new: &[Id],
    old_pos: &HashMap<Id, usize>,
    new_pos: &HashMap<Id, usize>,
) -> DiffOutcome {
    let mut ops = Vec::new();

    // Phase 1: drop old items absent from the new set, highest index first.
    let mut working: Vec<Id> = Vec::with_capacity(new.len());
    for (index, id) in old.iter().enumerate() {
        if new_pos.contains_key(id) {
            working.push(id.clone());
        } else {
            ops.push(PatchOp::Remove { index });
        }
    }
    ops.reverse();

    // Phase 2: place brand-new items at their final positions, lowest first.
    // Inserting at the final index is always in bounds: every position
    // before it in the new sequence is occupied by an already-inserted item
    // or a kept one.
    for (index, id) in new.iter().enumerate() {
        if !old_pos.contains_key(id) {
            ops.push(PatchOp::Insert { index });
            working.insert(index, id.clone());
        }
    }

    // Phase 3: fix the kept items whose relative order changed. Positions
    // left of the scan point are already final, so the wanted item is always
    // at or after it; failing to find it means a conflicting position
    // assignment and triggers the full-reload escape hatch.
    for pos in 0..new.len() {
        if working[pos] == new[pos] {
            continue;
        }
        let Some(found) = working[pos + 1..].iter().position(|id| *id == new[pos]) else {
            warn!(
                target: "ListCore/Diff",
                "conflicting position for {:?}, forcing full reload", new[pos]
            );
            return DiffOutcome::FullReload;
        };
        let from = pos + 1 + found;
        ops.push(PatchOp::Move { from, to: pos });
        let id = working.remove(from);
        working.insert(pos, id);
    }

    debug_assert_eq!(working, new);
    let patch = Patch::new(ops);
    debug_assert!(patch.validate().is_ok());
    DiffOutcome::Patch(patch)
}
