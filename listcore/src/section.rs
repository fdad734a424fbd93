//! Contiguous, labeled runs of items sharing a group key.

use crate::item::ListItem;

/// A contiguous run of items with the same group key.
///
/// Invariants maintained by this module: sections are contiguous,
/// non-overlapping, ordered with the flat sequence, never empty, and two
/// adjacent sections never share a key (they would have been merged).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<G> {
    pub key: G,
    pub start: usize,
    pub len: usize,
}

impl<G> Section<G> {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos < self.end()
    }
}

/// Rebuilds the full section list for a flat item sequence.
pub fn build_sections<I: ListItem>(items: &[I]) -> Vec<Section<I::Group>> {
    let mut sections: Vec<Section<I::Group>> = Vec::new();
    for (pos, item) in items.iter().enumerate() {
        match sections.last_mut() {
            Some(last) if last.key == item.group() => last.len += 1,
            _ => sections.push(Section {
                key: item.group(),
                start: pos,
                len: 1,
            }),
        }
    }
    sections
}

/// Adjusts sections for a single-item removal at `pos`: shrinks the owning
/// section, shifts later starts down, drops it if empty and merges the
/// neighbors it separated.
pub(crate) fn remove_at<G: Eq + Clone>(sections: &mut Vec<Section<G>>, pos: usize) {
    let Some(idx) = sections.iter().position(|s| s.contains(pos)) else {
        return;
    };
    sections[idx].len -= 1;
    for s in &mut sections[idx + 1..] {
        s.start -= 1;
    }
    if sections[idx].len == 0 {
        sections.remove(idx);
        // The removed run may have been the only separator between two runs
        // of the same key.
        if idx > 0
            && idx < sections.len()
            && sections[idx - 1].key == sections[idx].key
        {
            let absorbed = sections.remove(idx);
            sections[idx - 1].len += absorbed.len;
        }
    }
}

/// Adjusts sections for a single-item insertion of group `key` at `pos`:
/// grows a matching run, splits a foreign one, or starts a new run at a
/// boundary. Later starts shift up by one.
pub(crate) fn insert_at<G: Eq + Clone>(sections: &mut Vec<Section<G>>, pos: usize, key: G) {
    // Strictly inside an existing run.
    if let Some(idx) = sections.iter().position(|s| s.start < pos && pos < s.end()) {
        if sections[idx].key == key {
            sections[idx].len += 1;
            shift_up(&mut sections[idx + 1..]);
        } else {
            // Split the foreign run around the new item.
            let right = Section {
                key: sections[idx].key.clone(),
                start: pos + 1,
                len: sections[idx].end() - pos,
            };
            sections[idx].len = pos - sections[idx].start;
            sections.insert(idx + 1, Section { key, start: pos, len: 1 });
            sections.insert(idx + 2, right);
            shift_up(&mut sections[idx + 3..]);
        }
        return;
    }

    // `pos` sits on a run boundary (possibly 0 or the total length).
    // `idx_after` is the first section starting at or after `pos`; the
    // preceding section, if any, ends exactly at `pos`.
    let idx_after = sections
        .iter()
        .position(|s| s.start >= pos)
        .unwrap_or(sections.len());

    if idx_after > 0 && sections[idx_after - 1].key == key {
        sections[idx_after - 1].len += 1;
        shift_up(&mut sections[idx_after..]);
    } else if idx_after < sections.len() && sections[idx_after].key == key {
        // The following run keeps its start; it just grows downward.
        sections[idx_after].len += 1;
        shift_up(&mut sections[idx_after + 1..]);
    } else {
        sections.insert(idx_after, Section { key, start: pos, len: 1 });
        shift_up(&mut sections[idx_after + 1..]);
    }
}

fn shift_up<G>(sections: &mut [Section<G>]) {
    for s in sections {
        s.start += 1;
    }
}

/// Debug check: sections exactly tile `[0, total)` with no empty runs and no
/// equal-key neighbors.
pub(crate) fn check_cover<G: Eq>(sections: &[Section<G>], total: usize) -> bool {
    let mut expected = 0usize;
    for (i, s) in sections.iter().enumerate() {
        if s.start != expected || s.len == 0 {
            return false;
        }
        if i > 0 && sections[i - 1].key == s.key {
            return false;
        }
        expected = s.end();
    }
    expected == total
}
