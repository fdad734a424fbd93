//! Position-to-section resolution with a scroll-friendly cache.
//!
//! Scroll events fire at high frequency with small position deltas, so the
//! common query is "the same section as last time, or a neighbor". A
//! one-entry cache plus a directional probe gives near-constant time under
//! monotonic scroll without the balanced-tree machinery that section counts
//! in the tens would never justify.

use crate::section::Section;

/// Resolves "which section contains flat position P" against a borrowed
/// section list.
#[derive(Debug, Default, Clone)]
pub struct SectionIndex {
    /// Index into the section list of the last resolved section.
    cached: Option<usize>,
    /// How many times resolution fell back to a scan from the start. Only
    /// meaningful for diagnostics and tests.
    full_scans: u64,
}

impl SectionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the cached entry. Call after a wholesale section rebuild or any
    /// patch application; the cache re-seeds on the next query.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Number of from-the-start scans performed so far.
    pub fn full_scans(&self) -> u64 {
        self.full_scans
    }

    /// Returns the index of the section containing `pos`, or `None` when
    /// `pos` is past the end of the sequence.
    pub fn locate<G>(&mut self, sections: &[Section<G>], pos: usize) -> Option<usize> {
        if let Some(ci) = self.cached
            && ci < sections.len()
        {
            let cached = &sections[ci];
            if cached.contains(pos) {
                return Some(ci);
            }
            // Probe in the likely direction from the cached section.
            if pos >= cached.end() {
                for (off, s) in sections[ci + 1..].iter().enumerate() {
                    if s.contains(pos) {
                        self.cached = Some(ci + 1 + off);
                        return self.cached;
                    }
                }
            } else {
                for i in (0..ci).rev() {
                    if sections[i].contains(pos) {
                        self.cached = Some(i);
                        return self.cached;
                    }
                }
            }
            return None;
        }

        self.full_scans += 1;
        for (i, s) in sections.iter().enumerate() {
            if s.contains(pos) {
                self.cached = Some(i);
                return Some(i);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::build_sections;
    use crate::testing::Row;

    fn sections() -> Vec<Section<u32>> {
        // Sections: [0,3) key 1, [3,5) key 2, [5,9) key 3, [9,10) key 4
        let items: Vec<Row> = [(1u32, 3usize), (2, 2), (3, 4), (4, 1)]
            .iter()
            .flat_map(|&(g, n)| (0..n).map(move |i| Row::new((g as u64) * 100 + i as u64, g)))
            .collect();
        build_sections(&items)
    }

    #[test]
    fn resolves_each_position_to_owning_section() {
        let secs = sections();
        let mut index = SectionIndex::new();
        assert_eq!(index.locate(&secs, 0), Some(0));
        assert_eq!(index.locate(&secs, 4), Some(1));
        assert_eq!(index.locate(&secs, 8), Some(2));
        assert_eq!(index.locate(&secs, 9), Some(3));
        assert_eq!(index.locate(&secs, 10), None);
    }

    #[test]
    fn monotonic_scroll_performs_single_full_scan() {
        let secs = sections();
        let mut index = SectionIndex::new();
        for pos in 0..10 {
            assert!(index.locate(&secs, pos).is_some());
        }
        // One scan to seed the cache; every later query is a cache hit or a
        // short forward probe.
        assert_eq!(index.full_scans(), 1);
    }

    #[test]
    fn reverse_scroll_probes_backward_without_full_scans() {
        let secs = sections();
        let mut index = SectionIndex::new();
        assert!(index.locate(&secs, 9).is_some());
        for pos in (0..9).rev() {
            assert!(index.locate(&secs, pos).is_some());
        }
        assert_eq!(index.full_scans(), 1);
    }

    #[test]
    fn invalidate_forces_one_rescan() {
        let secs = sections();
        let mut index = SectionIndex::new();
        assert_eq!(index.locate(&secs, 6), Some(2));
        index.invalidate();
        assert_eq!(index.locate(&secs, 6), Some(2));
        assert_eq!(index.full_scans(), 2);
    }

    #[test]
    fn stale_cache_index_past_shrunk_list_is_ignored() {
        let secs = sections();
        let mut index = SectionIndex::new();
        assert_eq!(index.locate(&secs, 9), Some(3));
        let shorter = &secs[..2];
        // Cached index 3 is out of bounds for the shorter list; the lookup
        // must fall back to a scan rather than touch it.
        assert_eq!(index.locate(shorter, 4), Some(1));
    }
}
