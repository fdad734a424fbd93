//! Item identity and grouping.

use std::fmt::Debug;
use std::hash::Hash;

/// A domain record displayed in a synchronized list: a contact, a forum
/// topic, a sticker-set entry.
///
/// The identity must be stable across fetches so the diff engine can match
/// "same logical item, possibly moved" between two snapshots. The group key
/// drives section membership; items sharing a group key that are adjacent in
/// the flat sequence belong to the same [`crate::section::Section`].
pub trait ListItem {
    /// Stable identity, preserved across fetches and reorderings.
    type Id: Eq + Hash + Clone + Debug;
    /// Key deriving section membership (alphabetical letter, topic id,
    /// sticker-set id).
    type Group: Eq + Clone + Debug;

    fn id(&self) -> Self::Id;
    fn group(&self) -> Self::Group;
}
