//! Platform-independent core for incremental, section-aware list
//! synchronization.
//!
//! Everything in this crate is synchronous and I/O-free: an owned ordered
//! sequence of items ([`model::ListModel`]), the diff engine that reconciles
//! it against freshly fetched snapshots ([`diff`]), the section bookkeeping
//! ([`section`], [`index`]) and the cursor/load-phase state machine
//! ([`paging`]). The async fetch layer lives in the `chatlist` crate and is
//! the only writer of these structures, so nothing here needs locking.

pub mod changes;
pub mod diff;
pub mod error;
pub mod index;
pub mod item;
pub mod model;
pub mod paging;
pub mod patch;
pub mod section;

pub use changes::{ChangeSet, ListChange};
pub use diff::{DiffOutcome, diff};
pub use error::{ModelError, PagingError};
pub use index::SectionIndex;
pub use item::ListItem;
pub use model::ListModel;
pub use paging::{BatchState, Cursor, CursorToken, LoadPhase, QueryContext};
pub use patch::{Patch, PatchOp};
pub use section::Section;

#[cfg(test)]
pub(crate) mod testing {
    use crate::item::ListItem;

    /// Minimal item used across the unit tests: a numeric id grouped by an
    /// integer section key, with a payload string to observe in-place updates.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Row {
        pub id: u64,
        pub group: u32,
        pub payload: String,
    }

    impl Row {
        pub fn new(id: u64, group: u32) -> Self {
            Self {
                id,
                group,
                payload: format!("row-{id}"),
            }
        }
    }

    impl ListItem for Row {
        type Id = u64;
        type Group = u32;

        fn id(&self) -> u64 {
            self.id
        }

        fn group(&self) -> u32 {
            self.group
        }
    }
}
