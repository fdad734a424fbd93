//! Async layer of the chatlist engine: the fetch gateway, the per-screen
//! controller task and the boundary trait to the external chat-protocol data
//! collaborator. The synchronous core (model, diff, sections, paging state)
//! lives in the `listcore` crate and is re-exported here.

pub use listcore::{
    ChangeSet, Cursor, CursorToken, DiffOutcome, ListChange, ListItem, ListModel, LoadPhase,
    ModelError, PagingError, QueryContext, Section, SectionIndex,
};

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod gateway;
pub mod source;
pub mod test_utils;

pub use config::ControllerConfig;
pub use controller::{ControllerHandle, spawn};
pub use error::{ControllerError, FetchError};
pub use events::ControllerEvent;
pub use gateway::SearchFilter;
pub use source::{DataSource, Page, SourceUpdate, SubscriptionId, UpdateSender};
