//! Failure taxonomy at the fetch-gateway boundary.
//!
//! Every failure from the data collaborator is converted into one of these
//! before it reaches the controller; nothing escapes into the display layer
//! as an unhandled error. Stale responses are not represented here at all:
//! they are a normal race outcome, detected by generation comparison and
//! dropped silently.

use thiserror::Error;

/// Errors surfaced by [`crate::source::DataSource::fetch`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network/server failure. The load phase reverts to its pre-fetch
    /// "more available" flag so the normal scroll or refresh trigger can
    /// retry.
    #[error("transient fetch failure: {message}")]
    Transient { message: String },
    #[error("fetch timed out")]
    Timeout,
    /// The collaborator dropped the request (connection teardown, logout).
    #[error("fetch cancelled by the data source")]
    Cancelled,
}

/// Errors returned by [`crate::controller::ControllerHandle`] queries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// The controller task has exited (screen destroyed).
    #[error("controller task has stopped")]
    Stopped,
}
