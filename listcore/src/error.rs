//! Error types for the core model and paging state machine.

use thiserror::Error;

/// Errors raised when applying a malformed patch to a [`crate::ListModel`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("patch operations out of phase order at op {index}")]
    PhaseOrder { index: usize },
    #[error("removal indices must be strictly descending at op {index}")]
    RemovalOrder { index: usize },
    #[error("insertion indices must be strictly ascending at op {index}")]
    InsertionOrder { index: usize },
    #[error("move with identical source and destination index {at}")]
    NoopMove { at: usize },
    #[error("operation index {index} out of bounds for length {len}")]
    OutOfBounds { index: usize, len: usize },
}

/// Errors raised by the cursor/load-phase state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PagingError {
    /// A cursor issued under one query context was presented under another.
    /// Cursors are only meaningful for the context that produced them.
    #[error("cursor issued under context '{expected}' used under '{got}'")]
    ContextMismatch { expected: String, got: String },
    /// A load was started while another one for the same context was still
    /// in flight.
    #[error("a request is already in flight for this context")]
    AlreadyLoading,
    /// A completion or failure was reported while no load was in flight.
    #[error("no request is in flight for this context")]
    NotLoading,
}
