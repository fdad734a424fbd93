//! Cursors, query contexts and the load-phase state machine.

use serde::{Deserialize, Serialize};

use crate::error::PagingError;

/// The filter/search combination scoping a cursor and its in-flight request.
/// Cursors from one context are meaningless under another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryContext {
    /// The unfiltered base listing.
    Base,
    /// A search listing for the given query string.
    Search(String),
}

impl QueryContext {
    pub fn is_search(&self) -> bool {
        matches!(self, QueryContext::Search(_))
    }

    pub fn query(&self) -> Option<&str> {
        match self {
            QueryContext::Base => None,
            QueryContext::Search(q) => Some(q),
        }
    }
}

impl std::fmt::Display for QueryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryContext::Base => f.write_str("base"),
            QueryContext::Search(q) => write!(f, "search:{q}"),
        }
    }
}

/// Opaque continuation marker for "fetch the next page after this point".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorToken {
    /// Continue after the item with this identity (stringified).
    AfterItem(String),
    /// A remote-supplied continuation string, passed back verbatim.
    Opaque(String),
}

/// A continuation token bound to the context it was issued under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    token: CursorToken,
    context: QueryContext,
}

impl Cursor {
    pub fn new(token: CursorToken, context: QueryContext) -> Self {
        Self { token, context }
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// Returns the token for use under `context`, rejecting cross-context
    /// use instead of silently mixing pagination streams.
    pub fn token_for(&self, context: &QueryContext) -> Result<&CursorToken, PagingError> {
        if self.context == *context {
            Ok(&self.token)
        } else {
            Err(PagingError::ContextMismatch {
                expected: self.context.to_string(),
                got: context.to_string(),
            })
        }
    }
}

/// Per-context fetch phase: `Idle → Loading → Idle{has_more}`, with a failed
/// load reverting to the pre-fetch `has_more` flag so the normal scroll or
/// refresh trigger can retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle { has_more: bool },
    Loading { prev_has_more: bool },
}

impl LoadPhase {
    /// Initial phase: nothing loaded yet, more assumed available.
    pub fn initial() -> Self {
        LoadPhase::Idle { has_more: true }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadPhase::Loading { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, LoadPhase::Idle { has_more: false })
    }

    /// Whether a load-more may be issued right now.
    pub fn can_load_more(&self) -> bool {
        matches!(self, LoadPhase::Idle { has_more: true })
    }

    /// `Idle → Loading`. Starting a second load for the same context is a
    /// caller bug; superseding is handled above this machine by generation
    /// stamping.
    pub fn begin(self) -> Result<LoadPhase, PagingError> {
        match self {
            LoadPhase::Idle { has_more } => Ok(LoadPhase::Loading { prev_has_more: has_more }),
            LoadPhase::Loading { .. } => Err(PagingError::AlreadyLoading),
        }
    }

    /// `Loading → Idle` with the fetched page's continuation flag.
    pub fn complete(self, has_more: bool) -> Result<LoadPhase, PagingError> {
        match self {
            LoadPhase::Loading { .. } => Ok(LoadPhase::Idle { has_more }),
            LoadPhase::Idle { .. } => Err(PagingError::NotLoading),
        }
    }

    /// `Loading → Idle` restoring the pre-fetch `has_more` flag.
    pub fn fail(self) -> Result<LoadPhase, PagingError> {
        match self {
            LoadPhase::Loading { prev_has_more } => Ok(LoadPhase::Idle { has_more: prev_has_more }),
            LoadPhase::Idle { .. } => Err(PagingError::NotLoading),
        }
    }
}

/// Accumulation state for filtered deep search: several pages are loaded and
/// merged before the client-side filter runs, and the whole batch is flushed
/// atomically so a half-merged view is never shown. When the filtered result
/// is empty but more pages exist, the batch restarts up to a hard retry cap.
#[derive(Debug)]
pub struct BatchState<T> {
    pages_remaining: u32,
    pages_per_round: u32,
    retries_used: u32,
    retry_cap: u32,
    buffer: Vec<T>,
}

impl<T> BatchState<T> {
    pub fn new(pages_per_round: u32, retry_cap: u32) -> Self {
        Self {
            pages_remaining: pages_per_round,
            pages_per_round,
            retries_used: 0,
            retry_cap,
            buffer: Vec::new(),
        }
    }

    pub fn retries_used(&self) -> u32 {
        self.retries_used
    }

    /// Absorbs one fetched page. Returns `true` while more pages are wanted
    /// in the current round.
    pub fn absorb(&mut self, items: Vec<T>) -> bool {
        self.buffer.extend(items);
        self.pages_remaining = self.pages_remaining.saturating_sub(1);
        self.pages_remaining > 0
    }

    /// Whether another round may start after an empty filtered result.
    pub fn can_retry(&self) -> bool {
        self.retries_used < self.retry_cap
    }

    /// Starts a new round, dropping the (filtered-empty) buffer.
    pub fn retry(&mut self) {
        debug_assert!(self.can_retry());
        self.retries_used += 1;
        self.pages_remaining = self.pages_per_round;
        self.buffer.clear();
    }

    /// Atomically takes the merged buffer once the batch completes.
    pub fn flush(&mut self) -> Vec<T> {
        std::mem::take(&mut self.buffer)
    }
}
