//! The boundary to the external chat-protocol data collaborator.
//!
//! Everything behind [`DataSource`] is a black box: an async request/response
//! surface plus a push-style update stream. The raw protocol shape never
//! crosses this boundary; fetches come back as a tagged `Page`-or-error and
//! pushes as [`SourceUpdate`] values.

use async_trait::async_trait;
use listcore::{CursorToken, ListItem, QueryContext};
use tokio::sync::mpsc;

use crate::error::FetchError;

/// One fetched chunk of the backing collection.
#[derive(Debug, Clone)]
pub struct Page<I> {
    pub items: Vec<I>,
    /// Continuation marker for the next chunk, if the source supplied one.
    pub next_cursor: Option<CursorToken>,
    pub has_more: bool,
}

impl<I> Page<I> {
    /// An empty terminal page.
    pub fn end() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }
}

/// Handle identifying one push-update subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A push-style update from the collaborator about the watched collection.
#[derive(Debug, Clone)]
pub enum SourceUpdate<I> {
    /// The collection's new full ordering. The controller reconciles it
    /// incrementally against the current model.
    Snapshot(Vec<I>),
}

pub type UpdateSender<I> = mpsc::UnboundedSender<SourceUpdate<I>>;

/// Async request/response + push-update source backing one screen's list.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    type Item: ListItem<Id: Send + Sync + 'static, Group: Send + Sync + 'static>
        + Clone
        + Send
        + Sync
        + 'static;

    /// Fetches one chunk for `context`, continuing after `cursor` when given.
    async fn fetch(
        &self,
        context: &QueryContext,
        cursor: Option<&CursorToken>,
        limit: usize,
    ) -> Result<Page<Self::Item>, FetchError>;

    /// Registers for push updates. The returned id must be passed back to
    /// [`DataSource::unsubscribe`] during screen teardown.
    fn subscribe(&self, tx: UpdateSender<Self::Item>) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}
