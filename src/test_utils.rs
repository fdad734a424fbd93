//! Scripted mock data collaborator for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use listcore::{CursorToken, ListItem, QueryContext};

use crate::error::FetchError;
use crate::source::{DataSource, Page, SourceUpdate, SubscriptionId, UpdateSender};

/// Simple item used by the integration tests: numeric id, integer group
/// key, display title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u64,
    pub group: u32,
    pub title: String,
}

impl Row {
    pub fn new(id: u64, group: u32, title: &str) -> Self {
        Self {
            id,
            group,
            title: title.to_string(),
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

/// A [`DataSource`] whose responses are scripted per query context.
///
/// Pages are served in push order; once a context's script is exhausted the
/// source answers with empty terminal pages. Per-context delays simulate a
/// slow collaborator so out-of-order delivery races can be arranged.
#[derive(Default)]
pub struct MockSource {
    pages: Mutex<HashMap<QueryContext, VecDeque<Result<Page<Row>, FetchError>>>>,
    delays: Mutex<HashMap<QueryContext, Duration>>,
    fetch_log: Mutex<Vec<(QueryContext, Option<CursorToken>)>>,
    subscribers: Mutex<HashMap<u64, UpdateSender<Row>>>,
    next_subscription: AtomicU64,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a page for `context`.
    pub fn push_page(&self, context: QueryContext, page: Page<Row>) {
        self.pages
            .lock()
            .expect("pages lock")
            .entry(context)
            .or_default()
            .push_back(Ok(page));
    }

    /// Queues a failure for `context`.
    pub fn push_error(&self, context: QueryContext, error: FetchError) {
        self.pages
            .lock()
            .expect("pages lock")
            .entry(context)
            .or_default()
            .push_back(Err(error));
    }

    /// Every fetch for `context` sleeps this long before answering.
    pub fn set_delay(&self, context: QueryContext, delay: Duration) {
        self.delays.lock().expect("delays lock").insert(context, delay);
    }

    /// All (context, cursor) pairs fetched so far.
    pub fn fetches(&self) -> Vec<(QueryContext, Option<CursorToken>)> {
        self.fetch_log.lock().expect("fetch log lock").clone()
    }

    pub fn fetch_count_for(&self, context: &QueryContext) -> usize {
        self.fetch_log
            .lock()
            .expect("fetch log lock")
            .iter()
            .filter(|(ctx, _)| ctx == context)
            .count()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().expect("subscribers lock").len()
    }

    /// Pushes an update to every live subscriber.
    pub fn emit(&self, update: SourceUpdate<Row>) {
        for tx in self.subscribers.lock().expect("subscribers lock").values() {
            let _ = tx.send(update.clone());
        }
    }
}

/// Builds a page of rows `[first, first + count)` in `group`, with an
/// opaque continuation cursor when `has_more`.
pub fn page_of(first: u64, count: u64, group: u32, has_more: bool) -> Page<Row> {
    let items = (first..first + count)
        .map(|id| Row::new(id, group, &format!("row {id}")))
        .collect();
    Page {
        items,
        next_cursor: has_more.then(|| CursorToken::Opaque(format!("after-{}", first + count - 1))),
        has_more,
    }
}

#[async_trait]
impl DataSource for MockSource {
    type Item = Row;

    async fn fetch(
        &self,
        context: &QueryContext,
        cursor: Option<&CursorToken>,
        _limit: usize,
    ) -> Result<Page<Row>, FetchError> {
        self.fetch_log
            .lock()
            .expect("fetch log lock")
            .push((context.clone(), cursor.cloned()));

        let delay = self.delays.lock().expect("delays lock").get(context).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .pages
            .lock()
            .expect("pages lock")
            .get_mut(context)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(result) => result,
            None => Ok(Page::end()),
        }
    }

    fn subscribe(&self, tx: UpdateSender<Row>) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().expect("subscribers lock").insert(id, tx);
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().expect("subscribers lock").remove(&id.0);
    }
}
