//! Asynchronous fetch gateway.
//!
//! Issues at most one request at a time per screen, stamps every request
//! with a generation, and marshals results back to the controller task over
//! a channel. A response whose generation no longer matches the gateway's
//! current one belongs to a superseded request and is dropped by the
//! controller at callback time; a slow stale response can therefore never
//! overwrite fresh state.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use listcore::{BatchState, CursorToken, QueryContext};
use log::debug;
use rand::Rng;
use tokio::sync::mpsc;

use crate::error::FetchError;
use crate::source::{DataSource, Page};

/// Client-side predicate refining raw search pages: item + query string.
pub type SearchFilter<I> = Arc<dyn Fn(&I, &str) -> bool + Send + Sync>;

/// Outcome of a completed batch round-trip.
#[derive(Debug)]
pub(crate) struct BatchOutcome<I> {
    /// Filtered, merged items, flushed atomically rather than incrementally.
    pub items: Vec<I>,
    pub next_cursor: Option<CursorToken>,
    pub has_more: bool,
    /// The retry budget ran out with nothing matched; the caller should
    /// stop auto-retrying and show the (empty) result.
    pub retries_exhausted: bool,
}

#[derive(Debug)]
pub(crate) enum GatewayEvent<I> {
    Page {
        generation: u64,
        context: QueryContext,
        result: Result<Page<I>, FetchError>,
    },
    Batch {
        generation: u64,
        context: QueryContext,
        result: Result<BatchOutcome<I>, FetchError>,
    },
}

pub(crate) struct FetchGateway<S: DataSource> {
    source: Arc<S>,
    tx: mpsc::UnboundedSender<GatewayEvent<S::Item>>,
    generation: u64,
}

impl<S: DataSource> FetchGateway<S> {
    pub(crate) fn new(source: Arc<S>, tx: mpsc::UnboundedSender<GatewayEvent<S::Item>>) -> Self {
        Self {
            source,
            tx,
            generation: 0,
        }
    }

    /// Whether a response generation is still the live one.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Invalidates any in-flight request without issuing a new one. Its
    /// eventual response will fail the generation check and be ignored.
    pub(crate) fn supersede(&mut self) {
        self.generation += 1;
    }

    /// Issues a single-page fetch, superseding any in-flight request.
    pub(crate) fn begin_page(
        &mut self,
        context: QueryContext,
        cursor: Option<CursorToken>,
        limit: usize,
    ) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        let source = self.source.clone();
        let tx = self.tx.clone();
        debug!(target: "Gateway/Fetch", "fetch gen={generation} ctx={context} limit={limit}");
        tokio::spawn(async move {
            let result = source.fetch(&context, cursor.as_ref(), limit).await;
            // A closed channel means the screen is gone; nothing to deliver.
            let _ = tx.send(GatewayEvent::Page {
                generation,
                context,
                result,
            });
        });
        generation
    }

    /// Issues a filtered batch load: merge several pages, filter client-side
    /// and auto-retry (bounded, jittered) while the filter matches nothing
    /// but more pages exist. Supersedes any in-flight request.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn begin_batch(
        &mut self,
        context: QueryContext,
        cursor: Option<CursorToken>,
        limit: usize,
        pages: u32,
        retry_cap: u32,
        jitter_ms: RangeInclusive<u64>,
        filter: SearchFilter<S::Item>,
    ) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        let source = self.source.clone();
        let tx = self.tx.clone();
        debug!(target: "Gateway/Fetch", "batch gen={generation} ctx={context} pages={pages}");
        tokio::spawn(async move {
            let result =
                run_batch(&*source, &context, cursor, limit, pages, retry_cap, jitter_ms, filter)
                    .await;
            let _ = tx.send(GatewayEvent::Batch {
                generation,
                context,
                result,
            });
        });
        generation
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_batch<S: DataSource>(
    source: &S,
    context: &QueryContext,
    mut cursor: Option<CursorToken>,
    limit: usize,
    pages: u32,
    retry_cap: u32,
    jitter_ms: RangeInclusive<u64>,
    filter: SearchFilter<S::Item>,
) -> Result<BatchOutcome<S::Item>, FetchError> {
    let query = context.query().unwrap_or_default().to_string();
    let mut batch = BatchState::new(pages, retry_cap);
    let mut has_more = true;

    loop {
        // One round: merge up to `pages` chunks into the accumulation
        // buffer. Nothing is exposed until the round completes.
        loop {
            let page = source.fetch(context, cursor.as_ref(), limit).await?;
            cursor = page.next_cursor;
            has_more = page.has_more;
            let wants_more = batch.absorb(page.items);
            if !wants_more || !has_more {
                break;
            }
        }

        let matched: Vec<S::Item> = batch
            .flush()
            .into_iter()
            .filter(|item| filter(item, &query))
            .collect();

        if matched.is_empty() && has_more && batch.can_retry() {
            batch.retry();
            debug!(
                target: "Gateway/Fetch",
                "filtered round empty, retry {} for ctx={context}", batch.retries_used()
            );
            let delay = rand::rng().random_range(jitter_ms.clone());
            tokio::time::sleep(Duration::from_millis(delay)).await;
            continue;
        }

        let retries_exhausted = matched.is_empty() && has_more && !batch.can_retry();
        return Ok(BatchOutcome {
            items: matched,
            next_cursor: cursor,
            has_more,
            retries_exhausted,
        });
    }
}
