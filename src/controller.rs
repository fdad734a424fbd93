//! The screen controller task.
//!
//! One task per screen, owning the [`ListModel`] exclusively: every mutation
//! and every display notification happens inside its `select!` loop, so the
//! core needs no locking. Fetches run on worker tasks spawned by the
//! gateway and come back over a channel, stamped with a generation that is
//! checked before any state is touched.

use std::sync::Arc;

use listcore::{Cursor, ListItem, ListModel, LoadPhase, QueryContext, Section};
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::config::ControllerConfig;
use crate::error::{ControllerError, FetchError};
use crate::events::ControllerEvent;
use crate::gateway::{BatchOutcome, FetchGateway, GatewayEvent, SearchFilter};
use crate::source::{DataSource, Page, SourceUpdate, SubscriptionId};

enum Command<I: ListItem> {
    ScrollNear,
    QueryChanged(String),
    Refresh,
    Destroy,
    Snapshot(oneshot::Sender<Vec<I>>),
    SectionOf {
        pos: usize,
        reply: oneshot::Sender<Option<Section<I::Group>>>,
    },
}

/// What to do with the items of the response currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inflight {
    /// First load, refresh or context switch: rebuild the model.
    Replace,
    /// Pagination: extend the tail.
    Append,
}

/// Cloneable inbound surface of a controller task. Mirrors the four calls a
/// display layer makes: scroll proximity, query edits, pull-to-refresh and
/// teardown, plus read access for rendering.
pub struct ControllerHandle<I: ListItem> {
    cmd_tx: mpsc::UnboundedSender<Command<I>>,
}

impl<I: ListItem> Clone for ControllerHandle<I> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
        }
    }
}

impl<I: ListItem> ControllerHandle<I> {
    /// The scroll position approached the end of the list.
    pub fn on_scroll_near(&self) {
        let _ = self.cmd_tx.send(Command::ScrollNear);
    }

    /// The search box text changed. Debounced; an empty query returns to
    /// the base listing.
    pub fn on_query_changed(&self, query: impl Into<String>) {
        let _ = self.cmd_tx.send(Command::QueryChanged(query.into()));
    }

    /// Explicit refresh: reload the current context from the top.
    pub fn on_refresh(&self) {
        let _ = self.cmd_tx.send(Command::Refresh);
    }

    /// The screen is going away. Stops the task and releases collaborator
    /// subscriptions.
    pub fn on_destroy(&self) {
        let _ = self.cmd_tx.send(Command::Destroy);
    }

    /// Current item sequence, for rendering.
    pub async fn snapshot(&self) -> Result<Vec<I>, ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Snapshot(tx))
            .map_err(|_| ControllerError::Stopped)?;
        rx.await.map_err(|_| ControllerError::Stopped)
    }

    /// Section owning flat position `pos` ("which letter am I scrolled
    /// to").
    pub async fn section_of(
        &self,
        pos: usize,
    ) -> Result<Option<Section<I::Group>>, ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SectionOf { pos, reply: tx })
            .map_err(|_| ControllerError::Stopped)?;
        rx.await.map_err(|_| ControllerError::Stopped)
    }

    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }
}

/// Spawns a controller task for one screen.
///
/// `filter` is the client-side predicate refining search pages before they
/// are shown. Returns the inbound handle and the outbound event stream the
/// display layer drains.
pub fn spawn<S: DataSource>(
    source: Arc<S>,
    config: ControllerConfig,
    filter: SearchFilter<S::Item>,
) -> (
    ControllerHandle<S::Item>,
    mpsc::UnboundedReceiver<ControllerEvent>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (gw_tx, gw_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();

    let subscription = source.subscribe(update_tx);
    let controller = Controller {
        model: ListModel::new(),
        context: QueryContext::Base,
        phase: LoadPhase::initial(),
        cursor: None,
        inflight: None,
        pending_query: None,
        query_deadline: None,
        gateway: FetchGateway::new(source.clone(), gw_tx),
        events: event_tx,
        config,
        filter,
    };
    tokio::spawn(controller.run(source, subscription, cmd_rx, gw_rx, update_rx));

    (ControllerHandle { cmd_tx }, event_rx)
}

struct Controller<S: DataSource> {
    model: ListModel<S::Item>,
    context: QueryContext,
    phase: LoadPhase,
    cursor: Option<Cursor>,
    inflight: Option<Inflight>,
    pending_query: Option<String>,
    query_deadline: Option<Instant>,
    gateway: FetchGateway<S>,
    events: mpsc::UnboundedSender<ControllerEvent>,
    config: ControllerConfig,
    filter: SearchFilter<S::Item>,
}

impl<S: DataSource> Controller<S> {
    async fn run(
        mut self,
        source: Arc<S>,
        subscription: SubscriptionId,
        mut cmd_rx: mpsc::UnboundedReceiver<Command<S::Item>>,
        mut gw_rx: mpsc::UnboundedReceiver<GatewayEvent<S::Item>>,
        mut update_rx: mpsc::UnboundedReceiver<SourceUpdate<S::Item>>,
    ) {
        // Runs whenever the task exits, so the collaborator never keeps
        // pushing updates at a destroyed screen.
        let _teardown = scopeguard::guard((source, subscription), |(source, id)| {
            source.unsubscribe(id);
        });

        self.begin_initial_load();

        loop {
            let deadline = self.query_deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    None | Some(Command::Destroy) => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                Some(event) = gw_rx.recv() => self.handle_gateway(event),
                Some(update) = update_rx.recv() => self.handle_update(update),
                _ = time::sleep_until(deadline), if self.query_deadline.is_some() => {
                    self.commit_query();
                }
            }
        }
        debug!(target: "Controller/Loop", "screen destroyed, loop exiting");
    }

    fn handle_command(&mut self, cmd: Command<S::Item>) {
        match cmd {
            Command::ScrollNear => self.maybe_load_more(),
            Command::QueryChanged(query) => {
                self.pending_query = Some(query);
                self.query_deadline = Some(Instant::now() + self.config.query_debounce);
            }
            Command::Refresh => self.begin_refresh(),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.model.items().to_vec());
            }
            Command::SectionOf { pos, reply } => {
                let _ = reply.send(self.model.section_of(pos).cloned());
            }
            // Handled by the loop before dispatch.
            Command::Destroy => {}
        }
    }

    fn begin_initial_load(&mut self) {
        let Ok(next) = self.phase.begin() else { return };
        self.phase = next;
        self.inflight = Some(Inflight::Replace);
        self.gateway
            .begin_page(self.context.clone(), None, self.config.page_size);
        self.emit(ControllerEvent::LoadingChanged(self.phase));
    }

    /// Scroll proximity: load the next chunk if one is available and
    /// nothing is in flight.
    fn maybe_load_more(&mut self) {
        if !self.phase.can_load_more() {
            return;
        }
        let token = match &self.cursor {
            Some(cursor) => match cursor.token_for(&self.context) {
                Ok(token) => Some(token.clone()),
                Err(e) => {
                    // A cursor from another context is never continued from;
                    // restart this context from the top instead.
                    warn!(target: "Controller/Loop", "resetting cursor: {e}");
                    None
                }
            },
            None => None,
        };
        let Ok(next) = self.phase.begin() else { return };
        self.phase = next;
        self.inflight = Some(if token.is_some() && !self.model.is_empty() {
            Inflight::Append
        } else {
            Inflight::Replace
        });
        self.begin_fetch(token);
        self.emit(ControllerEvent::LoadingChanged(self.phase));
    }

    /// Reload the current context from the top, superseding anything in
    /// flight.
    fn begin_refresh(&mut self) {
        self.gateway.supersede();
        self.cursor = None;
        self.inflight = Some(Inflight::Replace);
        self.phase = match LoadPhase::initial().begin() {
            Ok(phase) => phase,
            Err(_) => return,
        };
        self.begin_fetch(None);
        self.emit(ControllerEvent::LoadingChanged(self.phase));
    }

    fn begin_fetch(&mut self, token: Option<listcore::CursorToken>) {
        if self.context.is_search() {
            self.gateway.begin_batch(
                self.context.clone(),
                token,
                self.config.page_size,
                self.config.batch_pages,
                self.config.max_filter_retries,
                self.config.retry_jitter_ms.clone(),
                self.filter.clone(),
            );
        } else {
            self.gateway
                .begin_page(self.context.clone(), token, self.config.page_size);
        }
    }

    /// The debounce window elapsed: switch query context if it changed.
    fn commit_query(&mut self) {
        self.query_deadline = None;
        let Some(query) = self.pending_query.take() else {
            return;
        };
        let target = if query.trim().is_empty() {
            QueryContext::Base
        } else {
            QueryContext::Search(query)
        };
        if target == self.context {
            return;
        }
        info!(target: "Controller/Loop", "query context -> {target}");
        self.context = target;
        self.begin_refresh();
    }

    fn handle_gateway(&mut self, event: GatewayEvent<S::Item>) {
        match event {
            GatewayEvent::Page {
                generation,
                context,
                result,
            } => {
                if !self.accept(generation, &context) {
                    return;
                }
                match result {
                    Ok(page) => self.on_page(page),
                    Err(e) => self.on_fetch_failed(e),
                }
            }
            GatewayEvent::Batch {
                generation,
                context,
                result,
            } => {
                if !self.accept(generation, &context) {
                    return;
                }
                match result {
                    Ok(outcome) => self.on_batch(outcome),
                    Err(e) => self.on_fetch_failed(e),
                }
            }
        }
    }

    /// Generation gate: a response from a superseded request, or one issued
    /// under a context that is no longer current, must not touch any state.
    fn accept(&self, generation: u64, context: &QueryContext) -> bool {
        if !self.gateway.is_current(generation) {
            debug!(
                target: "Controller/Loop",
                "dropping stale response gen={generation} ctx={context}"
            );
            return false;
        }
        if *context != self.context {
            debug!(target: "Controller/Loop", "dropping response for foreign ctx={context}");
            return false;
        }
        true
    }

    fn on_page(&mut self, page: Page<S::Item>) {
        self.cursor = page
            .next_cursor
            .map(|token| Cursor::new(token, self.context.clone()));
        if let Ok(next) = self.phase.complete(page.has_more) {
            self.phase = next;
        }
        let changes = match self.inflight.take() {
            Some(Inflight::Append) => self.model.append(page.items),
            _ => self.model.replace(page.items),
        };
        self.emit_changes(changes);
        self.emit(ControllerEvent::LoadingChanged(self.phase));
    }

    fn on_batch(&mut self, outcome: BatchOutcome<S::Item>) {
        // A spent retry budget parks the context as exhausted: the user sees
        // the best available (possibly empty) result instead of an endless
        // spinner, and no further auto-retry fires.
        let has_more = outcome.has_more && !outcome.retries_exhausted;
        self.cursor = if has_more {
            outcome
                .next_cursor
                .map(|token| Cursor::new(token, self.context.clone()))
        } else {
            None
        };
        if let Ok(next) = self.phase.complete(has_more) {
            self.phase = next;
        }
        let empty_result = outcome.items.is_empty();
        let changes = match self.inflight.take() {
            Some(Inflight::Append) => self.model.append(outcome.items),
            _ => self.model.replace(outcome.items),
        };
        self.emit_changes(changes);
        if empty_result && self.model.is_empty() {
            self.emit(ControllerEvent::NoResults);
        }
        self.emit(ControllerEvent::LoadingChanged(self.phase));
    }

    fn on_fetch_failed(&mut self, error: FetchError) {
        warn!(target: "Controller/Loop", "fetch failed for ctx={}: {error}", self.context);
        self.inflight = None;
        if let Ok(next) = self.phase.fail() {
            self.phase = next;
        }
        self.emit(ControllerEvent::LoadFailed {
            notice: error.to_string(),
        });
        self.emit(ControllerEvent::LoadingChanged(self.phase));
    }

    fn handle_update(&mut self, update: SourceUpdate<S::Item>) {
        match update {
            SourceUpdate::Snapshot(items) => {
                if self.context.is_search() {
                    // Search results stay stable while the user is looking
                    // at them; the base listing refreshes on return.
                    debug!(target: "Controller/Loop", "ignoring push update during search");
                    return;
                }
                if self.phase.is_loading() {
                    // The in-flight page was computed against a collection
                    // that just changed under it; drop it.
                    self.gateway.supersede();
                    self.inflight = None;
                    if let Ok(next) = self.phase.fail() {
                        self.phase = next;
                    }
                    self.emit(ControllerEvent::LoadingChanged(self.phase));
                }
                let changes = self.model.reconcile(items);
                self.emit_changes(changes);
            }
        }
    }

    fn emit_changes(&mut self, changes: listcore::ChangeSet) {
        for change in changes {
            self.emit(change.into());
        }
    }

    fn emit(&mut self, event: ControllerEvent) {
        // A gone display layer is not an error; the task winds down via its
        // command channel instead.
        let _ = self.events.send(event);
    }
}
