// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Poll reconciler: periodic fetch of the authoritative conversation list.
//!
//! Cooperative scheduling: the timer re-arms only after the previous tick's
//! network call has resolved, and caller-driven ticks (filter changes) share
//! a gate with the loop, so cycles never overlap. Polling suspends while
//! the tab is hidden; regaining visibility cancels the pending timer, fires
//! one immediate tick, and resumes the normal cadence. A tick already in
//! flight when the tab hides runs to completion -- it is simply not
//! re-armed.
//!
//! Before overwriting any record the reconciler consults the send queue's
//! busy-set: conversations with pending or in-flight sends keep their local
//! record, making the send queue manager the single writer for them until
//! their queue drains.

use std::sync::Arc;
use std::time::Duration;

use deskwire_core::traits::ConversationApi;
use deskwire_core::types::ConversationQuery;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::queue::SendQueue;
use crate::selection::SelectionCoordinator;
use crate::store::{ConversationStore, SnapshotOutcome};

/// Document/tab visibility as reported by the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Periodically merges server snapshots into the conversation store.
pub struct PollReconciler {
    api: Arc<dyn ConversationApi>,
    store: Arc<ConversationStore>,
    queue: Arc<SendQueue>,
    selection: Arc<SelectionCoordinator>,
    interval: Duration,
    query: Mutex<ConversationQuery>,
    visibility: watch::Receiver<Visibility>,
    /// Serializes cycles: a caller-driven tick and the loop's scheduled tick
    /// must not interleave their fetch-then-merge sections.
    tick_gate: Mutex<()>,
    /// Transient error indicator; set on a failed tick, cleared on the next
    /// successful one.
    last_error: Mutex<Option<String>>,
}

impl PollReconciler {
    pub fn new(
        api: Arc<dyn ConversationApi>,
        store: Arc<ConversationStore>,
        queue: Arc<SendQueue>,
        selection: Arc<SelectionCoordinator>,
        interval: Duration,
        query: ConversationQuery,
        visibility: watch::Receiver<Visibility>,
    ) -> Self {
        Self {
            api,
            store,
            queue,
            selection,
            interval,
            query: Mutex::new(query),
            visibility,
            tick_gate: Mutex::new(()),
            last_error: Mutex::new(None),
        }
    }

    /// Replaces the list filter used by subsequent ticks.
    pub async fn set_query(&self, query: ConversationQuery) {
        *self.query.lock().await = query;
    }

    pub async fn query(&self) -> ConversationQuery {
        self.query.lock().await.clone()
    }

    /// The transient poll-failure indicator, if the last tick failed.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Runs one reconciliation cycle. Cycles are serialized through an
    /// internal gate, so a caller-driven tick never overlaps a scheduled one.
    ///
    /// A failed fetch leaves the store untouched for this tick; the next
    /// scheduled tick retries implicitly through the cadence. When the query
    /// carries a search or status filter, the selection is reconciled against
    /// the filtered page so an operator never keeps a thread open that the
    /// list no longer shows.
    pub async fn tick(&self) -> Option<SnapshotOutcome> {
        let _gate = self.tick_gate.lock().await;
        let query = self.query.lock().await.clone();
        match self.api.list_conversations(&query).await {
            Err(e) => {
                warn!(error = %e, "poll tick failed, store left untouched");
                *self.last_error.lock().await = Some(e.to_string());
                None
            }
            Ok(page) => {
                let busy = self.queue.busy_ids().await;
                let authoritative =
                    query.is_unfiltered_first_page() && page.items.len() as u64 == page.total;
                let outcome = self.store.apply_snapshot(page, &busy, authoritative).await;
                // Paginated-but-unfiltered pages do not constrain the
                // selection: a thread from another page is still listed.
                if query.search.is_some() || query.status.is_some() {
                    self.selection.apply_filter(&outcome.visible).await;
                }
                *self.last_error.lock().await = None;
                debug!(authoritative, "poll tick applied");
                Some(outcome)
            }
        }
    }

    /// Tick loop. Spawned once by the engine; exits when the visibility
    /// channel closes (engine shutdown).
    pub async fn run(self: Arc<Self>) {
        let mut visibility = self.visibility.clone();
        loop {
            if *visibility.borrow() == Visibility::Hidden {
                // Suspended. The next change can only be a regain, which
                // triggers an immediate tick via the loop head.
                if visibility.changed().await.is_err() {
                    break;
                }
                continue;
            }

            self.tick().await;

            // Fixed spacing measured from tick completion. A visibility
            // change cancels the pending timer: hiding suspends at the loop
            // head, regaining visibility ticks immediately.
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = visibility.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("poll reconciler stopped");
    }
}
