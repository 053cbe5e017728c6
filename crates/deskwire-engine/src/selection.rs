// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Selection and viewport coordination.
//!
//! Keeps the "currently open" conversation pointer consistent with store
//! mutations. Snapshot-origin refreshes pass a staleness guard (`updated_at`
//! not older than what is displayed) before replacing the displayed record --
//! the busy-set rule already prevents most races, the guard closes the
//! remaining window. Send-path writes bypass the guard: local placeholders
//! are stamped with the client clock, and a server echo carrying an earlier
//! server-side timestamp must still render. Scroll anchoring sticks the
//! viewport to the bottom only when the operator was already near it, or
//! when switching threads.

use std::sync::Arc;

use deskwire_core::types::{Conversation, ConversationId};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

use crate::store::{ConversationStore, StoreEvent, WriteOrigin};

/// How the viewport should move after rendering a new thread snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAnchor {
    /// Jump to the newest message.
    Bottom,
    /// Keep the current scroll position (operator is reading history).
    Preserve,
}

/// A re-derived view of the selected conversation, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewUpdate {
    pub conversation: Conversation,
    pub scroll: ScrollAnchor,
}

#[derive(Debug, Default)]
struct SelectionState {
    selected: Option<ConversationId>,
    displayed: Option<Conversation>,
    scroll_top: f64,
    viewport_height: f64,
    content_height: f64,
}

impl SelectionState {
    fn near_bottom(&self, threshold_px: f64) -> bool {
        self.content_height - (self.scroll_top + self.viewport_height) <= threshold_px
    }
}

/// Holds the selected-conversation pointer and derives view updates from
/// store events.
pub struct SelectionCoordinator {
    store: Arc<ConversationStore>,
    state: Mutex<SelectionState>,
    threshold_px: f64,
}

impl SelectionCoordinator {
    pub fn new(store: Arc<ConversationStore>, threshold_px: f64) -> Self {
        Self {
            store,
            state: Mutex::new(SelectionState::default()),
            threshold_px,
        }
    }

    /// Opens a conversation. Switching threads always scrolls to bottom.
    ///
    /// Returns `None` (and clears the selection) when the conversation is not
    /// in the store.
    pub async fn select(&self, id: ConversationId) -> Option<ViewUpdate> {
        let mut state = self.state.lock().await;
        match self.store.get(id).await {
            Some(conversation) => {
                state.selected = Some(id);
                state.displayed = Some(conversation.clone());
                debug!(conversation = %id, "conversation selected");
                Some(ViewUpdate {
                    conversation,
                    scroll: ScrollAnchor::Bottom,
                })
            }
            None => {
                state.selected = None;
                state.displayed = None;
                None
            }
        }
    }

    /// Clears the selection (e.g. the conversation left the filtered list).
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.selected = None;
        state.displayed = None;
    }

    pub async fn selected(&self) -> Option<ConversationId> {
        self.state.lock().await.selected
    }

    /// The record currently rendered, if any.
    pub async fn displayed(&self) -> Option<Conversation> {
        self.state.lock().await.displayed.clone()
    }

    /// Records the viewport geometry ahead of the next render decision.
    pub async fn update_viewport(
        &self,
        scroll_top: f64,
        viewport_height: f64,
        content_height: f64,
    ) {
        let mut state = self.state.lock().await;
        state.scroll_top = scroll_top;
        state.viewport_height = viewport_height;
        state.content_height = content_height;
    }

    /// Drops the selection when the selected conversation is absent from the
    /// current filtered list.
    pub async fn apply_filter(&self, visible: &[ConversationId]) {
        let mut state = self.state.lock().await;
        if let Some(selected) = state.selected
            && !visible.contains(&selected)
        {
            debug!(conversation = %selected, "selection cleared by filter change");
            state.selected = None;
            state.displayed = None;
        }
    }

    /// Re-derives the displayed conversation from a store event.
    ///
    /// Returns a [`ViewUpdate`] when the selected conversation changed and
    /// passed the staleness guard; `None` otherwise.
    pub async fn handle_event(&self, event: &StoreEvent) -> Option<ViewUpdate> {
        match event {
            StoreEvent::Upserted(id, origin) => {
                let mut state = self.state.lock().await;
                if state.selected != Some(*id) {
                    return None;
                }
                let incoming = self.store.get(*id).await?;

                // Staleness guard, snapshot writes only: never let a poll
                // merge move the view backwards in time. Direct writes are
                // authoritative even when the server clock trails the local
                // placeholder timestamp.
                if *origin == WriteOrigin::Snapshot
                    && let Some(ref displayed) = state.displayed
                    && incoming.updated_at < displayed.updated_at
                {
                    trace!(conversation = %id, "stale snapshot update ignored");
                    return None;
                }

                let scroll = if state.near_bottom(self.threshold_px) {
                    ScrollAnchor::Bottom
                } else {
                    ScrollAnchor::Preserve
                };
                state.displayed = Some(incoming.clone());
                Some(ViewUpdate {
                    conversation: incoming,
                    scroll,
                })
            }
            StoreEvent::Removed(id) => {
                let mut state = self.state.lock().await;
                if state.selected == Some(*id) {
                    debug!(conversation = %id, "selected conversation removed");
                    state.selected = None;
                    state.displayed = None;
                }
                None
            }
            StoreEvent::TotalChanged(_) => None,
        }
    }

    /// Event-loop wiring: consumes store events and forwards view updates.
    /// Exits when either channel closes.
    pub async fn run(
        self: Arc<Self>,
        mut events: tokio::sync::broadcast::Receiver<StoreEvent>,
        out: mpsc::Sender<ViewUpdate>,
    ) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(update) = self.handle_event(&event).await {
                        if out.send(update).await.is_err() {
                            break;
                        }
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    // Dropped events only delay a re-derivation; the next
                    // event re-reads current store state.
                    trace!(skipped, "selection event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
