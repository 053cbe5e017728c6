// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The owned synchronization engine instance.
//!
//! [`SyncEngine`] wires the conversation store, send queue manager, poll
//! reconciler, selection coordinator, and blob store into one explicit,
//! injectable object -- no ambient globals, so tests run multiple
//! independent instances side by side.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use deskwire_api::ApiClient;
use deskwire_config::DeskwireConfig;
use deskwire_core::error::DeskwireError;
use deskwire_core::traits::ConversationApi;
use deskwire_core::types::{
    Conversation, ConversationId, ConversationPatch, ConversationQuery, MediaType, MessageId,
};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::poller::{PollReconciler, Visibility};
use crate::queue::SendQueue;
use crate::recorder::AudioRecording;
use crate::selection::{SelectionCoordinator, ViewUpdate};
use crate::sender::SendQueueManager;
use crate::store::ConversationStore;

/// The conversation synchronization engine.
pub struct SyncEngine {
    store: Arc<ConversationStore>,
    queue: Arc<SendQueue>,
    sender: SendQueueManager,
    blobs: Arc<BlobStore>,
    api: Arc<dyn ConversationApi>,
    reconciler: Arc<PollReconciler>,
    selection: Arc<SelectionCoordinator>,
    visibility_tx: watch::Sender<Visibility>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    view_updates_rx: Mutex<Option<mpsc::Receiver<ViewUpdate>>>,
    view_updates_tx: mpsc::Sender<ViewUpdate>,
    /// Viewer preview URLs keyed by `conversation:media` -- a newer fetch for
    /// the same logical resource releases the previous URL.
    viewer_previews: Mutex<HashMap<String, String>>,
}

impl SyncEngine {
    /// Builds an engine talking to the real conversation server.
    pub fn new(config: DeskwireConfig) -> Result<Self, DeskwireError> {
        let api = Arc::new(ApiClient::new(&config.api)?);
        Ok(Self::with_api(config, api))
    }

    /// Builds an engine over any [`ConversationApi`] implementation.
    /// The seam tests use to substitute controllable transports.
    pub fn with_api(config: DeskwireConfig, api: Arc<dyn ConversationApi>) -> Self {
        let store = Arc::new(ConversationStore::new());
        let queue = Arc::new(SendQueue::new());
        let blobs = Arc::new(BlobStore::new());
        let sender = SendQueueManager::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            Arc::clone(&api),
            Arc::clone(&blobs),
        );

        let selection = Arc::new(SelectionCoordinator::new(
            Arc::clone(&store),
            config.ui.bottom_threshold_px,
        ));

        let (visibility_tx, visibility_rx) = watch::channel(Visibility::Visible);
        let reconciler = Arc::new(PollReconciler::new(
            Arc::clone(&api),
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&selection),
            Duration::from_millis(config.poll.interval_ms),
            ConversationQuery {
                limit: config.poll.page_limit,
                ..Default::default()
            },
            visibility_rx,
        ));

        let (view_updates_tx, view_updates_rx) = mpsc::channel(64);

        Self {
            store,
            queue,
            sender,
            blobs,
            api,
            reconciler,
            selection,
            visibility_tx,
            tasks: Mutex::new(Vec::new()),
            view_updates_rx: Mutex::new(Some(view_updates_rx)),
            view_updates_tx,
            viewer_previews: Mutex::new(HashMap::new()),
        }
    }

    /// Starts the poll loop and the selection event wiring.
    pub async fn start(&self) {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            return; // Already started
        }

        let reconciler = Arc::clone(&self.reconciler);
        tasks.push(tokio::spawn(reconciler.run()));

        let selection = Arc::clone(&self.selection);
        let events = self.store.subscribe();
        let out = self.view_updates_tx.clone();
        tasks.push(tokio::spawn(selection.run(events, out)));

        info!("sync engine started");
    }

    /// Stops background tasks. In-flight sends run to completion on their
    /// own pump tasks.
    pub async fn shutdown(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        debug!("sync engine stopped");
    }

    /// Takes the view-update stream. Single consumer; `None` on a second call.
    pub async fn take_view_updates(&self) -> Option<mpsc::Receiver<ViewUpdate>> {
        self.view_updates_rx.lock().await.take()
    }

    /// Reports tab visibility. Hiding suspends polling; regaining visibility
    /// triggers an immediate tick.
    pub fn set_visibility(&self, visibility: Visibility) {
        let _ = self.visibility_tx.send(visibility);
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<SendQueue> {
        &self.queue
    }

    pub fn blobs(&self) -> &Arc<BlobStore> {
        &self.blobs
    }

    pub fn selection(&self) -> &Arc<SelectionCoordinator> {
        &self.selection
    }

    pub fn reconciler(&self) -> &Arc<PollReconciler> {
        &self.reconciler
    }

    /// Enqueues a text send; returns the placeholder's temporary id.
    pub async fn send_text(
        &self,
        conversation_id: ConversationId,
        text: String,
    ) -> Result<MessageId, DeskwireError> {
        self.sender.enqueue_text(conversation_id, text).await
    }

    /// Enqueues a media send; returns the placeholder's temporary id.
    pub async fn send_media(
        &self,
        conversation_id: ConversationId,
        data: Vec<u8>,
        media_type: MediaType,
        filename: String,
    ) -> Result<MessageId, DeskwireError> {
        self.sender
            .enqueue_media(conversation_id, data, media_type, filename)
            .await
    }

    /// Starts an audio recording draft.
    pub fn begin_recording(&self) -> AudioRecording {
        AudioRecording::new()
    }

    /// Sends a finished recording as an audio attachment.
    pub async fn send_recording(
        &self,
        conversation_id: ConversationId,
        recording: AudioRecording,
    ) -> Result<MessageId, DeskwireError> {
        let (data, filename) = recording.finish();
        self.send_media(conversation_id, data, MediaType::Audio, filename)
            .await
    }

    /// Applies a partial field replacement (status/tags/read-state).
    ///
    /// Optimistic-then-reconcile, but outside the send queue: the patch is
    /// idempotent, so it is fired single-shot. The patched record is written
    /// immediately; the server echo replaces it. On failure the optimistic
    /// record stands until the next poll tick restores authoritative state.
    pub async fn update_conversation(
        &self,
        conversation_id: ConversationId,
        patch: ConversationPatch,
    ) -> Result<Conversation, DeskwireError> {
        let mut optimistic = self
            .store
            .get(conversation_id)
            .await
            .ok_or(DeskwireError::UnknownConversation(conversation_id.0))?;
        patch.apply_to(&mut optimistic);
        self.store.replace(optimistic).await;

        match self.api.update_conversation(conversation_id, &patch).await {
            Ok(conversation) => {
                self.store.replace(conversation.clone()).await;
                Ok(conversation)
            }
            Err(e) => {
                warn!(
                    conversation = %conversation_id,
                    error = %e,
                    "partial update failed; next poll restores authoritative state"
                );
                Err(e)
            }
        }
    }

    /// Changes the list filter and fetches the filtered list immediately.
    /// The reconciler drops the selection if it left the filtered set.
    pub async fn set_query(&self, query: ConversationQuery) {
        self.reconciler.set_query(query).await;
        self.reconciler.tick().await;
    }

    /// Materializes a viewer preview for a media message.
    ///
    /// A newer fetch for the same `conversation:media` pair releases the
    /// previously issued URL. Fetch failures are isolated to this one
    /// message's viewer.
    pub async fn open_preview(
        &self,
        conversation_id: ConversationId,
        media_id: &str,
    ) -> Result<String, DeskwireError> {
        let data = self.api.fetch_media(conversation_id, media_id).await?;
        let url = self.blobs.create_remote_preview(data).await;

        let key = format!("{conversation_id}:{media_id}");
        let replaced = self.viewer_previews.lock().await.insert(key, url.clone());
        if let Some(old) = replaced {
            if let Err(e) = self.blobs.release(&old).await {
                warn!(error = %e, "stale viewer preview release failed");
            }
        }
        Ok(url)
    }

    /// Releases a viewer preview on dismissal/unmount.
    pub async fn close_preview(
        &self,
        conversation_id: ConversationId,
        media_id: &str,
    ) -> Result<(), DeskwireError> {
        let key = format!("{conversation_id}:{media_id}");
        let url = self
            .viewer_previews
            .lock()
            .await
            .remove(&key)
            .ok_or_else(|| DeskwireError::Blob(format!("no open preview for {key}")))?;
        self.blobs.release(&url).await
    }
}
