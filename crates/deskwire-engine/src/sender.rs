// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send queue manager: optimistic append and terminal-state resolution.
//!
//! `enqueue_*` synchronously appends a placeholder message (`kind=sending`,
//! temporary id) to the store and a matching queue item to the conversation's
//! FIFO, then returns without touching the network. A per-conversation pump
//! task drains the FIFO one item at a time: on success the server echo
//! replaces the whole conversation record (which supersedes the placeholder),
//! on failure only the matching placeholder is rewritten to a terminal error
//! marker. There is no automatic retry; the operator resubmits, which
//! enqueues a brand-new item.

use std::sync::Arc;

use chrono::Utc;
use deskwire_core::error::DeskwireError;
use deskwire_core::traits::ConversationApi;
use deskwire_core::types::{
    ConversationId, DeliveryStatus, MediaType, Message, MessageId, MessageKind, QueueItem, Role,
    SendOperation,
};
use tracing::{debug, warn};

use crate::blob::BlobStore;
use crate::queue::SendQueue;
use crate::store::ConversationStore;

/// Drives per-conversation outbound sends.
pub struct SendQueueManager {
    queue: Arc<SendQueue>,
    store: Arc<ConversationStore>,
    api: Arc<dyn ConversationApi>,
    blobs: Arc<BlobStore>,
}

impl SendQueueManager {
    pub fn new(
        queue: Arc<SendQueue>,
        store: Arc<ConversationStore>,
        api: Arc<dyn ConversationApi>,
        blobs: Arc<BlobStore>,
    ) -> Self {
        Self {
            queue,
            store,
            api,
            blobs,
        }
    }

    /// Enqueues a text send. Appends the placeholder and queue item
    /// synchronously and returns the temporary message id; the network call
    /// happens on the pump task.
    pub async fn enqueue_text(
        &self,
        conversation_id: ConversationId,
        text: String,
    ) -> Result<MessageId, DeskwireError> {
        if !self.store.contains(conversation_id).await {
            return Err(DeskwireError::UnknownConversation(conversation_id.0));
        }

        let id = MessageId::local();
        let placeholder = Message {
            id: id.clone(),
            role: Role::Assistant,
            kind: MessageKind::Sending,
            content: text.clone(),
            media_ref: None,
            filename: None,
            local_preview_url: None,
            timestamp: Utc::now(),
            delivery_status: DeliveryStatus::Sending,
        };
        self.store
            .append_message(conversation_id, placeholder)
            .await?;

        let was_idle = self
            .queue
            .push(QueueItem {
                id: id.clone(),
                conversation_id,
                operation: SendOperation::Text { text },
            })
            .await;
        debug!(conversation = %conversation_id, message = %id, was_idle, "text send enqueued");
        if was_idle {
            self.spawn_pump(conversation_id);
        }
        Ok(id)
    }

    /// Enqueues a media send. Creates the local preview blob first so the
    /// placeholder renders immediately; the blob is released when the queue
    /// item reaches its terminal state.
    pub async fn enqueue_media(
        &self,
        conversation_id: ConversationId,
        data: Vec<u8>,
        media_type: MediaType,
        filename: String,
    ) -> Result<MessageId, DeskwireError> {
        if !self.store.contains(conversation_id).await {
            return Err(DeskwireError::UnknownConversation(conversation_id.0));
        }

        let preview_url = self.blobs.create_local_preview(data.clone()).await;
        let id = MessageId::local();
        let placeholder = Message {
            id: id.clone(),
            role: Role::Assistant,
            kind: MessageKind::Sending,
            content: String::new(),
            media_ref: None,
            filename: Some(filename.clone()),
            local_preview_url: Some(preview_url.clone()),
            timestamp: Utc::now(),
            delivery_status: DeliveryStatus::Sending,
        };
        self.store
            .append_message(conversation_id, placeholder)
            .await?;

        let was_idle = self
            .queue
            .push(QueueItem {
                id: id.clone(),
                conversation_id,
                operation: SendOperation::Media {
                    data,
                    media_type,
                    filename,
                    local_preview_url: Some(preview_url),
                },
            })
            .await;
        debug!(conversation = %conversation_id, message = %id, was_idle, "media send enqueued");
        if was_idle {
            self.spawn_pump(conversation_id);
        }
        Ok(id)
    }

    fn spawn_pump(&self, conversation_id: ConversationId) {
        let queue = Arc::clone(&self.queue);
        let store = Arc::clone(&self.store);
        let api = Arc::clone(&self.api);
        let blobs = Arc::clone(&self.blobs);
        tokio::spawn(Self::pump(queue, store, api, blobs, conversation_id));
    }

    /// Drains one conversation's queue, strictly FIFO, one send in flight.
    ///
    /// Exits when the queue is empty; a later enqueue on an idle conversation
    /// starts a fresh pump. Other conversations' pumps run independently.
    async fn pump(
        queue: Arc<SendQueue>,
        store: Arc<ConversationStore>,
        api: Arc<dyn ConversationApi>,
        blobs: Arc<BlobStore>,
        conversation_id: ConversationId,
    ) {
        loop {
            let Some(item) = queue.begin(conversation_id).await else {
                break;
            };
            debug!(conversation = %conversation_id, message = %item.id, "send in flight");

            let result = match &item.operation {
                SendOperation::Text { text } => api.send_text(conversation_id, text).await,
                SendOperation::Media {
                    data,
                    media_type,
                    filename,
                    ..
                } => {
                    api.send_media(conversation_id, *media_type, filename, data.clone())
                        .await
                }
            };

            // Terminal write. The queue might have grown while the call was
            // in flight; only this item's placeholder is ever touched.
            match result {
                Ok(conversation) => {
                    debug!(conversation = %conversation_id, message = %item.id, "send confirmed");
                    store.replace(conversation).await;
                }
                Err(e) => {
                    warn!(
                        conversation = %conversation_id,
                        message = %item.id,
                        error = %e,
                        "send failed, flagging placeholder"
                    );
                    let failure_text = e.send_failure_text();
                    let found = store
                        .rewrite_message(conversation_id, &item.id, |message| {
                            message.kind = MessageKind::Error;
                            message.delivery_status = DeliveryStatus::Failed;
                            message.content = failure_text;
                            message.local_preview_url = None;
                        })
                        .await;
                    if !found {
                        warn!(
                            conversation = %conversation_id,
                            message = %item.id,
                            "failed placeholder no longer present"
                        );
                    }
                }
            }

            if let Some(url) = item.operation.local_preview_url() {
                if let Err(e) = blobs.release(url).await {
                    warn!(error = %e, "local preview release failed");
                }
            }

            if !queue.finish(conversation_id).await {
                break;
            }
        }
    }
}
