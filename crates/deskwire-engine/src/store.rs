// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory conversation table, the single source of UI truth.
//!
//! Records are mutated by exactly two writers -- the send queue manager and
//! the poll reconciler. Every mutation runs in one critical section under the
//! table lock, and readers clone whole records under the same lock, so a
//! reader never observes a half-updated conversation. Every mutation emits a
//! [`StoreEvent`] on a broadcast channel consumed by the selection
//! coordinator and the rendering layer; upserts carry their [`WriteOrigin`]
//! because snapshot merges are subject to the view's staleness guard while
//! send-path writes are not.

use std::collections::{HashMap, HashSet};

use deskwire_core::error::DeskwireError;
use deskwire_core::types::{Conversation, ConversationId, ConversationPage, Message, MessageId};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

/// Which writer produced an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// Send path or another direct caller; authoritative for the view.
    Direct,
    /// Poll snapshot merge; the view applies its staleness guard.
    Snapshot,
}

/// Change notification emitted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A conversation record was inserted, replaced, or mutated.
    Upserted(ConversationId, WriteOrigin),
    /// A conversation was removed by authoritative reconciliation.
    Removed(ConversationId),
    /// The server-reported total conversation count changed.
    TotalChanged(u64),
}

/// Result of merging one poll snapshot.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SnapshotOutcome {
    pub applied: usize,
    /// Busy conversations whose server payload was discarded this cycle.
    pub skipped_busy: Vec<ConversationId>,
    pub removed: Vec<ConversationId>,
    /// Every id the snapshot contained, applied or not. Used to reconcile
    /// the selection against the current filtered list.
    pub visible: Vec<ConversationId>,
}

#[derive(Debug, Default)]
struct StoreInner {
    conversations: HashMap<ConversationId, Conversation>,
    total: u64,
}

/// In-memory table of conversations keyed by id.
#[derive(Debug)]
pub struct ConversationStore {
    inner: Mutex<StoreInner>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Mutex::new(StoreInner::default()),
            events,
        }
    }

    /// Subscribes to store change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine; events are best-effort notifications.
        let _ = self.events.send(event);
    }

    pub async fn get(&self, id: ConversationId) -> Option<Conversation> {
        self.inner.lock().await.conversations.get(&id).cloned()
    }

    pub async fn contains(&self, id: ConversationId) -> bool {
        self.inner.lock().await.conversations.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.conversations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Server-reported total across all pages, updated on every snapshot.
    pub async fn total(&self) -> u64 {
        self.inner.lock().await.total
    }

    /// All records, most recently updated first.
    pub async fn list(&self) -> Vec<Conversation> {
        let inner = self.inner.lock().await;
        let mut items: Vec<Conversation> = inner.conversations.values().cloned().collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        items
    }

    /// Replaces (or inserts) a whole conversation record.
    pub async fn replace(&self, conversation: Conversation) {
        let id = conversation.id;
        self.inner.lock().await.conversations.insert(id, conversation);
        self.emit(StoreEvent::Upserted(id, WriteOrigin::Direct));
    }

    /// Removes a conversation record.
    pub async fn remove(&self, id: ConversationId) -> bool {
        let removed = self.inner.lock().await.conversations.remove(&id).is_some();
        if removed {
            self.emit(StoreEvent::Removed(id));
        }
        removed
    }

    /// Appends a message to a conversation's thread.
    ///
    /// Used by the send queue manager for optimistic placeholders. The
    /// record's `updated_at` advances to the message timestamp. The whole
    /// read-modify-write runs under the table lock, so a concurrent terminal
    /// write cannot land in between and be lost.
    pub async fn append_message(
        &self,
        id: ConversationId,
        message: Message,
    ) -> Result<(), DeskwireError> {
        {
            let mut inner = self.inner.lock().await;
            let conversation = inner
                .conversations
                .get_mut(&id)
                .ok_or(DeskwireError::UnknownConversation(id.0))?;
            conversation.updated_at = message.timestamp;
            conversation.thread.push(message);
        }
        self.emit(StoreEvent::Upserted(id, WriteOrigin::Direct));
        Ok(())
    }

    /// Rewrites the single message whose id matches, leaving siblings
    /// untouched. Used to flag a failed placeholder. Atomic under the table
    /// lock like [`append_message`](Self::append_message).
    ///
    /// Returns `false` when the conversation or the message is gone (for
    /// example because a server echo already replaced the thread).
    pub async fn rewrite_message(
        &self,
        id: ConversationId,
        message_id: &MessageId,
        rewrite: impl FnOnce(&mut Message),
    ) -> bool {
        let found = {
            let mut inner = self.inner.lock().await;
            let Some(conversation) = inner.conversations.get_mut(&id) else {
                return false;
            };
            match conversation
                .thread
                .iter_mut()
                .find(|m| &m.id == message_id)
            {
                Some(message) => {
                    rewrite(message);
                    true
                }
                None => false,
            }
        };
        if found {
            self.emit(StoreEvent::Upserted(id, WriteOrigin::Direct));
        }
        found
    }

    /// Merges one poll snapshot.
    ///
    /// Busy conversations keep their local record; the server payload for
    /// them is discarded this cycle (the send queue manager is the single
    /// writer until their queue drains). When `authoritative` is set the
    /// response stands for the full list and local records absent from it are
    /// removed explicitly -- unless busy. The total count is always updated.
    pub async fn apply_snapshot(
        &self,
        page: ConversationPage,
        busy: &HashSet<ConversationId>,
        authoritative: bool,
    ) -> SnapshotOutcome {
        let mut outcome = SnapshotOutcome::default();
        let mut events = Vec::new();

        {
            let mut inner = self.inner.lock().await;
            let snapshot_ids: HashSet<ConversationId> =
                page.items.iter().map(|c| c.id).collect();

            for conversation in page.items {
                outcome.visible.push(conversation.id);
                if busy.contains(&conversation.id) {
                    outcome.skipped_busy.push(conversation.id);
                    continue;
                }
                events.push(StoreEvent::Upserted(conversation.id, WriteOrigin::Snapshot));
                inner.conversations.insert(conversation.id, conversation);
                outcome.applied += 1;
            }

            if authoritative {
                let stale: Vec<ConversationId> = inner
                    .conversations
                    .keys()
                    .filter(|id| !snapshot_ids.contains(id) && !busy.contains(id))
                    .copied()
                    .collect();
                for id in stale {
                    inner.conversations.remove(&id);
                    events.push(StoreEvent::Removed(id));
                    outcome.removed.push(id);
                }
            }

            if inner.total != page.total {
                inner.total = page.total;
                events.push(StoreEvent::TotalChanged(page.total));
            }
        }

        for event in events {
            self.emit(event);
        }
        debug!(
            applied = outcome.applied,
            skipped_busy = outcome.skipped_busy.len(),
            removed = outcome.removed.len(),
            "poll snapshot merged"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use deskwire_core::types::{DeliveryStatus, MessageKind, Role};

    fn conversation(id: i64, updated_secs: i64) -> Conversation {
        Conversation {
            id: ConversationId(id),
            contact_id: format!("55119999{id:04}"),
            display_name: None,
            status: None,
            tags: vec![],
            active_persona_id: None,
            thread: vec![],
            updated_at: Utc.timestamp_opt(updated_secs, 0).unwrap(),
        }
    }

    fn message(id: &str, content: &str) -> Message {
        Message {
            id: MessageId(id.into()),
            role: Role::Assistant,
            kind: MessageKind::Sending,
            content: content.into(),
            media_ref: None,
            filename: None,
            local_preview_url: None,
            timestamp: Utc::now(),
            delivery_status: DeliveryStatus::Sending,
        }
    }

    #[tokio::test]
    async fn replace_emits_direct_upsert() {
        let store = ConversationStore::new();
        let mut events = store.subscribe();
        store.replace(conversation(1, 100)).await;
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::Upserted(ConversationId(1), WriteOrigin::Direct)
        );
        assert!(store.contains(ConversationId(1)).await);
    }

    #[tokio::test]
    async fn append_message_leaves_prior_reads_untouched() {
        let store = ConversationStore::new();
        store.replace(conversation(1, 100)).await;
        let before = store.get(ConversationId(1)).await.unwrap();

        store
            .append_message(ConversationId(1), message("local-1-abc", "oi"))
            .await
            .unwrap();

        // The previously-read record is a clone; it does not change.
        assert!(before.thread.is_empty());
        let after = store.get(ConversationId(1)).await.unwrap();
        assert_eq!(after.thread.len(), 1);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn append_to_unknown_conversation_fails() {
        let store = ConversationStore::new();
        let err = store
            .append_message(ConversationId(9), message("local-1-abc", "oi"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeskwireError::UnknownConversation(9)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_not_lost() {
        let store = Arc::new(ConversationStore::new());
        store.replace(conversation(1, 100)).await;

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .append_message(ConversationId(1), message(&format!("m-{i}"), "x"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = store.get(ConversationId(1)).await.unwrap();
        assert_eq!(record.thread.len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn append_racing_replace_never_resurrects_the_old_thread() {
        // A terminal replace landing while an append runs must not be
        // overwritten by a stale clone of the pre-replace record.
        for _ in 0..50 {
            let store = Arc::new(ConversationStore::new());
            store.replace(conversation(1, 100)).await;

            let appender = {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .append_message(ConversationId(1), message("local-1-abc", "oi"))
                        .await
                })
            };
            let replacer = {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut echo = conversation(1, 200);
                    echo.thread.push(message("999", "confirmed"));
                    store.replace(echo).await;
                })
            };
            appender.await.unwrap().unwrap();
            replacer.await.unwrap();

            // The append only adds to whichever record is current; it can
            // never write back a thread missing the echo.
            let record = store.get(ConversationId(1)).await.unwrap();
            assert!(
                record.thread.iter().any(|m| m.id == MessageId("999".into())),
                "echo lost to a concurrent append: {:?}",
                record.thread
            );
        }
    }

    #[tokio::test]
    async fn rewrite_touches_only_the_matching_message() {
        let store = ConversationStore::new();
        store.replace(conversation(1, 100)).await;
        store
            .append_message(ConversationId(1), message("m-1", "first"))
            .await
            .unwrap();
        store
            .append_message(ConversationId(1), message("local-2-xyz", "second"))
            .await
            .unwrap();

        let found = store
            .rewrite_message(ConversationId(1), &MessageId("local-2-xyz".into()), |m| {
                m.kind = MessageKind::Error;
                m.delivery_status = DeliveryStatus::Failed;
                m.content = "Re-engagement message".into();
            })
            .await;
        assert!(found);

        let record = store.get(ConversationId(1)).await.unwrap();
        assert_eq!(record.thread[0].content, "first");
        assert_eq!(record.thread[0].kind, MessageKind::Sending);
        assert_eq!(record.thread[1].kind, MessageKind::Error);
        assert_eq!(record.thread[1].content, "Re-engagement message");
    }

    #[tokio::test]
    async fn rewrite_missing_message_reports_not_found() {
        let store = ConversationStore::new();
        store.replace(conversation(1, 100)).await;
        let found = store
            .rewrite_message(ConversationId(1), &MessageId("gone".into()), |_| {})
            .await;
        assert!(!found);
    }

    #[tokio::test]
    async fn snapshot_upserts_carry_snapshot_origin() {
        let store = ConversationStore::new();
        let mut events = store.subscribe();
        let page = ConversationPage {
            items: vec![conversation(1, 100)],
            total: 1,
        };
        store.apply_snapshot(page, &HashSet::new(), false).await;
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::Upserted(ConversationId(1), WriteOrigin::Snapshot)
        );
    }

    #[tokio::test]
    async fn snapshot_skips_busy_conversations() {
        let store = ConversationStore::new();
        let mut local = conversation(7, 200);
        local.thread.push(message("local-9-abc", "in flight"));
        store.replace(local.clone()).await;

        let mut busy = HashSet::new();
        busy.insert(ConversationId(7));

        let page = ConversationPage {
            items: vec![conversation(7, 300), conversation(8, 50)],
            total: 2,
        };
        let outcome = store.apply_snapshot(page, &busy, false).await;

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.skipped_busy, vec![ConversationId(7)]);
        assert_eq!(outcome.visible, vec![ConversationId(7), ConversationId(8)]);
        // Busy record is byte-for-byte unchanged.
        assert_eq!(store.get(ConversationId(7)).await.unwrap(), local);
        assert!(store.contains(ConversationId(8)).await);
        assert_eq!(store.total().await, 2);
    }

    #[tokio::test]
    async fn authoritative_snapshot_removes_absent_records() {
        let store = ConversationStore::new();
        store.replace(conversation(1, 100)).await;
        store.replace(conversation(2, 100)).await;

        let page = ConversationPage {
            items: vec![conversation(1, 150)],
            total: 1,
        };
        let outcome = store.apply_snapshot(page, &HashSet::new(), true).await;

        assert_eq!(outcome.removed, vec![ConversationId(2)]);
        assert!(!store.contains(ConversationId(2)).await);
        assert!(store.contains(ConversationId(1)).await);
    }

    #[tokio::test]
    async fn authoritative_snapshot_never_removes_busy_records() {
        let store = ConversationStore::new();
        store.replace(conversation(1, 100)).await;
        store.replace(conversation(2, 100)).await;

        let mut busy = HashSet::new();
        busy.insert(ConversationId(2));

        let page = ConversationPage {
            items: vec![conversation(1, 150)],
            total: 1,
        };
        let outcome = store.apply_snapshot(page, &busy, true).await;

        assert!(outcome.removed.is_empty());
        assert!(store.contains(ConversationId(2)).await);
    }

    #[tokio::test]
    async fn non_authoritative_snapshot_leaves_absent_records() {
        let store = ConversationStore::new();
        store.replace(conversation(1, 100)).await;
        let page = ConversationPage {
            items: vec![conversation(2, 150)],
            total: 10,
        };
        store.apply_snapshot(page, &HashSet::new(), false).await;
        assert!(store.contains(ConversationId(1)).await);
        assert_eq!(store.total().await, 10);
    }

    #[tokio::test]
    async fn list_orders_by_recency() {
        let store = ConversationStore::new();
        store.replace(conversation(1, 100)).await;
        store.replace(conversation(2, 300)).await;
        store.replace(conversation(3, 200)).await;
        let ids: Vec<i64> = store.list().await.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
