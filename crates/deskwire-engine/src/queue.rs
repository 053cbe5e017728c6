// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation outbound send queues.
//!
//! Each conversation owns an independent FIFO plus a single in-flight slot.
//! `begin` moves the head item into the slot, `finish` clears it after the
//! terminal outcome has been written to the store, so at most one send per
//! conversation is ever awaiting the network. A conversation is *busy* while
//! anything is queued or in flight; busy conversations are excluded from
//! poll snapshot overwrite.

use std::collections::{HashMap, HashSet, VecDeque};

use deskwire_core::types::{ConversationId, MessageId, QueueItem};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct ConversationQueue {
    /// Temporary id of the item currently awaiting its network round trip.
    in_flight: Option<MessageId>,
    items: VecDeque<QueueItem>,
}

/// Send queue state for all conversations.
#[derive(Debug, Default)]
pub struct SendQueue {
    inner: Mutex<HashMap<ConversationId, ConversationQueue>>,
}

impl SendQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item to its conversation's FIFO.
    ///
    /// Returns `true` when the conversation was idle, meaning the caller must
    /// start a pump for it; a busy conversation's running pump picks the item
    /// up on its own.
    pub async fn push(&self, item: QueueItem) -> bool {
        let mut inner = self.inner.lock().await;
        let queue = inner.entry(item.conversation_id).or_default();
        let was_idle = queue.in_flight.is_none() && queue.items.is_empty();
        queue.items.push_back(item);
        was_idle
    }

    /// Takes the head item and marks the conversation in flight.
    ///
    /// Returns `None` when another send is already in flight for this
    /// conversation or the queue is empty.
    pub async fn begin(&self, id: ConversationId) -> Option<QueueItem> {
        let mut inner = self.inner.lock().await;
        let queue = inner.get_mut(&id)?;
        if queue.in_flight.is_some() {
            return None;
        }
        let item = queue.items.pop_front()?;
        queue.in_flight = Some(item.id.clone());
        Some(item)
    }

    /// Clears the in-flight slot after the terminal outcome was applied.
    ///
    /// Returns `true` when more items are queued for this conversation.
    pub async fn finish(&self, id: ConversationId) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(queue) = inner.get_mut(&id) else {
            return false;
        };
        queue.in_flight = None;
        if queue.items.is_empty() {
            inner.remove(&id);
            false
        } else {
            true
        }
    }

    /// Queued plus in-flight item count for one conversation.
    pub async fn depth(&self, id: ConversationId) -> usize {
        let inner = self.inner.lock().await;
        inner
            .get(&id)
            .map(|q| q.items.len() + usize::from(q.in_flight.is_some()))
            .unwrap_or(0)
    }

    /// True while a send for this conversation is awaiting the network.
    pub async fn in_flight(&self, id: ConversationId) -> bool {
        let inner = self.inner.lock().await;
        inner.get(&id).is_some_and(|q| q.in_flight.is_some())
    }

    /// True while anything is queued or in flight for this conversation.
    pub async fn is_busy(&self, id: ConversationId) -> bool {
        self.depth(id).await > 0
    }

    /// Ids of all busy conversations, consulted by the poll reconciler
    /// before overwriting any record with a snapshot.
    pub async fn busy_ids(&self) -> HashSet<ConversationId> {
        let inner = self.inner.lock().await;
        inner.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskwire_core::types::SendOperation;

    fn item(conversation: i64, text: &str) -> QueueItem {
        QueueItem {
            id: MessageId::local(),
            conversation_id: ConversationId(conversation),
            operation: SendOperation::Text { text: text.into() },
        }
    }

    #[tokio::test]
    async fn push_reports_idle_only_for_first_item() {
        let queue = SendQueue::new();
        assert!(queue.push(item(1, "a")).await);
        assert!(!queue.push(item(1, "b")).await);
        assert!(queue.push(item(2, "c")).await, "other conversations are independent");
    }

    #[tokio::test]
    async fn begin_is_fifo_and_single_flight() {
        let queue = SendQueue::new();
        queue.push(item(1, "first")).await;
        queue.push(item(1, "second")).await;

        let head = queue.begin(ConversationId(1)).await.unwrap();
        match head.operation {
            SendOperation::Text { ref text } => assert_eq!(text, "first"),
            _ => panic!("expected text operation"),
        }

        // Second begin while in flight yields nothing.
        assert!(queue.begin(ConversationId(1)).await.is_none());
        assert!(queue.in_flight(ConversationId(1)).await);

        assert!(queue.finish(ConversationId(1)).await, "one item remains");
        let next = queue.begin(ConversationId(1)).await.unwrap();
        match next.operation {
            SendOperation::Text { ref text } => assert_eq!(text, "second"),
            _ => panic!("expected text operation"),
        }
        assert!(!queue.finish(ConversationId(1)).await);
        assert!(!queue.is_busy(ConversationId(1)).await);
    }

    #[tokio::test]
    async fn in_flight_implies_nonzero_depth() {
        let queue = SendQueue::new();
        queue.push(item(7, "x")).await;
        queue.begin(ConversationId(7)).await.unwrap();
        assert!(queue.in_flight(ConversationId(7)).await);
        assert!(queue.depth(ConversationId(7)).await > 0);
    }

    #[tokio::test]
    async fn busy_ids_tracks_queued_and_in_flight() {
        let queue = SendQueue::new();
        queue.push(item(1, "a")).await;
        queue.push(item(2, "b")).await;
        queue.begin(ConversationId(1)).await.unwrap();

        let busy = queue.busy_ids().await;
        assert!(busy.contains(&ConversationId(1)));
        assert!(busy.contains(&ConversationId(2)));
        assert!(!busy.contains(&ConversationId(3)));

        queue.begin(ConversationId(2)).await.unwrap();
        queue.finish(ConversationId(2)).await;
        assert!(!queue.busy_ids().await.contains(&ConversationId(2)));
    }

    #[tokio::test]
    async fn begin_on_empty_or_unknown_returns_none() {
        let queue = SendQueue::new();
        assert!(queue.begin(ConversationId(99)).await.is_none());
        assert_eq!(queue.depth(ConversationId(99)).await, 0);
    }
}
