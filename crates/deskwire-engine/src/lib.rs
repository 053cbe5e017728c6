// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation synchronization engine for the Deskwire operator console.
//!
//! The engine lets an operator send text and media immediately (optimistic
//! placeholders) while a periodic full-state poll keeps all open threads
//! fresh with server-authoritative data. The hard part is merging those two
//! independent sources of truth without losing or duplicating messages:
//! per-conversation FIFO send queues with at-most-one-in-flight semantics,
//! and a busy-set rule that makes the send path the single writer for a
//! conversation until its queue drains.

pub mod blob;
pub mod engine;
pub mod poller;
pub mod queue;
pub mod recorder;
pub mod selection;
pub mod sender;
pub mod store;

pub use blob::BlobStore;
pub use engine::SyncEngine;
pub use poller::{PollReconciler, Visibility};
pub use queue::SendQueue;
pub use recorder::AudioRecording;
pub use selection::{ScrollAnchor, SelectionCoordinator, ViewUpdate};
pub use sender::SendQueueManager;
pub use store::{ConversationStore, SnapshotOutcome, StoreEvent, WriteOrigin};
