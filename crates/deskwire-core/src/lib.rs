// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Deskwire conversation synchronization engine.
//!
//! This crate provides the data model, error taxonomy, and the transport
//! trait shared by the engine and its REST client. The engine itself lives
//! in `deskwire-engine`.

pub mod error;
pub mod traits;
pub mod types;

pub use error::DeskwireError;
pub use traits::ConversationApi;
pub use types::{
    Conversation, ConversationId, ConversationPage, ConversationPatch, ConversationQuery,
    DeliveryStatus, MediaType, Message, MessageId, MessageKind, QueueItem, Role,
    SendOperation, Tag,
};
