// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait for the conversation REST API.

use async_trait::async_trait;

use crate::error::DeskwireError;
use crate::types::{
    Conversation, ConversationId, ConversationPage, ConversationPatch, ConversationQuery,
    MediaType,
};

/// The server-side conversation API as consumed by the sync engine.
///
/// The engine only depends on this trait; the reqwest implementation lives in
/// `deskwire-api`, and tests substitute controllable mocks.
#[async_trait]
pub trait ConversationApi: Send + Sync + 'static {
    /// Fetches one page of the authoritative conversation list.
    async fn list_conversations(
        &self,
        query: &ConversationQuery,
    ) -> Result<ConversationPage, DeskwireError>;

    /// Sends a text message. Returns the updated conversation, full thread.
    async fn send_text(
        &self,
        id: ConversationId,
        text: &str,
    ) -> Result<Conversation, DeskwireError>;

    /// Uploads and sends a media attachment. Returns the updated conversation.
    async fn send_media(
        &self,
        id: ConversationId,
        media_type: MediaType,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<Conversation, DeskwireError>;

    /// Applies a partial field replacement. Returns the updated conversation.
    async fn update_conversation(
        &self,
        id: ConversationId,
        patch: &ConversationPatch,
    ) -> Result<Conversation, DeskwireError>;

    /// Downloads a media object for preview materialization.
    async fn fetch_media(
        &self,
        id: ConversationId,
        media_id: &str,
    ) -> Result<Vec<u8>, DeskwireError>;
}
