// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared between the sync engine and the REST transport.
//!
//! Wire-facing structs serialize camelCase to match the server contract.
//! A [`MessageId`] is either server-assigned (opaque) or a client-generated
//! temporary id of the form `local-<ts>-<rand>` while a send is in flight;
//! the temporary id is the only link between a placeholder message in a
//! thread and its queue item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable integer identifier for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a message: server-assigned, or temporary while in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generates a temporary client-side id (`local-<millis>-<rand>`).
    pub fn local() -> Self {
        let ts = Utc::now().timestamp_millis();
        let rand = uuid::Uuid::new_v4().simple().to_string();
        MessageId(format!("local-{ts}-{}", &rand[..8]))
    }

    /// True for client-generated temporary ids.
    pub fn is_local(&self) -> bool {
        self.0.starts_with("local-")
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message within a thread.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// The external contact.
    User,
    /// The operator or the automated agent.
    Assistant,
}

/// Rendered kind of a message. `Sending` and `Error` are client-local states
/// for optimistic placeholders and terminal send failures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
    Document,
    Sending,
    Error,
}

/// Delivery state of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryStatus {
    Unread,
    Read,
    Sending,
    Sent,
    Failed,
}

/// Media category for outbound attachments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaType {
    Image,
    Audio,
    Video,
    Document,
}

impl MediaType {
    /// MIME type sent in the multipart upload.
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Image => "image/jpeg",
            MediaType::Audio => "audio/ogg",
            MediaType::Video => "video/mp4",
            MediaType::Document => "application/octet-stream",
        }
    }

    /// The message kind an attachment of this type renders as.
    pub fn kind(&self) -> MessageKind {
        match self {
            MediaType::Image => MessageKind::Image,
            MediaType::Audio => MessageKind::Audio,
            MediaType::Video => MessageKind::Video,
            MediaType::Document => MessageKind::Document,
        }
    }
}

/// A tag attached to a conversation. `name` is unique within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub color: String,
}

/// One entry in a conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub kind: MessageKind,
    #[serde(default)]
    pub content: String,
    /// External media object id, when the message carries media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Local blob URL for the optimistic preview. Never sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_preview_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub delivery_status: DeliveryStatus,
}

/// A conversation with one external contact. Owned by the conversation store;
/// mutated only via whole-record replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    /// External channel identifier, e.g. a phone number.
    pub contact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Situation label; the ordered label set lives in configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_persona_id: Option<i64>,
    /// Ordered thread, oldest first.
    #[serde(default)]
    pub thread: Vec<Message>,
    pub updated_at: DateTime<Utc>,
}

/// One pending outbound operation.
#[derive(Debug, Clone)]
pub enum SendOperation {
    Text {
        text: String,
    },
    Media {
        data: Vec<u8>,
        media_type: MediaType,
        filename: String,
        /// Blob URL owned by this operation; released at terminal state.
        local_preview_url: Option<String>,
    },
}

impl SendOperation {
    /// The local preview URL this operation owns, if any.
    pub fn local_preview_url(&self) -> Option<&str> {
        match self {
            SendOperation::Text { .. } => None,
            SendOperation::Media {
                local_preview_url, ..
            } => local_preview_url.as_deref(),
        }
    }
}

/// A queued outbound operation awaiting its network round trip.
///
/// `id` equals the temporary id of the placeholder message it represents.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub operation: SendOperation,
}

/// Partial field replacement for a conversation (status/tag/read-state).
/// Idempotent, sent outside the send queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_persona_id: Option<i64>,
    /// Marks all inbound messages as read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
}

impl ConversationPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.tags.is_none()
            && self.active_persona_id.is_none()
            && self.read.is_none()
    }

    /// Applies the patch to a copy of the record for the optimistic write.
    pub fn apply_to(&self, conversation: &mut Conversation) {
        if let Some(ref status) = self.status {
            conversation.status = Some(status.clone());
        }
        if let Some(ref tags) = self.tags {
            conversation.tags = tags.clone();
        }
        if let Some(persona) = self.active_persona_id {
            conversation.active_persona_id = Some(persona);
        }
        if self.read == Some(true) {
            for message in &mut conversation.thread {
                if message.role == Role::User
                    && message.delivery_status == DeliveryStatus::Unread
                {
                    message.delivery_status = DeliveryStatus::Read;
                }
            }
        }
    }
}

/// Filter and pagination for the conversation list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Default for ConversationQuery {
    fn default() -> Self {
        Self {
            search: None,
            page: 1,
            limit: 50,
            status: None,
        }
    }
}

impl ConversationQuery {
    /// True when a response to this query can stand in for the full
    /// unfiltered conversation set, making removals reconcilable.
    pub fn is_unfiltered_first_page(&self) -> bool {
        self.search.is_none() && self.status.is_none() && self.page <= 1
    }
}

/// One page of the authoritative conversation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPage {
    pub items: Vec<Conversation>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_message_id_shape() {
        let id = MessageId::local();
        assert!(id.is_local());
        let parts: Vec<&str> = id.0.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "local");
        assert!(parts[1].parse::<i64>().is_ok(), "timestamp part: {}", parts[1]);
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn local_message_ids_are_unique() {
        let a = MessageId::local();
        let b = MessageId::local();
        assert_ne!(a, b);
    }

    #[test]
    fn server_id_is_not_local() {
        let id = MessageId("wamid.HBgL0123".into());
        assert!(!id.is_local());
    }

    #[test]
    fn conversation_deserializes_camel_case() {
        let json = r##"{
            "id": 42,
            "contactId": "5511999990000",
            "displayName": "Ana",
            "status": "waiting",
            "tags": [{"name": "vip", "color": "#f5a623"}],
            "activePersonaId": 3,
            "thread": [{
                "id": "999",
                "role": "assistant",
                "kind": "text",
                "content": "Olá",
                "timestamp": "2026-08-01T12:00:00Z",
                "deliveryStatus": "sent"
            }],
            "updatedAt": "2026-08-01T12:00:00Z"
        }"##;
        let conversation: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conversation.id, ConversationId(42));
        assert_eq!(conversation.contact_id, "5511999990000");
        assert_eq!(conversation.tags[0].name, "vip");
        assert_eq!(conversation.active_persona_id, Some(3));
        assert_eq!(conversation.thread.len(), 1);
        assert_eq!(conversation.thread[0].kind, MessageKind::Text);
        assert_eq!(conversation.thread[0].delivery_status, DeliveryStatus::Sent);
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = ConversationPatch {
            status: Some("resolved".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"status": "resolved"}));
    }

    #[test]
    fn patch_read_marks_inbound_unread_only() {
        let mut conversation = Conversation {
            id: ConversationId(1),
            contact_id: "c".into(),
            display_name: None,
            status: None,
            tags: vec![],
            active_persona_id: None,
            thread: vec![
                Message {
                    id: MessageId("1".into()),
                    role: Role::User,
                    kind: MessageKind::Text,
                    content: "oi".into(),
                    media_ref: None,
                    filename: None,
                    local_preview_url: None,
                    timestamp: Utc::now(),
                    delivery_status: DeliveryStatus::Unread,
                },
                Message {
                    id: MessageId("2".into()),
                    role: Role::Assistant,
                    kind: MessageKind::Text,
                    content: "olá".into(),
                    media_ref: None,
                    filename: None,
                    local_preview_url: None,
                    timestamp: Utc::now(),
                    delivery_status: DeliveryStatus::Sent,
                },
            ],
            updated_at: Utc::now(),
        };

        let patch = ConversationPatch {
            read: Some(true),
            ..Default::default()
        };
        patch.apply_to(&mut conversation);

        assert_eq!(conversation.thread[0].delivery_status, DeliveryStatus::Read);
        assert_eq!(conversation.thread[1].delivery_status, DeliveryStatus::Sent);
    }

    #[test]
    fn query_authoritative_detection() {
        assert!(ConversationQuery::default().is_unfiltered_first_page());
        assert!(
            !ConversationQuery {
                search: Some("ana".into()),
                ..Default::default()
            }
            .is_unfiltered_first_page()
        );
        assert!(
            !ConversationQuery {
                page: 2,
                ..Default::default()
            }
            .is_unfiltered_first_page()
        );
    }

    #[test]
    fn media_type_maps_to_kind() {
        assert_eq!(MediaType::Image.kind(), MessageKind::Image);
        assert_eq!(MediaType::Audio.kind(), MessageKind::Audio);
        assert_eq!(MediaType::Video.kind(), MessageKind::Video);
        assert_eq!(MediaType::Document.kind(), MessageKind::Document);
    }
}
