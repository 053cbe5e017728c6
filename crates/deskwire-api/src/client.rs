// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the conversation server.
//!
//! Provides [`ApiClient`], the [`ConversationApi`] implementation over
//! reqwest. Requests carry no automatic retry: queued sends are terminal on
//! failure, and the poll reconciler retries implicitly through its cadence.

use std::time::Duration;

use async_trait::async_trait;
use deskwire_config::model::ApiConfig;
use deskwire_core::error::DeskwireError;
use deskwire_core::traits::ConversationApi;
use deskwire_core::types::{
    Conversation, ConversationId, ConversationPage, ConversationPatch, ConversationQuery,
    MediaType,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart;
use tracing::debug;

/// HTTP client for conversation server communication.
///
/// Manages the auth header, connection pooling, and error-detail extraction
/// from failed responses.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a new conversation API client from config.
    pub fn new(config: &ApiConfig) -> Result<Self, DeskwireError> {
        let mut headers = HeaderMap::new();
        if let Some(ref token) = config.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                DeskwireError::Config(format!("invalid auth token header value: {e}"))
            })?;
            headers.insert("authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DeskwireError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Reads a successful response body as a full conversation record, or
    /// converts a failed response into an [`DeskwireError::Api`].
    async fn read_conversation(
        response: reqwest::Response,
    ) -> Result<Conversation, DeskwireError> {
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        response
            .json::<Conversation>()
            .await
            .map_err(|e| DeskwireError::Transport {
                message: format!("failed to parse conversation response: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

/// Builds an [`DeskwireError::Api`] from a non-success response, extracting
/// the human-readable detail from the body when the server provides one.
async fn api_error(status: reqwest::StatusCode, response: reqwest::Response) -> DeskwireError {
    let body = response.text().await.unwrap_or_default();
    DeskwireError::Api {
        status: Some(status.as_u16()),
        message: extract_error_detail(&body)
            .unwrap_or_else(|| format!("request failed with status {status}")),
    }
}

/// Pulls the detail string out of an error body.
///
/// Recognizes `{"detail": "..."}` and `{"error": {"message": "..."}}`; any
/// other shape yields `None` and callers fall back to a generic line.
fn extract_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(detail) = value.get("detail").and_then(|v| v.as_str()) {
        return Some(detail.to_string());
    }
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

#[async_trait]
impl ConversationApi for ApiClient {
    async fn list_conversations(
        &self,
        query: &ConversationQuery,
    ) -> Result<ConversationPage, DeskwireError> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(ref search) = query.search {
            params.push(("search", search.clone()));
        }
        if let Some(ref status) = query.status {
            params.push(("status", status.clone()));
        }

        let response = self
            .client
            .get(self.url("/conversations"))
            .query(&params)
            .send()
            .await
            .map_err(|e| DeskwireError::Transport {
                message: format!("list request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, page = query.page, "conversation list response");
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        response
            .json::<ConversationPage>()
            .await
            .map_err(|e| DeskwireError::Transport {
                message: format!("failed to parse conversation list: {e}"),
                source: Some(Box::new(e)),
            })
    }

    async fn send_text(
        &self,
        id: ConversationId,
        text: &str,
    ) -> Result<Conversation, DeskwireError> {
        let response = self
            .client
            .post(self.url(&format!("/conversations/{id}/send-text")))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| DeskwireError::Transport {
                message: format!("send-text request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        debug!(conversation = %id, status = %response.status(), "send-text response");
        Self::read_conversation(response).await
    }

    async fn send_media(
        &self,
        id: ConversationId,
        media_type: MediaType,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<Conversation, DeskwireError> {
        let part = multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(media_type.mime())
            .map_err(|e| DeskwireError::Internal(format!("invalid media mime type: {e}")))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("type", media_type.to_string());

        let response = self
            .client
            .post(self.url(&format!("/conversations/{id}/send-media")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DeskwireError::Transport {
                message: format!("send-media request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        debug!(conversation = %id, status = %response.status(), "send-media response");
        Self::read_conversation(response).await
    }

    async fn update_conversation(
        &self,
        id: ConversationId,
        patch: &ConversationPatch,
    ) -> Result<Conversation, DeskwireError> {
        let response = self
            .client
            .put(self.url(&format!("/conversations/{id}")))
            .json(patch)
            .send()
            .await
            .map_err(|e| DeskwireError::Transport {
                message: format!("update request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        debug!(conversation = %id, status = %response.status(), "update response");
        Self::read_conversation(response).await
    }

    async fn fetch_media(
        &self,
        id: ConversationId,
        media_id: &str,
    ) -> Result<Vec<u8>, DeskwireError> {
        let response = self
            .client
            .get(self.url(&format!("/conversations/{id}/media/{media_id}")))
            .send()
            .await
            .map_err(|e| DeskwireError::Transport {
                message: format!("media fetch failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        let bytes = response.bytes().await.map_err(|e| DeskwireError::Transport {
            message: format!("failed to read media body: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(bytes.to_vec())
    }
}
