// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Deskwire sync engine.

use thiserror::Error;

/// The primary error type used across the Deskwire workspace.
#[derive(Debug, Error)]
pub enum DeskwireError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// The server rejected a request. `message` is the human-readable detail
    /// extracted from the error body and is shown to the operator as-is.
    #[error("api error: {message}")]
    Api { status: Option<u16>, message: String },

    /// Transport-level failures (connection refused, timeout, malformed body).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Blob lifecycle violations (release of an unknown or already-released URL).
    #[error("blob lifecycle error: {0}")]
    Blob(String),

    /// An operation referenced a conversation the store does not hold.
    #[error("unknown conversation {0}")]
    UnknownConversation(i64),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DeskwireError {
    /// The text written into a failed placeholder message.
    ///
    /// Server-provided detail is preferred; anything without one falls back
    /// to a generic, operator-readable line.
    pub fn send_failure_text(&self) -> String {
        match self {
            DeskwireError::Api { message, .. } if !message.is_empty() => message.clone(),
            _ => "Message could not be delivered".to_string(),
        }
    }
}
