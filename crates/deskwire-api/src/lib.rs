// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST transport for the Deskwire sync engine.
//!
//! Implements [`deskwire_core::ConversationApi`] over reqwest for the
//! conversation server endpoints: list, send-text, send-media, partial
//! update, and media fetch.

pub mod client;

pub use client::ApiClient;
