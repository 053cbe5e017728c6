// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the sync engine and its collaborators.

pub mod api;

pub use api::ConversationApi;
