// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Deskwire sync engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Deskwire configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeskwireConfig {
    /// Conversation API endpoint settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Poll reconciler cadence settings.
    #[serde(default)]
    pub poll: PollConfig,

    /// Console presentation settings (status labels, scroll anchoring).
    #[serde(default)]
    pub ui: UiConfig,
}

/// Conversation API endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the conversation server, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for the conversation server. `None` sends no auth header.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Poll reconciler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Spacing between the end of one tick and the start of the next.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Page size requested from the list endpoint.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            page_limit: default_page_limit(),
        }
    }
}

fn default_interval_ms() -> u64 {
    5_000
}

fn default_page_limit() -> u32 {
    50
}

/// One situation label in the ordered status palette.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StatusLabel {
    pub name: String,
    pub color: String,
}

/// Console presentation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UiConfig {
    /// Ordered set of situation labels a conversation status may take.
    #[serde(default = "default_status_labels")]
    pub status_labels: Vec<StatusLabel>,

    /// Distance from the thread bottom, in pixels, within which the viewport
    /// is considered anchored and auto-scrolls on new content.
    #[serde(default = "default_bottom_threshold_px")]
    pub bottom_threshold_px: f64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            status_labels: default_status_labels(),
            bottom_threshold_px: default_bottom_threshold_px(),
        }
    }
}

fn default_status_labels() -> Vec<StatusLabel> {
    vec![
        StatusLabel {
            name: "new".into(),
            color: "#4a90d9".into(),
        },
        StatusLabel {
            name: "waiting".into(),
            color: "#f5a623".into(),
        },
        StatusLabel {
            name: "resolved".into(),
            color: "#7ed321".into(),
        },
    ]
}

fn default_bottom_threshold_px() -> f64 {
    50.0
}
