// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Deskwire configuration system.

use std::io::Write;

use deskwire_config::{load_config_from_path, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_deskwire_config() {
    let toml = r##"
[api]
base_url = "https://chat.example.com/api"
auth_token = "tok-123"
timeout_secs = 10

[poll]
interval_ms = 2500
page_limit = 25

[ui]
bottom_threshold_px = 80.0
status_labels = [
    { name = "triage", color = "#cc0000" },
    { name = "done", color = "#00cc00" },
]
"##;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.api.base_url, "https://chat.example.com/api");
    assert_eq!(config.api.auth_token.as_deref(), Some("tok-123"));
    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.poll.interval_ms, 2500);
    assert_eq!(config.poll.page_limit, 25);
    assert_eq!(config.ui.bottom_threshold_px, 80.0);
    assert_eq!(config.ui.status_labels.len(), 2);
    assert_eq!(config.ui.status_labels[0].name, "triage");
}

/// Empty config falls back to compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should load defaults");
    assert_eq!(config.api.base_url, "http://localhost:8000");
    assert!(config.api.auth_token.is_none());
    assert_eq!(config.poll.interval_ms, 5_000);
    assert_eq!(config.poll.page_limit, 50);
    assert_eq!(config.ui.bottom_threshold_px, 50.0);
    assert_eq!(config.ui.status_labels.len(), 3);
}

/// Partial sections keep defaults for the unset fields.
#[test]
fn partial_section_keeps_defaults() {
    let toml = r#"
[poll]
interval_ms = 1000
"#;
    let config = load_config_from_str(toml).unwrap();
    assert_eq!(config.poll.interval_ms, 1000);
    assert_eq!(config.poll.page_limit, 50);
}

/// Unknown field in a section is rejected.
#[test]
fn unknown_field_produces_error() {
    let toml = r#"
[api]
base_ulr = "https://typo.example.com"
"#;
    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("base_ulr"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_produces_error() {
    let toml = r#"
[polling]
interval_ms = 1000
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// An explicit config file path loads without consulting the XDG hierarchy.
#[test]
fn explicit_path_loads_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[api]\nbase_url = \"https://path.example.com\"").unwrap();

    let config = load_config_from_path(file.path()).expect("file should load");
    assert_eq!(config.api.base_url, "https://path.example.com");
    assert_eq!(config.poll.interval_ms, 5_000);
}
