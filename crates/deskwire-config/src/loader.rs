// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading backed by Figment.
//!
//! Sources merge in precedence order: compiled defaults, then
//! `/etc/deskwire/deskwire.toml`, the user's XDG config, a `deskwire.toml`
//! in the working directory, and finally `DESKWIRE_`-prefixed environment
//! variables.

#![allow(clippy::result_large_err)] // figment::Error is large but foreign; not worth a wrapper type

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DeskwireConfig;

/// Resolves the effective configuration from the standard source stack.
///
/// Each layer overrides the one below it:
/// 1. Compiled defaults
/// 2. `/etc/deskwire/deskwire.toml`
/// 3. `~/.config/deskwire/deskwire.toml`
/// 4. `./deskwire.toml`
/// 5. `DESKWIRE_*` environment variables
pub fn load_config() -> Result<DeskwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskwireConfig::default()))
        .merge(Toml::file("/etc/deskwire/deskwire.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("deskwire/deskwire.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("deskwire.toml"))
        .merge(env_provider())
        .extract()
}

/// Parses a configuration from an in-memory TOML document, skipping the
/// filesystem and environment entirely.
pub fn load_config_from_str(toml_content: &str) -> Result<DeskwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskwireConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads one explicit config file (plus env overrides), ignoring the XDG
/// hierarchy. Backs a `--config <path>` style invocation.
pub fn load_config_from_path(path: &Path) -> Result<DeskwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskwireConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `DESKWIRE_<SECTION>_<KEY>` onto dotted keys.
///
/// The section prefix is rewritten explicitly rather than with
/// `Env::split("_")`, because config keys themselves contain underscores:
/// `DESKWIRE_API_BASE_URL` has to become `api.base_url`, not `api.base.url`.
fn env_provider() -> Env {
    Env::prefixed("DESKWIRE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("api_", "api.", 1)
            .replacen("poll_", "poll.", 1)
            .replacen("ui_", "ui.", 1);
        mapped.into()
    })
}
