// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Deskwire sync engine.
//!
//! Layered TOML configuration with environment overrides, following the
//! XDG hierarchy. See [`loader`] for merge order.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::DeskwireConfig;
