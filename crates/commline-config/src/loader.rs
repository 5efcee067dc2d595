// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./commline.toml` > `~/.config/commline/commline.toml`
//! > `/etc/commline/commline.toml` with environment variable overrides via
//! the `COMMLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CommlineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/commline/commline.toml` (system-wide)
/// 3. `~/.config/commline/commline.toml` (user XDG config)
/// 4. `./commline.toml` (local directory)
/// 5. `COMMLINE_*` environment variables
pub fn load_config() -> Result<CommlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CommlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CommlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CommlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CommlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CommlineConfig::default()))
        .merge(Toml::file("/etc/commline/commline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("commline/commline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("commline.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `COMMLINE_CALL_POLL_INTERVAL_MS` must map
/// to `call.poll_interval_ms`, not `call.poll.interval.ms`.
fn env_provider() -> Env {
    Env::prefixed("COMMLINE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: COMMLINE_STREAM_REFETCH_DEBOUNCE_MS -> "stream_refetch_debounce_ms"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("workspace_", "workspace.", 1)
            .replacen("stream_", "stream.", 1)
            .replacen("call_", "call.", 1)
            .replacen("handoff_", "handoff.", 1);
        mapped.into()
    })
}
