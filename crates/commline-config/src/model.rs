// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Commline conversation core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Commline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommlineConfig {
    /// Workspace identity and logging settings.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Conversation stream and optimistic-send settings.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Call session and status-polling settings.
    #[serde(default)]
    pub call: CallConfig,

    /// AI handoff gate settings.
    #[serde(default)]
    pub handoff: HandoffConfig,
}

/// Workspace identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Display name of the workspace.
    #[serde(default = "default_workspace_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Default outbound channel for new conversations (sms, whatsapp, email).
    /// `None` means the user must pick one before sending.
    #[serde(default)]
    pub default_channel: Option<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            name: default_workspace_name(),
            log_level: default_log_level(),
            default_channel: None,
        }
    }
}

fn default_workspace_name() -> String {
    "commline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Conversation stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    /// Window for coalescing bursts of insert notices before a re-fetch,
    /// in milliseconds.
    #[serde(default = "default_refetch_debounce_ms")]
    pub refetch_debounce_ms: u64,

    /// Distance from the newest content (in viewport units) within which
    /// the view auto-follows new messages.
    #[serde(default = "default_follow_threshold")]
    pub follow_threshold: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            refetch_debounce_ms: default_refetch_debounce_ms(),
            follow_threshold: default_follow_threshold(),
        }
    }
}

fn default_refetch_debounce_ms() -> u64 {
    50
}

fn default_follow_threshold() -> f64 {
    100.0
}

/// Call session and status-polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallConfig {
    /// Fixed interval between call-status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Cap for the exponential backoff applied after consecutive poll
    /// failures, in milliseconds.
    #[serde(default = "default_poll_backoff_max_ms")]
    pub poll_backoff_max_ms: u64,

    /// Hard deadline after which a still-unresolved call is forced to
    /// `failed` and polling stops, in seconds.
    #[serde(default = "default_max_poll_duration_secs")]
    pub max_poll_duration_secs: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_backoff_max_ms: default_poll_backoff_max_ms(),
            max_poll_duration_secs: default_max_poll_duration_secs(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_poll_backoff_max_ms() -> u64 {
    30_000
}

fn default_max_poll_duration_secs() -> u64 {
    14_400 // 4 hours
}

/// AI handoff gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandoffConfig {
    /// Whether resuming automation (unpausing) also clears a pending
    /// handoff request.
    #[serde(default = "default_auto_clear_on_resume")]
    pub auto_clear_on_resume: bool,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            auto_clear_on_resume: default_auto_clear_on_resume(),
        }
    }
}

fn default_auto_clear_on_resume() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = CommlineConfig::default();
        assert_eq!(config.workspace.name, "commline");
        assert_eq!(config.workspace.log_level, "info");
        assert!(config.workspace.default_channel.is_none());
        assert_eq!(config.stream.refetch_debounce_ms, 50);
        assert_eq!(config.stream.follow_threshold, 100.0);
        assert_eq!(config.call.poll_interval_ms, 2000);
        assert_eq!(config.call.poll_backoff_max_ms, 30_000);
        assert_eq!(config.call.max_poll_duration_secs, 14_400);
        assert!(config.handoff.auto_clear_on_resume);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[workspace]
name = "acme-desk"

[call]
poll_interval_ms = 500
"#;
        let config: CommlineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.workspace.name, "acme-desk");
        assert_eq!(config.workspace.log_level, "info");
        assert_eq!(config.call.poll_interval_ms, 500);
        assert_eq!(config.call.poll_backoff_max_ms, 30_000);
        assert_eq!(config.stream.refetch_debounce_ms, 50);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[stream]
refetch_debounce = 10
"#;
        let err = toml::from_str::<CommlineConfig>(toml_str).unwrap_err();
        assert!(err.to_string().contains("refetch_debounce"));
    }

    #[test]
    fn serialization_round_trip() {
        let config = CommlineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: CommlineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.workspace.name, config.workspace.name);
        assert_eq!(parsed.call.poll_interval_ms, config.call.poll_interval_ms);
    }
}
