// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive intervals and known log levels.

use crate::diagnostic::ConfigError;
use crate::model::CommlineConfig;

const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const KNOWN_CHANNELS: &[&str] = &["sms", "whatsapp", "email"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CommlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.workspace.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "workspace.name must not be empty".to_string(),
        });
    }

    if !KNOWN_LOG_LEVELS.contains(&config.workspace.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "workspace.log_level `{}` is not one of: {}",
                config.workspace.log_level,
                KNOWN_LOG_LEVELS.join(", ")
            ),
        });
    }

    if let Some(ref channel) = config.workspace.default_channel
        && !KNOWN_CHANNELS.contains(&channel.as_str())
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "workspace.default_channel `{channel}` is not one of: {}",
                KNOWN_CHANNELS.join(", ")
            ),
        });
    }

    if !config.stream.follow_threshold.is_finite() || config.stream.follow_threshold < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "stream.follow_threshold must be a non-negative number, got {}",
                config.stream.follow_threshold
            ),
        });
    }

    if config.call.poll_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "call.poll_interval_ms must be positive".to_string(),
        });
    }

    if config.call.poll_backoff_max_ms < config.call.poll_interval_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "call.poll_backoff_max_ms ({}) must be at least call.poll_interval_ms ({})",
                config.call.poll_backoff_max_ms, config.call.poll_interval_ms
            ),
        });
    }

    if config.call.max_poll_duration_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "call.max_poll_duration_secs must be positive".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
