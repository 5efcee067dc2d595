// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Commline conversation core.

use thiserror::Error;

use crate::types::{CallErrorCode, CallId, CallState};

/// The primary error type used across all Commline adapter traits and core
/// operations.
///
/// The variants map onto the error taxonomy of the conversation core:
/// synchronous local guards (`Validation`), transient network failures
/// (`Transport`, `Feed`), provider-coded call initiation failures
/// (`CallProvider`), and call-session guard rejections (`SessionBusy`,
/// `TerminalSession`).
#[derive(Debug, Error)]
pub enum CommlineError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Synchronous local guard failures (no channel selected, no active
    /// session to mutate). Never produced by a background task.
    #[error("validation error: {0}")]
    Validation(String),

    /// Outbound transport errors (send failed, delivery rejected). Transient
    /// and retryable by re-invocation; the core does not auto-retry.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Change-feed errors (subscription failed, push channel disconnected).
    #[error("feed error: {message}")]
    Feed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Message store errors (confirmed-list fetch failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Call initiation or control failures carrying a machine-readable code
    /// from the closed provider taxonomy.
    #[error("call provider error [{code}]: {detail}")]
    CallProvider { code: CallErrorCode, detail: String },

    /// A new call was rejected because a non-terminal session is already
    /// held by the active line.
    #[error("a call is already active ({active})")]
    SessionBusy { active: CallId },

    /// A mutation was attempted on a session in a terminal state.
    #[error("call session is terminal ({state}); no further transitions accepted")]
    TerminalSession { state: CallState },

    /// An invalid transition was attempted on a non-terminal session.
    #[error("invalid call transition: {0}")]
    InvalidTransition(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommlineError {
    /// Convenience constructor for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Convenience constructor for a feed error without an underlying source.
    pub fn feed(message: impl Into<String>) -> Self {
        Self::Feed {
            message: message.into(),
            source: None,
        }
    }

    /// True for errors a caller may retry by simply re-invoking the operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Feed { .. } | Self::Timeout { .. })
    }
}
