// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Commline conversation workspace.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Commline workspace: the message and
//! call-session data model, the closed error taxonomy, and the adapter
//! traits behind which the persistent store, push channel, and telephony
//! provider live.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CommlineError;
pub use types::{
    CallDirection, CallErrorCode, CallId, CallOrigin, CallParams, CallState,
    CallStatusSnapshot, ChannelKind, ConversationAiState, ConversationId, Direction,
    HealthStatus, InsertNotice, Message, MessageId, MessageStatus, OutboundDraft,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    Adapter, AiGateStore, Automation, ChangeFeed, FeedSubscription, MessageStore,
    MessageTransport, Telephony,
};
