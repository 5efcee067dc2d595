// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Commline conversation core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Unique identifier for a message.
///
/// Server-assigned for confirmed messages; client-generated (with a `tmp-`
/// prefix) for optimistic stubs awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Unique identifier for a call session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl MessageId {
    /// Prefix used for client-generated temporary ids.
    pub const TEMP_PREFIX: &'static str = "tmp-";

    /// Generate a collision-resistant temporary id for an optimistic stub.
    pub fn new_temp() -> Self {
        Self(format!("{}{}", Self::TEMP_PREFIX, uuid::Uuid::new_v4()))
    }

    /// Whether this id is a client-generated temporary id.
    pub fn is_temp(&self) -> bool {
        self.0.starts_with(Self::TEMP_PREFIX)
    }
}

/// Direction of a message relative to the workspace.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Delivery lifecycle status of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

/// Outbound channel a message is delivered over.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Sms,
    Whatsapp,
    Email,
}

/// A conversation message, either server-confirmed or an optimistic stub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub direction: Direction,
    pub body: String,
    /// Reference to attached media, if any.
    pub media_url: Option<String>,
    pub status: MessageStatus,
    /// Echo of the client-generated temporary id, when the backend supports
    /// passing it through the send path. Enables exact-match reconciliation
    /// instead of content matching.
    pub client_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Content of an outbound message before it has an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundDraft {
    pub body: String,
    pub media_url: Option<String>,
}

impl OutboundDraft {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            media_url: None,
        }
    }
}

/// Payload-less notification that a message was inserted into a conversation.
///
/// The push channel does not deliver the record itself; consumers must
/// re-query the confirmed list.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertNotice {
    pub conversation_id: ConversationId,
    pub at: DateTime<Utc>,
}

// --- Call session types ---

/// Direction of a call relative to the workspace.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

/// States of the call-session finite state machine.
///
/// `Ended` and `Failed` are terminal: once entered, no further transitions
/// are accepted and duration/transcript become immutable history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Idle,
    Connecting,
    Ringing,
    InProgress,
    OnHold,
    Transferring,
    Ended,
    Failed,
}

impl CallState {
    /// Whether this state accepts no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Ended | CallState::Failed)
    }
}

/// Whether a session is backed by the telephony provider or simulated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOrigin {
    /// Remote-correlated session; progress is observed by polling the provider.
    Provider,
    /// Locally simulated session; no provider record exists to poll.
    Simulated,
}

/// Closed taxonomy of provider-coded call initiation failures.
///
/// Each code maps to a distinct user-facing remedy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallErrorCode {
    InvalidConfiguration,
    AgentNotFound,
    TargetNotFound,
    TargetUnreachable,
    ProviderRejected,
}

impl CallErrorCode {
    /// User-facing remedy for this failure code.
    pub fn remedy(self) -> &'static str {
        match self {
            CallErrorCode::InvalidConfiguration => {
                "check the calling configuration (caller id, credentials) in settings"
            }
            CallErrorCode::AgentNotFound => {
                "the selected voice agent no longer exists; pick another agent"
            }
            CallErrorCode::TargetNotFound => {
                "the contact has no callable number; verify the phone number"
            }
            CallErrorCode::TargetUnreachable => {
                "the number could not be reached; try again later"
            }
            CallErrorCode::ProviderRejected => {
                "the call was rejected by the provider; contact support if this persists"
            }
        }
    }
}

/// Parameters for initiating an outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallParams {
    /// Remote party to dial (E.164 number or provider address).
    pub target: String,
    /// Voice agent to attach to the call, if any.
    pub agent_id: Option<String>,
    /// Caller id to present, if configured.
    pub caller_id: Option<String>,
}

/// Authoritative remote call record, read by polling (no push channel exists
/// for call progress).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStatusSnapshot {
    pub status: CallState,
    pub duration_seconds: u64,
    pub transcript: Option<String>,
    pub error_message: Option<String>,
}

// --- AI handoff types ---

/// Per-conversation AI responsibility lattice.
///
/// `ai_handoff_requested` implies `ai_handled` was true at request time;
/// clearing a handoff request must not silently re-enable a paused state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversationAiState {
    /// Automation is eligible to act on this conversation.
    pub ai_handled: bool,
    /// Automation is suspended for this conversation.
    pub ai_paused: bool,
    /// Automation asked for a human to take over.
    pub ai_handoff_requested: bool,
}

// --- Adapter plumbing ---

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind the core traits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Feed,
    Store,
    Telephony,
    Automation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn temp_message_ids_are_unique_and_flagged() {
        let a = MessageId::new_temp();
        let b = MessageId::new_temp();
        assert_ne!(a, b);
        assert!(a.is_temp());
        assert!(!MessageId("srv-42".into()).is_temp());
    }

    #[test]
    fn call_state_terminality() {
        for state in [
            CallState::Idle,
            CallState::Connecting,
            CallState::Ringing,
            CallState::InProgress,
            CallState::OnHold,
            CallState::Transferring,
        ] {
            assert!(!state.is_terminal(), "{state} must be non-terminal");
        }
        assert!(CallState::Ended.is_terminal());
        assert!(CallState::Failed.is_terminal());
    }

    #[test]
    fn closed_enums_round_trip_display_and_from_str() {
        for code in [
            CallErrorCode::InvalidConfiguration,
            CallErrorCode::AgentNotFound,
            CallErrorCode::TargetNotFound,
            CallErrorCode::TargetUnreachable,
            CallErrorCode::ProviderRejected,
        ] {
            let parsed = CallErrorCode::from_str(&code.to_string()).expect("should parse back");
            assert_eq!(code, parsed);
        }

        assert_eq!(CallState::InProgress.to_string(), "in_progress");
        assert_eq!(
            CallState::from_str("on_hold").expect("parse"),
            CallState::OnHold
        );
        assert_eq!(Direction::Outbound.to_string(), "outbound");
        assert_eq!(ChannelKind::Sms.to_string(), "sms");
    }

    #[test]
    fn remedies_are_distinct_per_code() {
        let codes = [
            CallErrorCode::InvalidConfiguration,
            CallErrorCode::AgentNotFound,
            CallErrorCode::TargetNotFound,
            CallErrorCode::TargetUnreachable,
            CallErrorCode::ProviderRejected,
        ];
        let remedies: std::collections::HashSet<&str> =
            codes.iter().map(|c| c.remedy()).collect();
        assert_eq!(remedies.len(), codes.len(), "remedies must be distinct");
    }

    #[test]
    fn message_serialization_round_trip() {
        let msg = Message {
            id: MessageId("srv-1".into()),
            conversation_id: ConversationId("conv-1".into()),
            direction: Direction::Outbound,
            body: "Hello".into(),
            media_url: None,
            status: MessageStatus::Delivered,
            client_ref: Some("tmp-abc".into()),
            created_at: Utc::now(),
            sent_at: Some(Utc::now()),
            delivered_at: Some(Utc::now()),
            read_at: None,
        };
        let json = serde_json::to_string(&msg).expect("serialize");
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(msg, parsed);
        assert!(json.contains("\"outbound\""));
        assert!(json.contains("\"delivered\""));
    }

    #[test]
    fn ai_state_defaults_to_all_clear() {
        let state = ConversationAiState::default();
        assert!(!state.ai_handled);
        assert!(!state.ai_paused);
        assert!(!state.ai_handoff_requested);
    }

    proptest::proptest! {
        #[test]
        fn is_temp_matches_only_prefixed_ids(suffix in "[a-z0-9-]{0,24}") {
            let temp = MessageId(format!("{}{suffix}", MessageId::TEMP_PREFIX));
            proptest::prop_assert!(temp.is_temp());

            let server = MessageId(format!("srv-{suffix}"));
            proptest::prop_assert!(!server.is_temp());
        }

        #[test]
        fn draft_text_never_invents_media(body in ".{0,64}") {
            let draft = OutboundDraft::text(body.clone());
            proptest::prop_assert_eq!(draft.body, body);
            proptest::prop_assert!(draft.media_url.is_none());
        }
    }
}
