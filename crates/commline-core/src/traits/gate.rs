// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for the per-conversation AI responsibility gate.

use async_trait::async_trait;

use crate::error::CommlineError;
use crate::traits::adapter::Adapter;
use crate::types::{ConversationAiState, ConversationId};

/// Durable storage for [`ConversationAiState`].
///
/// The state lattice persists for the life of the conversation and is never
/// deleted; the coordinator mutates it through this trait.
#[async_trait]
pub trait AiGateStore: Adapter {
    /// Load the AI state for a conversation, defaulting when none exists.
    async fn load_ai_state(
        &self,
        conversation: &ConversationId,
    ) -> Result<ConversationAiState, CommlineError>;

    /// Persist the AI state for a conversation.
    async fn save_ai_state(
        &self,
        conversation: &ConversationId,
        state: ConversationAiState,
    ) -> Result<(), CommlineError>;
}
