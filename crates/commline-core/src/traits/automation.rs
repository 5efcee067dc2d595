// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automation trigger trait.

use async_trait::async_trait;

use crate::error::CommlineError;
use crate::traits::adapter::Adapter;
use crate::types::{ChannelKind, ConversationId};

/// The automated agent the handoff coordinator can trigger.
///
/// The coordinator does not decide content; it only gates whether automation
/// is allowed to run and, on an explicit trigger, asks it to act on the
/// current conversation state over the given channel.
#[async_trait]
pub trait Automation: Adapter {
    /// Run the automated agent against the conversation, replying over
    /// `channel`.
    async fn run(
        &self,
        conversation: &ConversationId,
        channel: ChannelKind,
    ) -> Result<(), CommlineError>;
}
