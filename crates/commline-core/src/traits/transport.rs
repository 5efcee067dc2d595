// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message transport trait.

use async_trait::async_trait;

use crate::error::CommlineError;
use crate::traits::adapter::Adapter;
use crate::types::{ChannelKind, ConversationId, MessageId, OutboundDraft};

/// Adapter that actually moves outbound message bytes to the provider.
///
/// The optimistic tracker never calls this directly; the conversation stream
/// drives it from a fire-and-forget background task. Failure must be
/// distinguishable from success so the stub can be reverted.
#[async_trait]
pub trait MessageTransport: Adapter {
    /// Deliver a draft to the remote provider over the given channel.
    ///
    /// `client_ref` is the client-generated temporary id of the optimistic
    /// stub; backends that can pass it through echo it back on the confirmed
    /// record, enabling exact-match reconciliation. Backends that cannot
    /// simply ignore it.
    ///
    /// Returns the server-assigned id of the accepted message.
    async fn send(
        &self,
        conversation: &ConversationId,
        draft: &OutboundDraft,
        channel: ChannelKind,
        client_ref: &MessageId,
    ) -> Result<MessageId, CommlineError>;
}
