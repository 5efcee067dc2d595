// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side trait for the hosted message store.

use async_trait::async_trait;

use crate::error::CommlineError;
use crate::traits::adapter::Adapter;
use crate::types::{ConversationId, Message};

/// Read access to the authoritative, server-confirmed message list.
///
/// The push channel only signals that something changed, so the stream
/// re-fetches the full list through this trait on every (debounced) notice.
#[async_trait]
pub trait MessageStore: Adapter {
    /// Fetch the complete confirmed message list for a conversation,
    /// ordered by server timestamp.
    async fn list_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<Message>, CommlineError>;
}
