// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change-feed subscription trait and the subscription handle.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::CommlineError;
use crate::traits::adapter::Adapter;
use crate::types::{ConversationId, InsertNotice};

/// Push-notification adapter scoped to one conversation.
///
/// The feed delivers payload-less "insert occurred" notices; the consumer
/// must re-query the confirmed message list through the store.
#[async_trait]
pub trait ChangeFeed: Adapter {
    /// Open a per-conversation subscription.
    ///
    /// The returned handle owns the subscription; dropping it or calling
    /// [`FeedSubscription::unsubscribe`] cancels delivery.
    async fn subscribe(
        &self,
        conversation: &ConversationId,
    ) -> Result<FeedSubscription, CommlineError>;
}

/// Handle to an open change-feed subscription.
///
/// Teardown is idempotent: `unsubscribe` is safe to call when already
/// cancelled, since component teardown can race with a final notice.
pub struct FeedSubscription {
    conversation_id: ConversationId,
    notices: mpsc::Receiver<InsertNotice>,
    cancel: CancellationToken,
}

impl FeedSubscription {
    /// Build a subscription handle from its parts. Feed adapters construct
    /// this after wiring their push source to the sender side of `notices`.
    pub fn new(
        conversation_id: ConversationId,
        notices: mpsc::Receiver<InsertNotice>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            conversation_id,
            notices,
            cancel,
        }
    }

    /// The conversation this subscription is scoped to.
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Receive the next insert notice.
    ///
    /// Returns `None` once the subscription is cancelled or the feed side
    /// disconnects (silent stop: the transport does not self-heal).
    pub async fn recv(&mut self) -> Option<InsertNotice> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            notice = self.notices.recv() => notice,
        }
    }

    /// Non-blocking receive, used to drain a burst of notices after a
    /// debounce window. Returns `None` when no notice is queued or the
    /// subscription is cancelled.
    pub fn try_recv(&mut self) -> Option<InsertNotice> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.notices.try_recv().ok()
    }

    /// Cancel the subscription. Idempotent.
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    /// Whether the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
