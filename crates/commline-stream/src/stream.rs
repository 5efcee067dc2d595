// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation real-time stream.
//!
//! Owns the authoritative, server-confirmed message list for one conversation
//! and merges it with the optimistic tracker's stubs into a single published
//! snapshot. The push channel only signals "insert occurred", so every
//! (debounced) notice triggers a full re-fetch of the confirmed list, which
//! is then fed to the tracker's reconciliation.
//!
//! Confirmed messages are ordered by server timestamp; stubs are appended
//! after the last confirmed message, since their true server timestamp is
//! unknown until confirmation. There is no guarantee that two concurrently
//! submitted messages are confirmed in submission order.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use commline_config::model::StreamConfig;
use commline_core::error::CommlineError;
use commline_core::traits::{ChangeFeed, FeedSubscription, MessageStore, MessageTransport};
use commline_core::types::{ChannelKind, ConversationId, Message, MessageId, OutboundDraft};

use crate::tracker::OptimisticTracker;

/// A dismissable, user-visible error surfaced by a background task.
///
/// Background failures (send, re-fetch, feed disconnection) never crash the
/// stream; they land here and the stream remains usable for the next action.
#[derive(Debug, Clone)]
pub struct StreamError {
    pub message: String,
    pub at: DateTime<Utc>,
}

impl StreamError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Confirmed list plus optimistic stubs, guarded together so a re-fetch and
/// a concurrent send interleave without tearing the snapshot.
struct StreamState {
    confirmed: Vec<Message>,
    tracker: OptimisticTracker,
}

impl StreamState {
    /// Merged, time-ordered view: confirmed (server order) then stubs.
    fn merged(&self) -> Vec<Message> {
        let mut all = self.confirmed.clone();
        all.extend(self.tracker.stubs().iter().cloned());
        all
    }
}

/// Real-time stream for one conversation.
///
/// Constructed via [`ConversationStream::subscribe`]; dropping the stream (or
/// calling [`ConversationStream::unsubscribe`], which is idempotent) cancels
/// the push subscription and stops the feed task.
pub struct ConversationStream {
    conversation_id: ConversationId,
    transport: Arc<dyn MessageTransport>,
    state: Arc<Mutex<StreamState>>,
    snapshot_tx: Arc<watch::Sender<Vec<Message>>>,
    errors_tx: mpsc::UnboundedSender<StreamError>,
    errors_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<StreamError>>>,
    cancel: CancellationToken,
}

impl ConversationStream {
    /// Subscribe to a conversation: open the change-feed subscription, fetch
    /// the initial confirmed list, and spawn the feed task.
    ///
    /// The subscription opens before the initial fetch so an insert landing
    /// during the fetch queues a notice the feed task drains; opening them
    /// the other way round would leave such a message invisible until an
    /// unrelated later insert.
    pub async fn subscribe(
        conversation: ConversationId,
        store: Arc<dyn MessageStore>,
        feed: Arc<dyn ChangeFeed>,
        transport: Arc<dyn MessageTransport>,
        config: &StreamConfig,
    ) -> Result<Self, CommlineError> {
        let subscription = feed.subscribe(&conversation).await?;

        let mut confirmed = store.list_messages(&conversation).await?;
        sort_server_order(&mut confirmed);

        let state = Arc::new(Mutex::new(StreamState {
            confirmed,
            tracker: OptimisticTracker::new(conversation.clone()),
        }));
        let initial = state.lock().await.merged();
        let snapshot_tx = Arc::new(watch::channel(initial).0);
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let cancel = CancellationToken::new();

        tokio::spawn(feed_task(
            conversation.clone(),
            subscription,
            Arc::clone(&state),
            store,
            Arc::clone(&snapshot_tx),
            errors_tx.clone(),
            Duration::from_millis(config.refetch_debounce_ms),
            cancel.clone(),
        ));

        debug!(conversation = %conversation, "conversation stream subscribed");

        Ok(Self {
            conversation_id: conversation,
            transport,
            state,
            snapshot_tx,
            errors_tx,
            errors_rx: std::sync::Mutex::new(Some(errors_rx)),
            cancel,
        })
    }

    /// The conversation this stream is scoped to.
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Watch receiver for the merged message snapshot.
    pub fn snapshot_rx(&self) -> watch::Receiver<Vec<Message>> {
        self.snapshot_tx.subscribe()
    }

    /// Current merged snapshot.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.merged()
    }

    /// Take the receiver for dismissable user-visible errors. Yields
    /// `Some` only on the first call.
    pub fn take_error_rx(&self) -> Option<mpsc::UnboundedReceiver<StreamError>> {
        self.errors_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    /// Submit an outbound draft.
    ///
    /// The stub appears in the snapshot immediately and the send runs
    /// fire-and-forget in the background: success leaves the stub for
    /// reconciliation to retire; failure reverts it and surfaces a
    /// [`StreamError`]. A missing channel is a synchronous validation error
    /// and never reaches the background task.
    pub async fn send(
        &self,
        draft: OutboundDraft,
        channel: Option<ChannelKind>,
    ) -> Result<MessageId, CommlineError> {
        let Some(channel) = channel else {
            return Err(CommlineError::Validation(
                "no outbound channel selected".into(),
            ));
        };

        let stub_id = {
            let mut state = self.state.lock().await;
            let id = state.tracker.submit(&draft);
            self.snapshot_tx.send_replace(state.merged());
            id
        };

        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);
        let snapshot_tx = Arc::clone(&self.snapshot_tx);
        let errors_tx = self.errors_tx.clone();
        let conversation = self.conversation_id.clone();
        let stub = stub_id.clone();

        tokio::spawn(async move {
            match transport.send(&conversation, &draft, channel, &stub).await {
                Ok(server_id) => {
                    debug!(
                        conversation = %conversation,
                        stub = %stub,
                        server_id = %server_id,
                        "outbound message accepted"
                    );
                    // The stub stays visible until the change feed delivers
                    // the confirmed record and reconciliation retires it.
                }
                Err(e) => {
                    warn!(
                        conversation = %conversation,
                        stub = %stub,
                        error = %e,
                        "outbound send failed; reverting stub"
                    );
                    let mut state = state.lock().await;
                    state.tracker.revert(&stub);
                    snapshot_tx.send_replace(state.merged());
                    let _ = errors_tx.send(StreamError::new(format!(
                        "message could not be sent: {e}"
                    )));
                }
            }
        });

        Ok(stub_id)
    }

    /// Cancel the push subscription and stop the feed task. Idempotent;
    /// safe to call when teardown races with a final notice.
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ConversationStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Server ordering: timestamp, then id for a stable tie-break.
fn sort_server_order(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.0.cmp(&b.id.0))
    });
}

#[allow(clippy::too_many_arguments)]
async fn feed_task(
    conversation: ConversationId,
    mut subscription: FeedSubscription,
    state: Arc<Mutex<StreamState>>,
    store: Arc<dyn MessageStore>,
    snapshot_tx: Arc<watch::Sender<Vec<Message>>>,
    errors_tx: mpsc::UnboundedSender<StreamError>,
    debounce: Duration,
    cancel: CancellationToken,
) {
    loop {
        let notice = tokio::select! {
            _ = cancel.cancelled() => break,
            notice = subscription.recv() => notice,
        };

        if notice.is_none() {
            // Feed side disconnected. The transport does not self-heal; the
            // owner decides whether to re-subscribe.
            if !cancel.is_cancelled() {
                warn!(
                    conversation = %conversation,
                    "change feed disconnected; inserts will no longer be delivered"
                );
                let _ = errors_tx.send(StreamError::new(
                    "live updates disconnected; re-open the conversation to resume",
                ));
            }
            break;
        }

        // Coalesce bursts: one re-fetch covers every notice in the window.
        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
            let mut coalesced = 0usize;
            while subscription.try_recv().is_some() {
                coalesced += 1;
            }
            if coalesced > 0 {
                debug!(
                    conversation = %conversation,
                    coalesced,
                    "coalesced insert notices into one re-fetch"
                );
            }
        }

        match store.list_messages(&conversation).await {
            Ok(mut confirmed) => {
                sort_server_order(&mut confirmed);
                let mut state = state.lock().await;
                let retired = state.tracker.reconcile(&confirmed);
                state.confirmed = confirmed;
                snapshot_tx.send_replace(state.merged());
                if retired > 0 {
                    debug!(conversation = %conversation, retired, "reconciled stubs");
                }
            }
            Err(e) => {
                // Transient: keep the subscription alive and try again on
                // the next notice.
                warn!(conversation = %conversation, error = %e, "confirmed-list re-fetch failed");
                let _ = errors_tx.send(StreamError::new(format!(
                    "conversation refresh failed: {e}"
                )));
            }
        }
    }

    subscription.unsubscribe();
    debug!(conversation = %conversation, "feed task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use commline_core::types::{Direction, MessageStatus};

    fn msg(id: &str, body: &str, secs: i64) -> Message {
        Message {
            id: MessageId(id.into()),
            conversation_id: ConversationId("conv-1".into()),
            direction: Direction::Inbound,
            body: body.into(),
            media_url: None,
            status: MessageStatus::Delivered,
            client_ref: None,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            sent_at: None,
            delivered_at: None,
            read_at: None,
        }
    }

    #[test]
    fn server_order_sorts_by_timestamp_then_id() {
        let mut messages = vec![msg("b", "2", 200), msg("a", "3", 200), msg("c", "1", 100)];
        sort_server_order(&mut messages);
        let ids: Vec<&str> = messages.iter().map(|m| m.id.0.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn merged_appends_stubs_after_confirmed() {
        let mut tracker = OptimisticTracker::new(ConversationId("conv-1".into()));
        tracker.submit(&OutboundDraft::text("pending"));

        let state = StreamState {
            confirmed: vec![msg("a", "first", 100), msg("b", "second", 200)],
            tracker,
        };
        let merged = state.merged();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].body, "first");
        assert_eq!(merged[1].body, "second");
        assert_eq!(merged[2].body, "pending");
        assert!(merged[2].id.is_temp());
    }
}
