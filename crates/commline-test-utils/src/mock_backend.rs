// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory backend mock: message store, change feed, and AI gate store.
//!
//! `MockBackend` plays the hosted data store and its push channel. Confirmed
//! messages inserted through it fire payload-less insert notices to every
//! open subscription, exactly like the real change feed: subscribers must
//! re-query the list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use commline_core::traits::{Adapter, AiGateStore, ChangeFeed, FeedSubscription, MessageStore};
use commline_core::types::{
    AdapterType, ConversationAiState, ConversationId, Direction, HealthStatus, InsertNotice,
    Message, MessageId, MessageStatus,
};
use commline_core::CommlineError;

/// An in-memory store + feed + AI gate for deterministic testing.
pub struct MockBackend {
    messages: Mutex<HashMap<ConversationId, Vec<Message>>>,
    subscribers: Mutex<HashMap<ConversationId, Vec<mpsc::Sender<InsertNotice>>>>,
    ai_states: Mutex<HashMap<ConversationId, ConversationAiState>>,
    fail_next_fetch: AtomicBool,
    next_server_id: AtomicU64,
    list_calls: AtomicU64,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
            ai_states: Mutex::new(HashMap::new()),
            fail_next_fetch: AtomicBool::new(false),
            next_server_id: AtomicU64::new(1),
            list_calls: AtomicU64::new(0),
        }
    }

    /// How many times `list_messages` has been called (debounce assertions).
    pub fn list_call_count(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Allocate a server-side message id.
    pub fn next_id(&self) -> MessageId {
        let n = self.next_server_id.fetch_add(1, Ordering::SeqCst);
        MessageId(format!("srv-{n}"))
    }

    /// Insert a confirmed message and notify every open subscription.
    pub async fn insert_confirmed(&self, message: Message) {
        let conversation = message.conversation_id.clone();
        self.messages
            .lock()
            .await
            .entry(conversation.clone())
            .or_default()
            .push(message);
        self.notify(&conversation).await;
    }

    /// Build and insert a confirmed outbound record, optionally echoing a
    /// client reference.
    pub async fn confirm_outbound(
        &self,
        conversation: &ConversationId,
        body: &str,
        client_ref: Option<String>,
    ) -> MessageId {
        let id = self.next_id();
        let now = Utc::now();
        self.insert_confirmed(Message {
            id: id.clone(),
            conversation_id: conversation.clone(),
            direction: Direction::Outbound,
            body: body.to_string(),
            media_url: None,
            status: MessageStatus::Sent,
            client_ref,
            created_at: now,
            sent_at: Some(now),
            delivered_at: None,
            read_at: None,
        })
        .await;
        id
    }

    /// Build and insert a confirmed inbound record.
    pub async fn receive_inbound(&self, conversation: &ConversationId, body: &str) -> MessageId {
        let id = self.next_id();
        self.insert_confirmed(Message {
            id: id.clone(),
            conversation_id: conversation.clone(),
            direction: Direction::Inbound,
            body: body.to_string(),
            media_url: None,
            status: MessageStatus::Delivered,
            client_ref: None,
            created_at: Utc::now(),
            sent_at: None,
            delivered_at: Some(Utc::now()),
            read_at: None,
        })
        .await;
        id
    }

    /// Fire an insert notice without inserting anything (spurious wakeup).
    pub async fn notify(&self, conversation: &ConversationId) {
        let notice = InsertNotice {
            conversation_id: conversation.clone(),
            at: Utc::now(),
        };
        let mut subs = self.subscribers.lock().await;
        if let Some(senders) = subs.get_mut(conversation) {
            // A full buffer is backpressure, not a disconnect; the pending
            // notices already guarantee the subscriber will re-fetch.
            senders.retain(|tx| {
                !matches!(
                    tx.try_send(notice.clone()),
                    Err(mpsc::error::TrySendError::Closed(_))
                )
            });
        }
    }

    /// Drop all feed senders for a conversation, simulating a transport
    /// disconnection (subscription streams end without a cancel).
    pub async fn disconnect_feed(&self, conversation: &ConversationId) {
        self.subscribers.lock().await.remove(conversation);
    }

    /// Make the next `list_messages` call fail with a storage error.
    pub fn fail_next_fetch(&self) {
        self.fail_next_fetch.store(true, Ordering::SeqCst);
    }

    /// Number of confirmed messages held for a conversation.
    pub async fn confirmed_count(&self, conversation: &ConversationId) -> usize {
        self.messages
            .lock()
            .await
            .get(conversation)
            .map_or(0, Vec::len)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, CommlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CommlineError> {
        self.subscribers.lock().await.clear();
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MockBackend {
    async fn list_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<Message>, CommlineError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
            return Err(CommlineError::Storage {
                source: Box::new(std::io::Error::other("injected fetch failure")),
            });
        }
        Ok(self
            .messages
            .lock()
            .await
            .get(conversation)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChangeFeed for MockBackend {
    async fn subscribe(
        &self,
        conversation: &ConversationId,
    ) -> Result<FeedSubscription, CommlineError> {
        let (tx, rx) = mpsc::channel(64);
        self.subscribers
            .lock()
            .await
            .entry(conversation.clone())
            .or_default()
            .push(tx);
        Ok(FeedSubscription::new(
            conversation.clone(),
            rx,
            CancellationToken::new(),
        ))
    }
}

#[async_trait]
impl AiGateStore for MockBackend {
    async fn load_ai_state(
        &self,
        conversation: &ConversationId,
    ) -> Result<ConversationAiState, CommlineError> {
        Ok(self
            .ai_states
            .lock()
            .await
            .get(conversation)
            .copied()
            .unwrap_or_default())
    }

    async fn save_ai_state(
        &self,
        conversation: &ConversationId,
        state: ConversationAiState,
    ) -> Result<(), CommlineError> {
        self.ai_states
            .lock()
            .await
            .insert(conversation.clone(), state);
        Ok(())
    }
}

/// Convenience for tests that need an `Arc<MockBackend>` under the trait
/// objects the stream constructor expects.
pub fn backend_handles(
    backend: &Arc<MockBackend>,
) -> (
    Arc<dyn MessageStore>,
    Arc<dyn ChangeFeed>,
    Arc<dyn AiGateStore>,
) {
    (
        Arc::clone(backend) as Arc<dyn MessageStore>,
        Arc::clone(backend) as Arc<dyn ChangeFeed>,
        Arc::clone(backend) as Arc<dyn AiGateStore>,
    )
}
