// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process simulated backend for `commline shell`.
//!
//! Implements every adapter trait against local memory: a store + change
//! feed that echoes an inbound auto-reply shortly after each outbound send,
//! a telephony provider that walks calls through ringing to in-progress,
//! and an automation agent that replies with a canned message. Lets the
//! whole pipeline run with no external services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use commline_core::error::CommlineError;
use commline_core::traits::{
    Adapter, AiGateStore, Automation, ChangeFeed, FeedSubscription, MessageStore,
    MessageTransport, Telephony,
};
use commline_core::types::{
    AdapterType, CallId, CallParams, CallState, CallStatusSnapshot, ChannelKind,
    ConversationAiState, ConversationId, Direction, HealthStatus, InsertNotice, Message,
    MessageId, MessageStatus, OutboundDraft,
};

/// Delay before the simulated customer replies to an outbound message.
const AUTO_REPLY_DELAY: Duration = Duration::from_millis(800);

/// In-memory store, change feed, and AI gate.
pub struct SimBackend {
    messages: Mutex<HashMap<ConversationId, Vec<Message>>>,
    subscribers: Mutex<HashMap<ConversationId, Vec<mpsc::Sender<InsertNotice>>>>,
    ai_states: Mutex<HashMap<ConversationId, ConversationAiState>>,
    next_id: AtomicU64,
}

impl SimBackend {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
            ai_states: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> MessageId {
        MessageId(format!("sim-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn insert(&self, message: Message) {
        let conversation = message.conversation_id.clone();
        self.messages
            .lock()
            .await
            .entry(conversation.clone())
            .or_default()
            .push(message);

        let notice = InsertNotice {
            conversation_id: conversation.clone(),
            at: Utc::now(),
        };
        let mut subs = self.subscribers.lock().await;
        if let Some(senders) = subs.get_mut(&conversation) {
            senders.retain(|tx| tx.try_send(notice.clone()).is_ok());
        }
    }

    async fn insert_outbound(
        &self,
        conversation: &ConversationId,
        body: &str,
        client_ref: Option<String>,
    ) -> MessageId {
        let id = self.next_id();
        let now = Utc::now();
        self.insert(Message {
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

    async fn insert_inbound(&self, conversation: &ConversationId, body: &str) {
        let id = self.next_id();
        let now = Utc::now();
        self.insert(Message {
            id,
            conversation_id: conversation.clone(),
            direction: Direction::Inbound,
            body: body.to_string(),
            media_url: None,
            status: MessageStatus::Delivered,
            client_ref: None,
            created_at: now,
            sent_at: None,
            delivered_at: Some(now),
            read_at: None,
        })
        .await;
    }
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for SimBackend {
    fn name(&self) -> &str {
        "sim-backend"
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
        Ok(())
    }
}

#[async_trait]
impl MessageStore for SimBackend {
    async fn list_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<Message>, CommlineError> {
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
impl ChangeFeed for SimBackend {
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
impl AiGateStore for SimBackend {
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
        self.ai_states.lock().await.insert(conversation.clone(), state);
        Ok(())
    }
}

/// Transport that confirms into the backend and schedules an inbound
/// auto-reply, so the feed and reconciliation paths are both exercised.
pub struct SimTransport {
    backend: Arc<SimBackend>,
}

impl SimTransport {
    pub fn new(backend: Arc<SimBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Adapter for SimTransport {
    fn name(&self) -> &str {
        "sim-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, CommlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CommlineError> {
        Ok(())
    }
}

#[async_trait]
impl MessageTransport for SimTransport {
    async fn send(
        &self,
        conversation: &ConversationId,
        draft: &OutboundDraft,
        _channel: ChannelKind,
        client_ref: &MessageId,
    ) -> Result<MessageId, CommlineError> {
        let id = self
            .backend
            .insert_outbound(conversation, &draft.body, Some(client_ref.0.clone()))
            .await;

        let backend = Arc::clone(&self.backend);
        let conversation = conversation.clone();
        let echoed = draft.body.clone();
        tokio::spawn(async move {
            tokio::time::sleep(AUTO_REPLY_DELAY).await;
            backend
                .insert_inbound(&conversation, &format!("(sim customer) you said: {echoed}"))
                .await;
        });

        Ok(id)
    }
}

struct SimCall {
    polls: u32,
    hung_up: bool,
}

/// Telephony provider that walks every call from ringing to in-progress
/// across successive status polls.
pub struct SimTelephony {
    calls: Mutex<HashMap<CallId, SimCall>>,
    next_call: AtomicU64,
}

impl SimTelephony {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            next_call: AtomicU64::new(1),
        }
    }
}

impl Default for SimTelephony {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for SimTelephony {
    fn name(&self) -> &str {
        "sim-telephony"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Telephony
    }

    async fn health_check(&self) -> Result<HealthStatus, CommlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CommlineError> {
        Ok(())
    }
}

#[async_trait]
impl Telephony for SimTelephony {
    async fn initiate_call(&self, _params: &CallParams) -> Result<CallId, CommlineError> {
        let id = CallId(format!("simcall-{}", self.next_call.fetch_add(1, Ordering::SeqCst)));
        self.calls.lock().await.insert(
            id.clone(),
            SimCall {
                polls: 0,
                hung_up: false,
            },
        );
        Ok(id)
    }

    async fn call_status(&self, call: &CallId) -> Result<CallStatusSnapshot, CommlineError> {
        let mut calls = self.calls.lock().await;
        let entry = calls
            .get_mut(call)
            .ok_or_else(|| CommlineError::Validation(format!("unknown call {call}")))?;

        if entry.hung_up {
            return Ok(CallStatusSnapshot {
                status: CallState::Ended,
                duration_seconds: u64::from(entry.polls.saturating_sub(1)) * 2,
                transcript: Some("(sim) call transcript".into()),
                error_message: None,
            });
        }

        entry.polls += 1;
        let status = if entry.polls == 1 {
            CallState::Ringing
        } else {
            CallState::InProgress
        };
        Ok(CallStatusSnapshot {
            status,
            duration_seconds: u64::from(entry.polls.saturating_sub(1)) * 2,
            transcript: None,
            error_message: None,
        })
    }

    async fn transfer(&self, _call: &CallId, _target: &str) -> Result<(), CommlineError> {
        Ok(())
    }

    async fn hangup(&self, call: &CallId) -> Result<(), CommlineError> {
        if let Some(entry) = self.calls.lock().await.get_mut(call) {
            entry.hung_up = true;
        }
        Ok(())
    }
}

/// Automation agent that answers with a canned reply through the backend.
pub struct SimAutomation {
    backend: Arc<SimBackend>,
}

impl SimAutomation {
    pub fn new(backend: Arc<SimBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Adapter for SimAutomation {
    fn name(&self) -> &str {
        "sim-automation"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Automation
    }

    async fn health_check(&self) -> Result<HealthStatus, CommlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CommlineError> {
        Ok(())
    }
}

#[async_trait]
impl Automation for SimAutomation {
    async fn run(
        &self,
        conversation: &ConversationId,
        channel: ChannelKind,
    ) -> Result<(), CommlineError> {
        self.backend
            .insert_outbound(
                conversation,
                &format!("(ai agent via {channel}) I can help with that."),
                None,
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_confirms_and_schedules_auto_reply() {
        tokio::time::pause();
        let backend = Arc::new(SimBackend::new());
        let transport = SimTransport::new(Arc::clone(&backend));
        let conv = ConversationId("conv-sim".into());

        transport
            .send(
                &conv,
                &OutboundDraft::text("ping"),
                ChannelKind::Sms,
                &MessageId::new_temp(),
            )
            .await
            .unwrap();
        tokio::time::sleep(AUTO_REPLY_DELAY * 2).await;

        let messages = backend.list_messages(&conv).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].direction, Direction::Outbound);
        assert_eq!(messages[1].direction, Direction::Inbound);
    }

    #[tokio::test]
    async fn telephony_walks_ringing_then_in_progress() {
        let telephony = SimTelephony::new();
        let id = telephony
            .initiate_call(&CallParams {
                target: "+15550100".into(),
                agent_id: None,
                caller_id: None,
            })
            .await
            .unwrap();

        assert_eq!(
            telephony.call_status(&id).await.unwrap().status,
            CallState::Ringing
        );
        assert_eq!(
            telephony.call_status(&id).await.unwrap().status,
            CallState::InProgress
        );

        telephony.hangup(&id).await.unwrap();
        assert_eq!(
            telephony.call_status(&id).await.unwrap().status,
            CallState::Ended
        );
    }
}
