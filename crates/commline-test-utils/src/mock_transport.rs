// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock outbound transport with injectable failures.
//!
//! `MockTransport` captures every send for assertion. When wired to a
//! [`MockBackend`], a successful send auto-confirms: the accepted message is
//! inserted as a confirmed record (echoing the client reference when
//! configured) and the backend fires an insert notice, reproducing the real
//! send -> server insert -> push notice flow.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use commline_core::traits::{Adapter, MessageTransport};
use commline_core::types::{
    AdapterType, ChannelKind, ConversationId, HealthStatus, MessageId, OutboundDraft,
};
use commline_core::CommlineError;

use crate::mock_backend::MockBackend;

/// A captured outbound send.
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub conversation_id: ConversationId,
    pub draft: OutboundDraft,
    pub channel: ChannelKind,
    pub client_ref: MessageId,
}

/// A mock message transport for testing.
pub struct MockTransport {
    sent: Mutex<Vec<SentRecord>>,
    /// Queued failures: each send pops one; `Some(reason)` fails the send.
    failures: Mutex<VecDeque<Option<String>>>,
    /// Backend to auto-confirm successful sends into, if any.
    backend: Option<Arc<MockBackend>>,
    /// Whether confirmed records echo the client reference.
    echo_client_ref: bool,
}

impl MockTransport {
    /// A standalone transport: sends succeed and are only captured.
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            backend: None,
            echo_client_ref: true,
        }
    }

    /// A transport that auto-confirms successful sends into `backend`.
    pub fn confirming(backend: Arc<MockBackend>) -> Self {
        Self {
            backend: Some(backend),
            ..Self::new()
        }
    }

    /// Disable client-reference echo, forcing content-match reconciliation.
    pub fn without_echo(mut self) -> Self {
        self.echo_client_ref = false;
        self
    }

    /// Queue a failure for the next send.
    pub async fn fail_next(&self, reason: impl Into<String>) {
        self.failures.lock().await.push_back(Some(reason.into()));
    }

    /// All captured sends.
    pub async fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
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
impl MessageTransport for MockTransport {
    async fn send(
        &self,
        conversation: &ConversationId,
        draft: &OutboundDraft,
        channel: ChannelKind,
        client_ref: &MessageId,
    ) -> Result<MessageId, CommlineError> {
        if let Some(Some(reason)) = self.failures.lock().await.pop_front() {
            return Err(CommlineError::transport(reason));
        }

        self.sent.lock().await.push(SentRecord {
            conversation_id: conversation.clone(),
            draft: draft.clone(),
            channel,
            client_ref: client_ref.clone(),
        });

        match &self.backend {
            Some(backend) => {
                let echoed = self.echo_client_ref.then(|| client_ref.0.clone());
                Ok(backend
                    .confirm_outbound(conversation, &draft.body, echoed)
                    .await)
            }
            None => Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4()))),
        }
    }
}
