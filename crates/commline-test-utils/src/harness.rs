// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pre-wired mock adapters for integration tests.

use std::sync::Arc;

use commline_core::traits::{AiGateStore, ChangeFeed, MessageStore, MessageTransport, Telephony};
use commline_core::types::ConversationId;

use crate::mock_backend::MockBackend;
use crate::mock_telephony::MockTelephony;
use crate::mock_transport::MockTransport;

/// A full mock environment: backend (store + feed + AI gate), a transport
/// that auto-confirms into the backend, and a scriptable telephony provider.
pub struct TestHarness {
    pub backend: Arc<MockBackend>,
    pub transport: Arc<MockTransport>,
    pub telephony: Arc<MockTelephony>,
    pub conversation: ConversationId,
}

impl TestHarness {
    /// Harness whose transport echoes client references (exact-match
    /// reconciliation path).
    pub fn new() -> Self {
        let backend = Arc::new(MockBackend::new());
        Self {
            transport: Arc::new(MockTransport::confirming(Arc::clone(&backend))),
            telephony: Arc::new(MockTelephony::new()),
            backend,
            conversation: ConversationId("conv-test".into()),
        }
    }

    /// Harness whose transport does not echo client references, forcing the
    /// heuristic content-match reconciliation path.
    pub fn without_echo() -> Self {
        let backend = Arc::new(MockBackend::new());
        Self {
            transport: Arc::new(
                MockTransport::confirming(Arc::clone(&backend)).without_echo(),
            ),
            telephony: Arc::new(MockTelephony::new()),
            backend,
            conversation: ConversationId("conv-test".into()),
        }
    }

    pub fn store(&self) -> Arc<dyn MessageStore> {
        Arc::clone(&self.backend) as Arc<dyn MessageStore>
    }

    pub fn feed(&self) -> Arc<dyn ChangeFeed> {
        Arc::clone(&self.backend) as Arc<dyn ChangeFeed>
    }

    pub fn gate_store(&self) -> Arc<dyn AiGateStore> {
        Arc::clone(&self.backend) as Arc<dyn AiGateStore>
    }

    pub fn transport_handle(&self) -> Arc<dyn MessageTransport> {
        Arc::clone(&self.transport) as Arc<dyn MessageTransport>
    }

    pub fn telephony_handle(&self) -> Arc<dyn Telephony> {
        Arc::clone(&self.telephony) as Arc<dyn Telephony>
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
