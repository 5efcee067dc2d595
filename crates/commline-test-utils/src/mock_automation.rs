// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted automation adapter.
//!
//! Records every run and can be gated so a run stays in flight until the
//! test releases it, which is how overlapping-invocation behavior is
//! exercised deterministically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use commline_core::error::CommlineError;
use commline_core::traits::{Adapter, Automation};
use commline_core::types::{AdapterType, ChannelKind, ConversationId, HealthStatus};

pub struct MockAutomation {
    runs: Mutex<Vec<(ConversationId, ChannelKind)>>,
    gate: Arc<Notify>,
    gated: AtomicBool,
    fail_next: AtomicBool,
}

impl MockAutomation {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(Vec::new()),
            gate: Arc::new(Notify::new()),
            gated: AtomicBool::new(false),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next runs park until [`release`](Self::release) is called.
    pub fn hold_runs(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Release one parked run.
    pub fn release(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.gate.notify_one();
    }

    /// Make the next run fail with a transport error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub async fn runs(&self) -> Vec<(ConversationId, ChannelKind)> {
        self.runs.lock().await.clone()
    }

    pub async fn run_count(&self) -> usize {
        self.runs.lock().await.len()
    }
}

impl Default for MockAutomation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockAutomation {
    fn name(&self) -> &str {
        "mock-automation"
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
impl Automation for MockAutomation {
    async fn run(
        &self,
        conversation: &ConversationId,
        channel: ChannelKind,
    ) -> Result<(), CommlineError> {
        if self.gated.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CommlineError::transport("automation backend unavailable"));
        }
        self.runs.lock().await.push((conversation.clone(), channel));
        Ok(())
    }
}
