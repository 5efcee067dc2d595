// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock telephony provider with a scriptable status sequence.
//!
//! Call progress has no push channel, so the poller reads
//! [`Telephony::call_status`] on an interval; tests script the sequence of
//! snapshots (and transient errors) the provider reports, and assert on how
//! many reads actually happened.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use commline_core::traits::{Adapter, Telephony};
use commline_core::types::{
    AdapterType, CallErrorCode, CallId, CallParams, CallState, CallStatusSnapshot, HealthStatus,
};
use commline_core::CommlineError;

/// One scripted response to `call_status`.
enum StatusStep {
    Snapshot(CallStatusSnapshot),
    TransientError(String),
}

/// A mock telephony provider for testing.
pub struct MockTelephony {
    /// Scripted status steps, consumed one per poll. When exhausted, the
    /// last snapshot repeats (a real provider keeps reporting its state).
    script: Mutex<VecDeque<StatusStep>>,
    last_snapshot: Mutex<Option<CallStatusSnapshot>>,
    status_calls: AtomicUsize,
    initiate_error: Mutex<Option<(CallErrorCode, String)>>,
    fail_transfer: AtomicBool,
    transfers: Mutex<Vec<(CallId, String)>>,
    hangups: Mutex<Vec<CallId>>,
    next_call_id: AtomicU64,
}

impl MockTelephony {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            last_snapshot: Mutex::new(None),
            status_calls: AtomicUsize::new(0),
            initiate_error: Mutex::new(None),
            fail_transfer: AtomicBool::new(false),
            transfers: Mutex::new(Vec::new()),
            hangups: Mutex::new(Vec::new()),
            next_call_id: AtomicU64::new(1),
        }
    }

    /// Append a snapshot to the status script.
    pub async fn push_status(&self, status: CallState, duration_seconds: u64) {
        self.script
            .lock()
            .await
            .push_back(StatusStep::Snapshot(CallStatusSnapshot {
                status,
                duration_seconds,
                transcript: None,
                error_message: None,
            }));
    }

    /// Append a full snapshot (transcript, error message) to the script.
    pub async fn push_snapshot(&self, snapshot: CallStatusSnapshot) {
        self.script
            .lock()
            .await
            .push_back(StatusStep::Snapshot(snapshot));
    }

    /// Append a transient status-read failure to the script.
    pub async fn push_status_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(StatusStep::TransientError(message.into()));
    }

    /// Make the next `initiate_call` fail with a provider code.
    pub async fn reject_initiate(&self, code: CallErrorCode, detail: impl Into<String>) {
        *self.initiate_error.lock().await = Some((code, detail.into()));
    }

    /// Make `transfer` calls fail.
    pub fn fail_transfers(&self) {
        self.fail_transfer.store(true, Ordering::SeqCst);
    }

    /// How many times `call_status` was read.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub async fn transfers(&self) -> Vec<(CallId, String)> {
        self.transfers.lock().await.clone()
    }

    pub async fn hangups(&self) -> Vec<CallId> {
        self.hangups.lock().await.clone()
    }
}

impl Default for MockTelephony {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockTelephony {
    fn name(&self) -> &str {
        "mock-telephony"
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
impl Telephony for MockTelephony {
    async fn initiate_call(&self, _params: &CallParams) -> Result<CallId, CommlineError> {
        if let Some((code, detail)) = self.initiate_error.lock().await.take() {
            return Err(CommlineError::CallProvider { code, detail });
        }
        let n = self.next_call_id.fetch_add(1, Ordering::SeqCst);
        Ok(CallId(format!("pcall-{n}")))
    }

    async fn call_status(&self, _call: &CallId) -> Result<CallStatusSnapshot, CommlineError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        match self.script.lock().await.pop_front() {
            Some(StatusStep::Snapshot(snapshot)) => {
                *self.last_snapshot.lock().await = Some(snapshot.clone());
                Ok(snapshot)
            }
            Some(StatusStep::TransientError(message)) => Err(CommlineError::transport(message)),
            None => Ok(self.last_snapshot.lock().await.clone().unwrap_or(
                CallStatusSnapshot {
                    status: CallState::Connecting,
                    duration_seconds: 0,
                    transcript: None,
                    error_message: None,
                },
            )),
        }
    }

    async fn transfer(&self, call: &CallId, target: &str) -> Result<(), CommlineError> {
        if self.fail_transfer.load(Ordering::SeqCst) {
            return Err(CommlineError::CallProvider {
                code: CallErrorCode::TargetUnreachable,
                detail: format!("transfer target {target} unreachable"),
            });
        }
        self.transfers
            .lock()
            .await
            .push((call.clone(), target.to_string()));
        Ok(())
    }

    async fn hangup(&self, call: &CallId) -> Result<(), CommlineError> {
        self.hangups.lock().await.push(call.clone());
        Ok(())
    }
}
