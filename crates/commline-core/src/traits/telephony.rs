// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony provider trait.
//!
//! The provider owns the media path and is treated as a black box that
//! reports status. Call progress has no push channel; the poller reads the
//! authoritative record through [`Telephony::call_status`] on an interval.

use async_trait::async_trait;

use crate::error::CommlineError;
use crate::traits::adapter::Adapter;
use crate::types::{CallId, CallParams, CallStatusSnapshot};

/// Adapter for the external real-time-communication provider.
#[async_trait]
pub trait Telephony: Adapter {
    /// Start an outbound call.
    ///
    /// Failures carry a [`crate::types::CallErrorCode`] from the closed
    /// taxonomy via [`CommlineError::CallProvider`].
    async fn initiate_call(&self, params: &CallParams) -> Result<CallId, CommlineError>;

    /// Read the authoritative remote record for a call. Polled, not pushed.
    async fn call_status(&self, call: &CallId) -> Result<CallStatusSnapshot, CommlineError>;

    /// Ask the provider to transfer the call to a new target.
    async fn transfer(&self, call: &CallId, target: &str) -> Result<(), CommlineError>;

    /// Ask the provider to end the call. Best-effort; the local machine has
    /// already transitioned before this is awaited.
    async fn hangup(&self, call: &CallId) -> Result<(), CommlineError>;
}
