// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call status poller.
//!
//! Call progress has no push channel, so a background task reads the
//! provider record on an interval and feeds the session machine. Transient
//! poll failures back off exponentially (with jitter) without touching the
//! session; a hard deadline bounds how long a session can sit non-terminal
//! when the provider record never resolves.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use commline_config::model::CallConfig;
use commline_core::traits::Telephony;
use commline_core::types::{CallOrigin, CallState, CallStatusSnapshot};

use crate::machine::{CallSession, CallSignal};

/// Timing knobs for one poller task.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Base interval between successful polls.
    pub interval: Duration,
    /// Ceiling for the backoff delay after consecutive failures.
    pub backoff_max: Duration,
    /// Hard bound on total polling time before the session is failed.
    pub max_poll_duration: Duration,
}

impl From<&CallConfig> for PollerConfig {
    fn from(cfg: &CallConfig) -> Self {
        Self {
            interval: Duration::from_millis(cfg.poll_interval_ms),
            backoff_max: Duration::from_millis(cfg.poll_backoff_max_ms),
            max_poll_duration: Duration::from_secs(cfg.max_poll_duration_secs),
        }
    }
}

/// Handle to a running poller task. Detaching is idempotent and also
/// happens on drop.
pub struct PollerHandle {
    cancel: CancellationToken,
}

impl PollerHandle {
    /// Stop polling. The session is left in whatever state it reached.
    pub fn detach(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct StatusPoller;

impl StatusPoller {
    /// Spawn the polling task for a session.
    ///
    /// The task self-detaches once the session is terminal. Simulated
    /// sessions have no provider record and the task exits immediately.
    pub fn attach(
        session: Arc<Mutex<CallSession>>,
        telephony: Arc<dyn Telephony>,
        config: PollerConfig,
    ) -> PollerHandle {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            poll_loop(session, telephony, config, task_cancel).await;
        });
        PollerHandle { cancel }
    }
}

async fn poll_loop(
    session: Arc<Mutex<CallSession>>,
    telephony: Arc<dyn Telephony>,
    config: PollerConfig,
    cancel: CancellationToken,
) {
    {
        let guard = session.lock().await;
        if guard.origin() == CallOrigin::Simulated {
            debug!(call = %guard.call_id(), "simulated session, nothing to poll");
            return;
        }
    }

    let started = tokio::time::Instant::now();
    let mut failures: u32 = 0;

    loop {
        let delay = next_delay(&config, failures);
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("poller detached");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        if started.elapsed() >= config.max_poll_duration {
            let mut guard = session.lock().await;
            if !guard.is_terminal() {
                warn!(call = %guard.call_id(), "poll deadline reached, failing session");
                let _ = guard
                    .apply_signal(CallSignal::Failed(Some("call status polling timed out".into())));
            }
            return;
        }

        let call_id = {
            let guard = session.lock().await;
            if guard.is_terminal() {
                return;
            }
            guard.call_id().clone()
        };

        match telephony.call_status(&call_id).await {
            Ok(snapshot) => {
                failures = 0;
                let mut guard = session.lock().await;
                if guard.is_terminal() {
                    return;
                }
                apply_snapshot(&mut guard, snapshot);
                if guard.is_terminal() {
                    debug!(call = %guard.call_id(), state = %guard.state(), "session terminal, poller stopping");
                    return;
                }
            }
            Err(err) => {
                failures = failures.saturating_add(1);
                warn!(call = %call_id, error = %err, failures, "call status poll failed");
            }
        }
    }
}

/// Map the polled remote record onto the local machine. Stale snapshots
/// (the machine is already ahead) are dropped by `apply_signal`.
fn apply_snapshot(session: &mut CallSession, snapshot: CallStatusSnapshot) {
    if let Some(transcript) = snapshot.transcript {
        let _ = session.record_transcript(transcript);
    }
    let signal = match snapshot.status {
        CallState::Ringing => Some(CallSignal::Ringing),
        CallState::InProgress | CallState::OnHold | CallState::Transferring => {
            Some(CallSignal::Answered)
        }
        CallState::Ended => Some(CallSignal::Completed),
        CallState::Failed => Some(CallSignal::Failed(snapshot.error_message)),
        // The provider never regresses a local session to idle/connecting.
        CallState::Idle | CallState::Connecting => None,
    };
    if let Some(signal) = signal {
        if let Err(err) = session.apply_signal(signal) {
            debug!(call = %session.call_id(), error = %err, "snapshot signal dropped");
        }
    }
}

/// Delay before the next poll: the base interval after a success, doubling
/// per consecutive failure up to the ceiling, plus up to 10% jitter so
/// restarted workspaces do not poll in lockstep.
fn next_delay(config: &PollerConfig, failures: u32) -> Duration {
    let base = if failures == 0 {
        config.interval
    } else {
        let shift = failures.min(16);
        config
            .interval
            .saturating_mul(1u32 << shift.min(31))
            .min(config.backoff_max)
    };
    let jitter_cap = (base.as_millis() / 10) as u64;
    if jitter_cap == 0 {
        return base;
    }
    let jitter = rand::thread_rng().gen_range(0..=jitter_cap);
    base + Duration::from_millis(jitter)
}
