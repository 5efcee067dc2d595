// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single-call owner.
//!
//! `ActiveLine` holds at most one non-terminal [`CallSession`] and is the
//! only place allowed to create one. Every call operation goes through it,
//! which is what makes "one live call per workspace" an invariant instead
//! of a convention.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use commline_core::error::CommlineError;
use commline_core::traits::Telephony;
use commline_core::types::{CallId, CallOrigin, CallParams};

use crate::machine::CallSession;
use crate::poller::{PollerConfig, PollerHandle, StatusPoller};

/// Shared handle to the session under the line's lock.
pub type SharedSession = Arc<Mutex<CallSession>>;

/// Owner of the workspace's one call slot.
pub struct ActiveLine {
    telephony: Arc<dyn Telephony>,
    poller_config: PollerConfig,
    slot: Mutex<Option<LineSlot>>,
}

struct LineSlot {
    session: SharedSession,
    poller: Option<PollerHandle>,
}

impl ActiveLine {
    pub fn new(telephony: Arc<dyn Telephony>, poller_config: PollerConfig) -> Self {
        Self {
            telephony,
            poller_config,
            slot: Mutex::new(None),
        }
    }

    /// The current session, if the slot holds one (terminal or not).
    pub async fn session(&self) -> Option<SharedSession> {
        let slot = self.slot.lock().await;
        slot.as_ref().map(|s| Arc::clone(&s.session))
    }

    /// Whether the slot holds a non-terminal session.
    pub async fn busy(&self) -> bool {
        let slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(s) => !s.session.lock().await.is_terminal(),
            None => false,
        }
    }

    /// Start an outbound provider call and attach the status poller.
    ///
    /// The slot lock is held across the provider round trip so two racing
    /// initiations cannot both succeed: the loser gets `SessionBusy`.
    pub async fn initiate(&self, params: CallParams) -> Result<SharedSession, CommlineError> {
        let mut slot = self.slot.lock().await;
        self.guard_free(&slot).await?;

        let call_id = self.telephony.initiate_call(&params).await?;
        info!(call = %call_id, target = %params.target, "outbound call initiated");

        let session = Arc::new(Mutex::new(CallSession::new_outbound(
            call_id,
            params.target,
            CallOrigin::Provider,
        )));
        let poller = StatusPoller::attach(
            Arc::clone(&session),
            Arc::clone(&self.telephony),
            self.poller_config.clone(),
        );
        *slot = Some(LineSlot {
            session: Arc::clone(&session),
            poller: Some(poller),
        });
        Ok(session)
    }

    /// Start a locally simulated call. No provider record exists, so no
    /// poller is attached; the session only moves on explicit user actions.
    pub async fn initiate_simulated(
        &self,
        target: impl Into<String>,
    ) -> Result<SharedSession, CommlineError> {
        let mut slot = self.slot.lock().await;
        self.guard_free(&slot).await?;

        let call_id = CallId(format!("sim-{}", Uuid::new_v4()));
        info!(call = %call_id, "simulated call started");
        let mut session = CallSession::new_outbound(call_id, target, CallOrigin::Simulated);
        // Simulated calls skip provider progress and go straight to live.
        session.apply_signal(crate::machine::CallSignal::Answered)?;

        let session = Arc::new(Mutex::new(session));
        *slot = Some(LineSlot {
            session: Arc::clone(&session),
            poller: None,
        });
        Ok(session)
    }

    /// Register an inbound ringing call reported by the provider.
    pub async fn offer_inbound(
        &self,
        call_id: CallId,
        remote: impl Into<String>,
    ) -> Result<SharedSession, CommlineError> {
        let mut slot = self.slot.lock().await;
        self.guard_free(&slot).await?;

        info!(call = %call_id, "inbound call offered");
        let session = Arc::new(Mutex::new(CallSession::new_inbound(
            call_id,
            remote,
            CallOrigin::Provider,
        )));
        let poller = StatusPoller::attach(
            Arc::clone(&session),
            Arc::clone(&self.telephony),
            self.poller_config.clone(),
        );
        *slot = Some(LineSlot {
            session: Arc::clone(&session),
            poller: Some(poller),
        });
        Ok(session)
    }

    /// Transfer the live call: enter the transferring sub-state locally,
    /// then ask the provider. Provider refusal reverts to in-progress.
    pub async fn transfer(&self, target: &str) -> Result<(), CommlineError> {
        let session = self.require_session().await?;
        let (call_id, origin) = {
            let mut guard = session.lock().await;
            guard.begin_transfer(target)?;
            (guard.call_id().clone(), guard.origin())
        };

        if origin == CallOrigin::Simulated {
            session.lock().await.finish_transfer(true)?;
            return Ok(());
        }

        match self.telephony.transfer(&call_id, target).await {
            Ok(()) => session.lock().await.finish_transfer(true),
            Err(err) => {
                warn!(call = %call_id, error = %err, "transfer rejected by provider");
                session.lock().await.finish_transfer(false)?;
                Err(err)
            }
        }
    }

    /// Answer the inbound ringing call.
    pub async fn answer(&self) -> Result<(), CommlineError> {
        let session = self.require_session().await?;
        session.lock().await.answer()
    }

    /// Toggle hold on the live call. Returns whether the call is now held.
    pub async fn toggle_hold(&self) -> Result<bool, CommlineError> {
        let session = self.require_session().await?;
        session.lock().await.toggle_hold()
    }

    /// Toggle mute on the live call. Returns whether the call is now muted.
    pub async fn toggle_mute(&self) -> Result<bool, CommlineError> {
        let session = self.require_session().await?;
        session.lock().await.toggle_mute()
    }

    /// Hang up the live call.
    ///
    /// The local machine transitions first so the slot frees immediately;
    /// the provider hangup is best-effort and a failure only logs. The
    /// poller self-detaches when it observes the terminal state, but we
    /// detach eagerly here rather than wait one interval.
    pub async fn hangup(&self) -> Result<(), CommlineError> {
        let mut slot_guard = self.slot.lock().await;
        let slot = slot_guard
            .as_mut()
            .ok_or_else(|| CommlineError::Validation("no active call".into()))?;

        let (call_id, origin) = {
            let mut guard = slot.session.lock().await;
            guard.hangup()?;
            (guard.call_id().clone(), guard.origin())
        };
        if let Some(poller) = slot.poller.take() {
            poller.detach();
        }
        drop(slot_guard);

        if origin == CallOrigin::Provider {
            if let Err(err) = self.telephony.hangup(&call_id).await {
                warn!(call = %call_id, error = %err, "provider hangup failed");
            }
        }
        info!(call = %call_id, "call ended");
        Ok(())
    }

    async fn guard_free(&self, slot: &Option<LineSlot>) -> Result<(), CommlineError> {
        if let Some(existing) = slot.as_ref() {
            let guard = existing.session.lock().await;
            if !guard.is_terminal() {
                return Err(CommlineError::SessionBusy {
                    active: guard.call_id().clone(),
                });
            }
        }
        Ok(())
    }

    async fn require_session(&self) -> Result<SharedSession, CommlineError> {
        let slot = self.slot.lock().await;
        let slot = slot
            .as_ref()
            .ok_or_else(|| CommlineError::Validation("no active call".into()))?;
        Ok(Arc::clone(&slot.session))
    }
}
