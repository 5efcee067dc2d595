// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Finite state machine for exactly one call session.
//!
//! States: idle -> connecting -> ringing -> in_progress <-> on_hold -> ended,
//! with transferring as a sub-state of in_progress and failed reachable from
//! every non-terminal state. Terminal states are immutable: every further
//! mutation is rejected with `TerminalSession`, never silently ignored.
//!
//! Duration is wall-clock from answer to end, irrespective of hold. Signals
//! and terminal transitions take an explicit timestamp internally so the
//! arithmetic is deterministic under test; the public wrappers stamp
//! `Utc::now()`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::debug;

use commline_core::error::CommlineError;
use commline_core::types::{CallDirection, CallId, CallOrigin, CallState};

/// A provider-observed progress signal, either pushed by user action plumbing
/// or synthesized by the status poller from a polled snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum CallSignal {
    Ringing,
    Answered,
    Completed,
    Failed(Option<String>),
}

/// State and bookkeeping for one call, from initiation to terminal state.
#[derive(Debug)]
pub struct CallSession {
    call_id: CallId,
    direction: CallDirection,
    remote: String,
    origin: CallOrigin,
    state: CallState,
    started_at: DateTime<Utc>,
    answered_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    muted: bool,
    failure_reason: Option<String>,
    transcript: Option<String>,
    transfer_target: Option<String>,
}

impl CallSession {
    /// New outbound session in `connecting`.
    pub fn new_outbound(call_id: CallId, remote: impl Into<String>, origin: CallOrigin) -> Self {
        Self::new(call_id, CallDirection::Outbound, remote, origin, CallState::Connecting)
    }

    /// New inbound session in `ringing` (created on an inbound signal).
    pub fn new_inbound(call_id: CallId, remote: impl Into<String>, origin: CallOrigin) -> Self {
        Self::new(call_id, CallDirection::Inbound, remote, origin, CallState::Ringing)
    }

    fn new(
        call_id: CallId,
        direction: CallDirection,
        remote: impl Into<String>,
        origin: CallOrigin,
        state: CallState,
    ) -> Self {
        Self {
            call_id,
            direction,
            remote: remote.into(),
            origin,
            state,
            started_at: Utc::now(),
            answered_at: None,
            ended_at: None,
            muted: false,
            failure_reason: None,
            transcript: None,
            transfer_target: None,
        }
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn origin(&self) -> CallOrigin {
        self.origin
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn on_hold(&self) -> bool {
        self.state == CallState::OnHold
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn answered_at(&self) -> Option<DateTime<Utc>> {
        self.answered_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    /// Accumulated talk time: answer to end for finished calls, answer to
    /// now for live ones. `None` before the call is answered. Hold does not
    /// pause the clock.
    pub fn duration(&self) -> Option<ChronoDuration> {
        let answered = self.answered_at?;
        let end = self.ended_at.unwrap_or_else(Utc::now);
        Some(end - answered)
    }

    fn guard_not_terminal(&self) -> Result<(), CommlineError> {
        if self.is_terminal() {
            return Err(CommlineError::TerminalSession { state: self.state });
        }
        Ok(())
    }

    fn transition(&mut self, to: CallState) {
        debug!(call = %self.call_id, from = %self.state, to = %to, "call transition");
        self.state = to;
    }

    /// Apply a provider signal at an explicit time.
    ///
    /// Returns `Ok(true)` if the state changed; stale signals (e.g. a polled
    /// "ringing" after the call was answered) are `Ok(false)` no-ops.
    /// Terminal sessions reject all signals.
    pub fn apply_signal_at(
        &mut self,
        signal: CallSignal,
        at: DateTime<Utc>,
    ) -> Result<bool, CommlineError> {
        self.guard_not_terminal()?;

        match signal {
            CallSignal::Ringing => {
                if self.state == CallState::Connecting {
                    self.transition(CallState::Ringing);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            CallSignal::Answered => {
                if matches!(self.state, CallState::Connecting | CallState::Ringing) {
                    self.answered_at = Some(at);
                    self.transition(CallState::InProgress);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            CallSignal::Completed => {
                self.finish(CallState::Ended, at);
                Ok(true)
            }
            CallSignal::Failed(reason) => {
                self.failure_reason =
                    reason.or_else(|| Some("call failed without provider detail".into()));
                self.finish(CallState::Failed, at);
                Ok(true)
            }
        }
    }

    /// Apply a provider signal now.
    pub fn apply_signal(&mut self, signal: CallSignal) -> Result<bool, CommlineError> {
        self.apply_signal_at(signal, Utc::now())
    }

    /// Answer an inbound ringing call.
    pub fn answer_at(&mut self, at: DateTime<Utc>) -> Result<(), CommlineError> {
        self.guard_not_terminal()?;
        if self.state != CallState::Ringing {
            return Err(CommlineError::InvalidTransition(format!(
                "cannot answer a call in state {}",
                self.state
            )));
        }
        self.answered_at = Some(at);
        self.transition(CallState::InProgress);
        Ok(())
    }

    pub fn answer(&mut self) -> Result<(), CommlineError> {
        self.answer_at(Utc::now())
    }

    /// Toggle hold. Valid only between `in_progress` and `on_hold`; the
    /// duration clock keeps running while held.
    ///
    /// Returns whether the call is now on hold.
    pub fn toggle_hold(&mut self) -> Result<bool, CommlineError> {
        self.guard_not_terminal()?;
        match self.state {
            CallState::InProgress => {
                self.transition(CallState::OnHold);
                Ok(true)
            }
            CallState::OnHold => {
                self.transition(CallState::InProgress);
                Ok(false)
            }
            other => Err(CommlineError::InvalidTransition(format!(
                "cannot toggle hold in state {other}"
            ))),
        }
    }

    /// Toggle the local-only mute flag. Valid in any non-terminal state and
    /// never an FSM transition.
    ///
    /// Returns whether the call is now muted.
    pub fn toggle_mute(&mut self) -> Result<bool, CommlineError> {
        self.guard_not_terminal()?;
        self.muted = !self.muted;
        Ok(self.muted)
    }

    /// Enter the transferring sub-state.
    pub fn begin_transfer(&mut self, target: impl Into<String>) -> Result<(), CommlineError> {
        self.guard_not_terminal()?;
        if self.state != CallState::InProgress {
            return Err(CommlineError::InvalidTransition(format!(
                "cannot transfer a call in state {}",
                self.state
            )));
        }
        self.transfer_target = Some(target.into());
        self.transition(CallState::Transferring);
        Ok(())
    }

    /// Resolve a pending transfer: success ends the session, failure reverts
    /// to `in_progress`.
    pub fn finish_transfer_at(
        &mut self,
        success: bool,
        at: DateTime<Utc>,
    ) -> Result<(), CommlineError> {
        self.guard_not_terminal()?;
        if self.state != CallState::Transferring {
            return Err(CommlineError::InvalidTransition(format!(
                "no transfer pending in state {}",
                self.state
            )));
        }
        if success {
            self.finish(CallState::Ended, at);
        } else {
            self.transfer_target = None;
            self.transition(CallState::InProgress);
        }
        Ok(())
    }

    pub fn finish_transfer(&mut self, success: bool) -> Result<(), CommlineError> {
        self.finish_transfer_at(success, Utc::now())
    }

    /// Hang up from any non-terminal state.
    pub fn hangup_at(&mut self, at: DateTime<Utc>) -> Result<(), CommlineError> {
        self.guard_not_terminal()?;
        self.finish(CallState::Ended, at);
        Ok(())
    }

    pub fn hangup(&mut self) -> Result<(), CommlineError> {
        self.hangup_at(Utc::now())
    }

    /// Record the provider-reported transcript. Rejected once terminal:
    /// transcript is immutable history after the call ends.
    pub fn record_transcript(&mut self, transcript: impl Into<String>) -> Result<(), CommlineError> {
        self.guard_not_terminal()?;
        self.transcript = Some(transcript.into());
        Ok(())
    }

    /// Enter a terminal state: stamp the end, freeze duration, clear the
    /// local flags.
    fn finish(&mut self, terminal: CallState, at: DateTime<Utc>) {
        debug_assert!(terminal.is_terminal());
        self.ended_at = Some(at);
        self.muted = false;
        self.transfer_target = None;
        self.transition(terminal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn outbound() -> CallSession {
        CallSession::new_outbound(CallId("call-1".into()), "+15550100", CallOrigin::Provider)
    }

    #[test]
    fn full_lifecycle_duration_ignores_hold() {
        // initiate -> ringing -> answered -> hold -> resume -> hangup
        let mut session = outbound();
        assert_eq!(session.state(), CallState::Connecting);

        assert!(session.apply_signal_at(CallSignal::Ringing, at(10)).unwrap());
        assert_eq!(session.state(), CallState::Ringing);

        assert!(session.apply_signal_at(CallSignal::Answered, at(20)).unwrap());
        assert_eq!(session.state(), CallState::InProgress);

        assert!(session.toggle_hold().unwrap());
        assert_eq!(session.state(), CallState::OnHold);
        assert!(!session.toggle_hold().unwrap());
        assert_eq!(session.state(), CallState::InProgress);

        session.hangup_at(at(95)).unwrap();
        assert_eq!(session.state(), CallState::Ended);
        // Wall-clock answer -> hangup, unaffected by the hold in between.
        assert_eq!(session.duration(), Some(ChronoDuration::seconds(75)));
    }

    #[test]
    fn hangup_from_on_hold_ends_and_clears_flags() {
        let mut session = outbound();
        session.apply_signal_at(CallSignal::Answered, at(5)).unwrap();
        session.toggle_mute().unwrap();
        session.toggle_hold().unwrap();

        session.hangup_at(at(30)).unwrap();
        assert_eq!(session.state(), CallState::Ended);
        assert!(!session.muted());
        assert!(!session.on_hold());
    }

    #[test]
    fn terminal_states_reject_every_mutation() {
        let mut session = outbound();
        session.hangup_at(at(1)).unwrap();

        assert!(matches!(
            session.apply_signal(CallSignal::Answered),
            Err(CommlineError::TerminalSession { .. })
        ));
        assert!(matches!(
            session.toggle_hold(),
            Err(CommlineError::TerminalSession { .. })
        ));
        assert!(matches!(
            session.toggle_mute(),
            Err(CommlineError::TerminalSession { .. })
        ));
        assert!(matches!(
            session.begin_transfer("+15550199"),
            Err(CommlineError::TerminalSession { .. })
        ));
        assert!(matches!(
            session.hangup(),
            Err(CommlineError::TerminalSession { .. })
        ));
        assert!(matches!(
            session.record_transcript("late"),
            Err(CommlineError::TerminalSession { .. })
        ));
        // State is still exactly the terminal it was frozen in.
        assert_eq!(session.state(), CallState::Ended);
    }

    #[test]
    fn failed_reachable_from_any_non_terminal_state() {
        for setup in [
            |_: &mut CallSession| {},
            |s: &mut CallSession| {
                s.apply_signal_at(CallSignal::Ringing, at(1)).unwrap();
            },
            |s: &mut CallSession| {
                s.apply_signal_at(CallSignal::Answered, at(1)).unwrap();
            },
            |s: &mut CallSession| {
                s.apply_signal_at(CallSignal::Answered, at(1)).unwrap();
                s.toggle_hold().unwrap();
            },
            |s: &mut CallSession| {
                s.apply_signal_at(CallSignal::Answered, at(1)).unwrap();
                s.begin_transfer("+15550199").unwrap();
            },
        ] {
            let mut session = outbound();
            setup(&mut session);
            session
                .apply_signal_at(CallSignal::Failed(Some("carrier error".into())), at(9))
                .unwrap();
            assert_eq!(session.state(), CallState::Failed);
            assert_eq!(session.failure_reason(), Some("carrier error"));
        }
    }

    #[test]
    fn stale_signals_are_no_ops() {
        let mut session = outbound();
        session.apply_signal_at(CallSignal::Answered, at(5)).unwrap();

        // A late polled "ringing" must not regress an answered call.
        assert!(!session.apply_signal_at(CallSignal::Ringing, at(6)).unwrap());
        assert_eq!(session.state(), CallState::InProgress);
        // Repeated "answered" must not move answered_at.
        assert!(!session.apply_signal_at(CallSignal::Answered, at(7)).unwrap());
        assert_eq!(session.answered_at(), Some(at(5)));
    }

    #[test]
    fn transfer_success_ends_session() {
        let mut session = outbound();
        session.apply_signal_at(CallSignal::Answered, at(5)).unwrap();
        session.begin_transfer("+15550199").unwrap();
        assert_eq!(session.state(), CallState::Transferring);

        session.finish_transfer_at(true, at(40)).unwrap();
        assert_eq!(session.state(), CallState::Ended);
        assert_eq!(session.duration(), Some(ChronoDuration::seconds(35)));
    }

    #[test]
    fn transfer_failure_reverts_to_in_progress() {
        let mut session = outbound();
        session.apply_signal_at(CallSignal::Answered, at(5)).unwrap();
        session.begin_transfer("+15550199").unwrap();

        session.finish_transfer_at(false, at(8)).unwrap();
        assert_eq!(session.state(), CallState::InProgress);
        // The session is still mutable after the revert.
        assert!(session.toggle_hold().is_ok());
    }

    #[test]
    fn transfer_requires_in_progress() {
        let mut session = outbound();
        assert!(matches!(
            session.begin_transfer("+15550199"),
            Err(CommlineError::InvalidTransition(_))
        ));
        session.apply_signal_at(CallSignal::Answered, at(1)).unwrap();
        session.toggle_hold().unwrap();
        assert!(matches!(
            session.begin_transfer("+15550199"),
            Err(CommlineError::InvalidTransition(_))
        ));
    }

    #[test]
    fn mute_is_not_a_state_transition() {
        let mut session = outbound();
        session.apply_signal_at(CallSignal::Ringing, at(1)).unwrap();
        assert!(session.toggle_mute().unwrap());
        assert_eq!(session.state(), CallState::Ringing);
        assert!(!session.toggle_mute().unwrap());
    }

    #[test]
    fn inbound_answer_path() {
        let mut session =
            CallSession::new_inbound(CallId("call-2".into()), "+15550111", CallOrigin::Provider);
        assert_eq!(session.state(), CallState::Ringing);
        assert_eq!(session.direction(), CallDirection::Inbound);

        session.answer_at(at(3)).unwrap();
        assert_eq!(session.state(), CallState::InProgress);
        assert_eq!(session.answered_at(), Some(at(3)));
    }

    #[test]
    fn answer_rejected_when_not_ringing() {
        let mut session = outbound();
        assert!(matches!(
            session.answer(),
            Err(CommlineError::InvalidTransition(_))
        ));
    }

    #[test]
    fn duration_none_before_answer() {
        let mut session = outbound();
        assert!(session.duration().is_none());
        session.hangup_at(at(4)).unwrap();
        // Never answered: still no duration.
        assert!(session.duration().is_none());
    }

    #[test]
    fn transcript_recorded_before_terminal_survives() {
        let mut session = outbound();
        session.apply_signal_at(CallSignal::Answered, at(1)).unwrap();
        session.record_transcript("hello world").unwrap();
        session.hangup_at(at(2)).unwrap();
        assert_eq!(session.transcript(), Some("hello world"));
    }
}
