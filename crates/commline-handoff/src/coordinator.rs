// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation AI responsibility gate.
//!
//! The coordinator owns mutations of [`ConversationAiState`] and answers the
//! one question the send pipeline asks: is automation allowed to act here
//! right now. It never decides content.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use commline_config::model::HandoffConfig;
use commline_core::error::CommlineError;
use commline_core::traits::{AiGateStore, Automation};
use commline_core::types::{ChannelKind, ConversationAiState, ConversationId};

pub struct HandoffCoordinator {
    conversation_id: ConversationId,
    store: Arc<dyn AiGateStore>,
    automation: Arc<dyn Automation>,
    auto_clear_on_resume: bool,
    invoking: AtomicBool,
}

impl HandoffCoordinator {
    pub fn new(
        conversation_id: ConversationId,
        store: Arc<dyn AiGateStore>,
        automation: Arc<dyn Automation>,
        config: &HandoffConfig,
    ) -> Self {
        Self {
            conversation_id,
            store,
            automation,
            auto_clear_on_resume: config.auto_clear_on_resume,
            invoking: AtomicBool::new(false),
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Current persisted state, defaulting when none exists yet.
    pub async fn state(&self) -> Result<ConversationAiState, CommlineError> {
        self.store.load_ai_state(&self.conversation_id).await
    }

    /// Whether automation may act on this conversation right now.
    pub async fn automation_allowed(&self) -> Result<bool, CommlineError> {
        let state = self.state().await?;
        Ok(state.ai_handled && !state.ai_paused)
    }

    /// Hand the conversation to (or take it back from) automation.
    ///
    /// Taking it back also drops a pending handoff request; the ask is moot
    /// once no agent is attached. The paused flag is left alone so a later
    /// re-enable comes back in whatever pause state the user left.
    pub async fn set_handled(&self, handled: bool) -> Result<(), CommlineError> {
        let mut state = self.state().await?;
        state.ai_handled = handled;
        if !handled {
            state.ai_handoff_requested = false;
        }
        info!(conversation = %self.conversation_id, handled, "ai handled flag set");
        self.store.save_ai_state(&self.conversation_id, state).await
    }

    /// Flip the paused flag. Unpausing also clears a pending handoff
    /// request: resuming automation cancels the ask. Re-pausing never
    /// resurrects a cleared request.
    ///
    /// Returns the new paused value.
    pub async fn toggle_paused(&self) -> Result<bool, CommlineError> {
        let mut state = self.state().await?;
        state.ai_paused = !state.ai_paused;
        if !state.ai_paused && self.auto_clear_on_resume {
            state.ai_handoff_requested = false;
        }
        info!(
            conversation = %self.conversation_id,
            paused = state.ai_paused,
            "ai paused toggled"
        );
        self.store
            .save_ai_state(&self.conversation_id, state)
            .await?;
        Ok(state.ai_paused)
    }

    /// Record that automation asked for a human. Only a conversation
    /// automation currently handles can request a handoff.
    pub async fn request_handoff(&self, reason: &str) -> Result<(), CommlineError> {
        let mut state = self.state().await?;
        if !state.ai_handled {
            return Err(CommlineError::Validation(
                "handoff requested on a conversation automation does not handle".into(),
            ));
        }
        state.ai_handoff_requested = true;
        info!(conversation = %self.conversation_id, reason, "handoff requested");
        self.store.save_ai_state(&self.conversation_id, state).await
    }

    /// Clear a pending handoff request. Leaves the paused flag untouched:
    /// dismissing the ask must not silently resume a paused agent.
    pub async fn clear_handoff(&self) -> Result<(), CommlineError> {
        let mut state = self.state().await?;
        state.ai_handoff_requested = false;
        info!(conversation = %self.conversation_id, "handoff cleared");
        self.store.save_ai_state(&self.conversation_id, state).await
    }

    /// Explicitly trigger one automation run over `channel`, regardless of
    /// pause history.
    ///
    /// Rejected when no channel is selected. Returns `Ok(false)` without a
    /// second run when an invocation is already in flight.
    pub async fn invoke_now(&self, channel: Option<ChannelKind>) -> Result<bool, CommlineError> {
        let channel = channel.ok_or_else(|| {
            CommlineError::Validation("select an outbound channel before invoking automation".into())
        })?;

        if self
            .invoking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(conversation = %self.conversation_id, "automation already in flight, skipping");
            return Ok(false);
        }

        let result = self.automation.run(&self.conversation_id, channel).await;
        self.invoking.store(false, Ordering::SeqCst);
        match result {
            Ok(()) => {
                info!(conversation = %self.conversation_id, %channel, "automation invoked");
                Ok(true)
            }
            Err(err) => {
                warn!(conversation = %self.conversation_id, error = %err, "automation run failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commline_test_utils::{MockAutomation, MockBackend};

    fn conv() -> ConversationId {
        ConversationId("conv-1".into())
    }

    struct Fixture {
        backend: Arc<MockBackend>,
        automation: Arc<MockAutomation>,
        coordinator: HandoffCoordinator,
    }

    fn fixture_with(config: HandoffConfig) -> Fixture {
        let backend = Arc::new(MockBackend::new());
        let automation = Arc::new(MockAutomation::new());
        let coordinator = HandoffCoordinator::new(
            conv(),
            Arc::clone(&backend) as _,
            Arc::clone(&automation) as _,
            &config,
        );
        Fixture {
            backend,
            automation,
            coordinator,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(HandoffConfig::default())
    }

    #[tokio::test]
    async fn toggle_paused_is_an_involution() {
        let f = fixture();
        f.coordinator.set_handled(true).await.unwrap();

        assert!(f.coordinator.toggle_paused().await.unwrap());
        assert!(!f.coordinator.toggle_paused().await.unwrap());
        let state = f.coordinator.state().await.unwrap();
        assert!(!state.ai_paused);
    }

    #[tokio::test]
    async fn unpausing_clears_pending_handoff() {
        let f = fixture();
        f.coordinator.set_handled(true).await.unwrap();
        f.coordinator.request_handoff("angry customer").await.unwrap();
        f.coordinator.toggle_paused().await.unwrap();

        // Resume: the pending ask goes away with the pause.
        assert!(!f.coordinator.toggle_paused().await.unwrap());
        let state = f.coordinator.state().await.unwrap();
        assert!(!state.ai_handoff_requested);
    }

    #[tokio::test]
    async fn repausing_does_not_resurrect_cleared_handoff() {
        let f = fixture();
        f.coordinator.set_handled(true).await.unwrap();
        f.coordinator.request_handoff("needs human").await.unwrap();
        f.coordinator.clear_handoff().await.unwrap();

        f.coordinator.toggle_paused().await.unwrap();
        let state = f.coordinator.state().await.unwrap();
        assert!(state.ai_paused);
        assert!(!state.ai_handoff_requested);
    }

    #[tokio::test]
    async fn auto_clear_can_be_disabled() {
        let f = fixture_with(HandoffConfig {
            auto_clear_on_resume: false,
        });
        f.coordinator.set_handled(true).await.unwrap();
        f.coordinator.request_handoff("keep me").await.unwrap();
        f.coordinator.toggle_paused().await.unwrap();
        f.coordinator.toggle_paused().await.unwrap();

        let state = f.coordinator.state().await.unwrap();
        assert!(state.ai_handoff_requested);
    }

    #[tokio::test]
    async fn request_handoff_requires_ai_handled() {
        let f = fixture();
        let err = f.coordinator.request_handoff("no agent").await.unwrap_err();
        assert!(matches!(err, CommlineError::Validation(_)));
        let state = f.coordinator.state().await.unwrap();
        assert!(!state.ai_handoff_requested);
    }

    #[tokio::test]
    async fn clear_handoff_does_not_unpause() {
        let f = fixture();
        f.coordinator.set_handled(true).await.unwrap();
        f.coordinator.toggle_paused().await.unwrap();
        f.coordinator.request_handoff("later").await.unwrap();

        f.coordinator.clear_handoff().await.unwrap();
        let state = f.coordinator.state().await.unwrap();
        assert!(state.ai_paused);
        assert!(!state.ai_handoff_requested);
    }

    #[tokio::test]
    async fn disabling_handled_drops_the_ask() {
        let f = fixture();
        f.coordinator.set_handled(true).await.unwrap();
        f.coordinator.request_handoff("escalate").await.unwrap();

        f.coordinator.set_handled(false).await.unwrap();
        let state = f.coordinator.state().await.unwrap();
        assert!(!state.ai_handled);
        assert!(!state.ai_handoff_requested);
    }

    #[tokio::test]
    async fn automation_allowed_requires_handled_and_unpaused() {
        let f = fixture();
        assert!(!f.coordinator.automation_allowed().await.unwrap());

        f.coordinator.set_handled(true).await.unwrap();
        assert!(f.coordinator.automation_allowed().await.unwrap());

        f.coordinator.toggle_paused().await.unwrap();
        assert!(!f.coordinator.automation_allowed().await.unwrap());
    }

    #[tokio::test]
    async fn invoke_requires_a_channel() {
        let f = fixture();
        let err = f.coordinator.invoke_now(None).await.unwrap_err();
        assert!(matches!(err, CommlineError::Validation(_)));
        assert_eq!(f.automation.run_count().await, 0);
    }

    #[tokio::test]
    async fn invoke_runs_even_when_paused() {
        let f = fixture();
        f.coordinator.set_handled(true).await.unwrap();
        f.coordinator.toggle_paused().await.unwrap();

        assert!(f
            .coordinator
            .invoke_now(Some(ChannelKind::Whatsapp))
            .await
            .unwrap());
        assert_eq!(
            f.automation.runs().await,
            vec![(conv(), ChannelKind::Whatsapp)]
        );
    }

    #[tokio::test]
    async fn overlapping_invocations_run_once() {
        let f = fixture();
        f.automation.hold_runs();

        let coordinator = Arc::new(f.coordinator);
        let first = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.invoke_now(Some(ChannelKind::Sms)).await })
        };
        // Let the first invocation reach the parked automation run.
        tokio::task::yield_now().await;

        assert!(!coordinator.invoke_now(Some(ChannelKind::Sms)).await.unwrap());

        f.automation.release();
        assert!(first.await.unwrap().unwrap());
        assert_eq!(f.automation.run_count().await, 1);
    }

    #[tokio::test]
    async fn failed_invocation_releases_the_gate() {
        let f = fixture();
        f.automation.fail_next();

        assert!(f
            .coordinator
            .invoke_now(Some(ChannelKind::Sms))
            .await
            .is_err());
        // The gate is free again after the failure.
        assert!(f
            .coordinator
            .invoke_now(Some(ChannelKind::Sms))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn state_persists_through_the_store() {
        let f = fixture();
        f.coordinator.set_handled(true).await.unwrap();
        f.coordinator.toggle_paused().await.unwrap();

        // A second coordinator over the same store sees the same lattice.
        let other = HandoffCoordinator::new(
            conv(),
            Arc::clone(&f.backend) as _,
            Arc::clone(&f.automation) as _,
            &HandoffConfig::default(),
        );
        let state = other.state().await.unwrap();
        assert!(state.ai_handled);
        assert!(state.ai_paused);
    }
}
