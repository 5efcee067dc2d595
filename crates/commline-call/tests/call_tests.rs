// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end call tests: the line, the session machine, and the status
//! poller against a scripted provider. All timer tests run with paused
//! time so polls and backoff happen instantly.

use std::sync::Arc;
use std::time::Duration;

use commline_call::{ActiveLine, PollerConfig};
use commline_core::error::CommlineError;
use commline_core::types::{CallErrorCode, CallParams, CallState};
use commline_test_utils::MockTelephony;

fn fast_config() -> PollerConfig {
    PollerConfig {
        interval: Duration::from_secs(1),
        backoff_max: Duration::from_secs(8),
        max_poll_duration: Duration::from_secs(3600),
    }
}

fn params(target: &str) -> CallParams {
    CallParams {
        target: target.into(),
        agent_id: Some("agent-1".into()),
        caller_id: None,
    }
}

fn line_with(telephony: &Arc<MockTelephony>, config: PollerConfig) -> ActiveLine {
    ActiveLine::new(Arc::clone(telephony) as _, config)
}

#[tokio::test(start_paused = true)]
async fn outbound_call_progresses_via_polling() {
    let telephony = Arc::new(MockTelephony::new());
    telephony.push_status(CallState::Ringing, 0).await;
    telephony.push_status(CallState::InProgress, 2).await;
    telephony.push_status(CallState::Ended, 42).await;

    let line = line_with(&telephony, fast_config());
    let session = line.initiate(params("+15550100")).await.unwrap();
    assert_eq!(session.lock().await.state(), CallState::Connecting);

    // Three polls at the base interval walk the scripted snapshots.
    tokio::time::sleep(Duration::from_secs(10)).await;

    let guard = session.lock().await;
    assert_eq!(guard.state(), CallState::Ended);
    assert!(guard.answered_at().is_some());
    // Poller self-detached at the terminal snapshot.
    assert_eq!(telephony.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn single_call_slot_rejects_concurrent_initiate() {
    let telephony = Arc::new(MockTelephony::new());
    let line = line_with(&telephony, fast_config());

    let first = line.initiate(params("+15550100")).await.unwrap();
    let first_id = first.lock().await.call_id().clone();

    let err = line.initiate(params("+15550111")).await.unwrap_err();
    match err {
        CommlineError::SessionBusy { active } => assert_eq!(active, first_id),
        other => panic!("expected SessionBusy, got {other:?}"),
    }

    // Ending the first call frees the slot.
    line.hangup().await.unwrap();
    assert!(!line.busy().await);
    line.initiate(params("+15550111")).await.unwrap();
    assert!(line.busy().await);
}

#[tokio::test(start_paused = true)]
async fn poll_errors_back_off_and_recover() {
    let telephony = Arc::new(MockTelephony::new());
    telephony.push_status_error("provider 503").await;
    telephony.push_status_error("provider 503").await;
    telephony.push_status(CallState::Ended, 10).await;

    let line = line_with(&telephony, fast_config());
    let session = line.initiate(params("+15550100")).await.unwrap();

    // Polls at ~1s (err), ~3s (err, 2s backoff), ~7s (ok, 4s backoff).
    // Generous virtual window; the poller stops at the terminal snapshot.
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(session.lock().await.state(), CallState::Ended);
    assert_eq!(telephony.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn poll_deadline_fails_unresolved_session() {
    let telephony = Arc::new(MockTelephony::new());
    // No script: the provider reports connecting forever.
    let config = PollerConfig {
        interval: Duration::from_secs(1),
        backoff_max: Duration::from_secs(8),
        max_poll_duration: Duration::from_secs(5),
    };
    let line = line_with(&telephony, config);
    let session = line.initiate(params("+15550100")).await.unwrap();

    tokio::time::sleep(Duration::from_secs(20)).await;

    let guard = session.lock().await;
    assert_eq!(guard.state(), CallState::Failed);
    assert_eq!(guard.failure_reason(), Some("call status polling timed out"));
    // No polls after the forced failure.
    let polls = telephony.status_calls();
    drop(guard);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(telephony.status_calls(), polls);
}

#[tokio::test(start_paused = true)]
async fn hangup_detaches_poller_and_notifies_provider() {
    let telephony = Arc::new(MockTelephony::new());
    let line = line_with(&telephony, fast_config());
    let session = line.initiate(params("+15550100")).await.unwrap();
    let call_id = session.lock().await.call_id().clone();

    tokio::time::sleep(Duration::from_millis(3500)).await;
    let polls_before = telephony.status_calls();
    assert!(polls_before >= 2);

    line.hangup().await.unwrap();
    assert_eq!(session.lock().await.state(), CallState::Ended);
    assert_eq!(telephony.hangups().await, vec![call_id]);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(telephony.status_calls(), polls_before);
}

#[tokio::test(start_paused = true)]
async fn simulated_calls_never_touch_the_provider() {
    let telephony = Arc::new(MockTelephony::new());
    let line = line_with(&telephony, fast_config());

    let session = line.initiate_simulated("demo target").await.unwrap();
    assert_eq!(session.lock().await.state(), CallState::InProgress);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(telephony.status_calls(), 0);

    line.hangup().await.unwrap();
    assert_eq!(session.lock().await.state(), CallState::Ended);
    assert!(telephony.hangups().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn transfer_success_ends_the_session() {
    let telephony = Arc::new(MockTelephony::new());
    telephony.push_status(CallState::InProgress, 1).await;
    let line = line_with(&telephony, fast_config());
    let session = line.initiate(params("+15550100")).await.unwrap();
    let call_id = session.lock().await.call_id().clone();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(session.lock().await.state(), CallState::InProgress);

    line.transfer("+15550199").await.unwrap();
    assert_eq!(session.lock().await.state(), CallState::Ended);
    assert_eq!(
        telephony.transfers().await,
        vec![(call_id, "+15550199".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn transfer_failure_reverts_to_in_progress() {
    let telephony = Arc::new(MockTelephony::new());
    telephony.push_status(CallState::InProgress, 1).await;
    telephony.fail_transfers();
    let line = line_with(&telephony, fast_config());
    let session = line.initiate(params("+15550100")).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;

    let err = line.transfer("+15550199").await.unwrap_err();
    assert!(matches!(err, CommlineError::CallProvider { .. }));
    // The call survives the failed transfer.
    assert_eq!(session.lock().await.state(), CallState::InProgress);
    assert!(line.toggle_hold().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn initiate_rejection_carries_provider_code() {
    let telephony = Arc::new(MockTelephony::new());
    telephony
        .reject_initiate(CallErrorCode::TargetUnreachable, "carrier timeout")
        .await;
    let line = line_with(&telephony, fast_config());

    let err = line.initiate(params("+15550100")).await.unwrap_err();
    match err {
        CommlineError::CallProvider { code, detail } => {
            assert_eq!(code, CallErrorCode::TargetUnreachable);
            assert_eq!(detail, "carrier timeout");
        }
        other => panic!("expected CallProvider, got {other:?}"),
    }
    // A rejected initiate leaves the slot empty.
    assert!(line.session().await.is_none());
    assert!(!line.busy().await);
}

#[tokio::test(start_paused = true)]
async fn hold_and_mute_through_the_line() {
    let telephony = Arc::new(MockTelephony::new());
    telephony.push_status(CallState::InProgress, 1).await;
    let line = line_with(&telephony, fast_config());
    let session = line.initiate(params("+15550100")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(line.toggle_mute().await.unwrap());
    assert!(line.toggle_hold().await.unwrap());
    assert_eq!(session.lock().await.state(), CallState::OnHold);
    assert!(!line.toggle_hold().await.unwrap());
    assert!(!line.toggle_mute().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn inbound_offer_and_answer() {
    let telephony = Arc::new(MockTelephony::new());
    telephony.push_status(CallState::Ringing, 0).await;
    let line = line_with(&telephony, fast_config());

    let session = line
        .offer_inbound(commline_core::types::CallId("pcall-in".into()), "+15550123")
        .await
        .unwrap();
    assert_eq!(session.lock().await.state(), CallState::Ringing);

    line.answer().await.unwrap();
    assert_eq!(session.lock().await.state(), CallState::InProgress);
    assert!(session.lock().await.answered_at().is_some());
}
