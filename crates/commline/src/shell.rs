// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `commline shell` command implementation.
//!
//! Launches an interactive inbox over the in-process simulated backend:
//! one demo conversation wired through the real stream, call, and handoff
//! stacks. Messages the simulated customer sends arrive live through the
//! change feed while the prompt is open.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use commline_call::{ActiveLine, PollerConfig};
use commline_config::model::CommlineConfig;
use commline_core::error::CommlineError;
use commline_core::types::{
    CallParams, ChannelKind, ConversationId, Direction, Message, OutboundDraft,
};
use commline_handoff::HandoffCoordinator;
use commline_stream::{AnchorAction, ConversationStream, ScrollAnchor};

use crate::sim::{SimAutomation, SimBackend, SimTelephony, SimTransport};

/// Viewport state for the printed feed.
///
/// The shell has a one-dimensional "viewport": either the reader follows the
/// live feed, or they have paused it with `/follow` and arrivals are held
/// back and counted until they catch up.
struct FeedView {
    anchor: ScrollAnchor,
    held: Vec<Message>,
    /// Distance used to park the anchor outside its follow zone.
    scrollback: f64,
}

impl FeedView {
    fn new(follow_threshold: f64) -> Self {
        Self {
            anchor: ScrollAnchor::new(follow_threshold),
            held: Vec::new(),
            scrollback: follow_threshold + 1.0,
        }
    }
}

/// Runs the `commline shell` interactive inbox.
pub async fn run_shell(config: CommlineConfig) -> Result<(), CommlineError> {
    let backend = Arc::new(SimBackend::new());
    let transport = Arc::new(SimTransport::new(Arc::clone(&backend)));
    let telephony = Arc::new(SimTelephony::new());
    let automation = Arc::new(SimAutomation::new(Arc::clone(&backend)));

    let conversation = ConversationId(format!("conv-{}", uuid::Uuid::new_v4()));
    let stream = ConversationStream::subscribe(
        conversation.clone(),
        Arc::clone(&backend) as _,
        Arc::clone(&backend) as _,
        transport as _,
        &config.stream,
    )
    .await?;

    let line = ActiveLine::new(telephony as _, PollerConfig::from(&config.call));
    let coordinator = HandoffCoordinator::new(
        conversation.clone(),
        Arc::clone(&backend) as _,
        automation as _,
        &config.handoff,
    );
    // The demo conversation starts under AI responsibility.
    coordinator.set_handled(true).await?;

    let view = Arc::new(tokio::sync::Mutex::new(FeedView::new(
        config.stream.follow_threshold,
    )));

    // Print messages and background errors as they arrive. While the feed is
    // paused, arrivals are held and only the unseen count is shown.
    let mut snapshot_rx = stream.snapshot_rx();
    let printer_view = Arc::clone(&view);
    tokio::spawn(async move {
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            if snapshot_rx.changed().await.is_err() {
                break;
            }
            let snapshot: Vec<Message> = snapshot_rx.borrow_and_update().clone();
            let mut view = printer_view.lock().await;
            for message in &snapshot {
                if seen.insert(message.id.0.clone()) {
                    match view.anchor.on_new_content() {
                        AnchorAction::AutoScroll => print_message(message),
                        AnchorAction::Preserve => {
                            view.held.push(message.clone());
                            println!(
                                "{}",
                                format!(
                                    "({} unseen; /follow to catch up)",
                                    view.anchor.unseen_count()
                                )
                                .dimmed()
                            );
                        }
                    }
                }
            }
        }
    });
    if let Some(mut errors) = stream.take_error_rx() {
        tokio::spawn(async move {
            while let Some(error) = errors.recv().await {
                eprintln!("{}: {}", "error".red(), error.message);
            }
        });
    }

    let mut channel: Option<ChannelKind> = config
        .workspace
        .default_channel
        .as_deref()
        .and_then(|s| ChannelKind::from_str(s).ok());

    let mut rl = DefaultEditor::new()
        .map_err(|e| CommlineError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("{} shell", config.workspace.name).bold().green());
    println!(
        "Simulated conversation {}. Type a message to send it, {} for commands.\n",
        conversation.to_string().cyan(),
        "/help".yellow()
    );

    let prompt = format!("{}> ", config.workspace.name.green());
    loop {
        match rl.readline(&prompt) {
            Ok(input) => {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&input);

                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if let Err(e) =
                    dispatch(trimmed, &stream, &line, &coordinator, &view, &mut channel).await
                {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    if line.busy().await {
        line.hangup().await?;
    }
    stream.unsubscribe();
    println!("{}", "goodbye".dimmed());
    Ok(())
}

async fn dispatch(
    input: &str,
    stream: &ConversationStream,
    line: &ActiveLine,
    coordinator: &HandoffCoordinator,
    view: &Arc<tokio::sync::Mutex<FeedView>>,
    channel: &mut Option<ChannelKind>,
) -> Result<(), CommlineError> {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (input, ""),
    };

    match command {
        "/help" => {
            print_help();
            Ok(())
        }
        "/channel" => {
            if rest.is_empty() {
                match channel {
                    Some(c) => println!("outbound channel: {c}"),
                    None => println!("no outbound channel selected"),
                }
                return Ok(());
            }
            let parsed = ChannelKind::from_str(rest).map_err(|_| {
                CommlineError::Validation(format!(
                    "unknown channel '{rest}' (expected sms, whatsapp, or email)"
                ))
            })?;
            *channel = Some(parsed);
            println!("outbound channel set to {parsed}");
            Ok(())
        }
        "/call" => {
            if rest.is_empty() {
                return Err(CommlineError::Validation("usage: /call <number>".into()));
            }
            let session = line
                .initiate(CallParams {
                    target: rest.to_string(),
                    agent_id: None,
                    caller_id: None,
                })
                .await?;
            let guard = session.lock().await;
            println!("calling {} ({})", rest.cyan(), guard.call_id());
            Ok(())
        }
        "/hold" => {
            let held = line.toggle_hold().await?;
            println!("{}", if held { "call on hold" } else { "call resumed" });
            Ok(())
        }
        "/mute" => {
            let muted = line.toggle_mute().await?;
            println!("{}", if muted { "muted" } else { "unmuted" });
            Ok(())
        }
        "/transfer" => {
            if rest.is_empty() {
                return Err(CommlineError::Validation("usage: /transfer <number>".into()));
            }
            line.transfer(rest).await?;
            println!("transferred to {rest}");
            Ok(())
        }
        "/hangup" => {
            line.hangup().await?;
            println!("call ended");
            Ok(())
        }
        "/callstatus" => {
            match line.session().await {
                Some(session) => {
                    let guard = session.lock().await;
                    let duration = guard
                        .duration()
                        .map(|d| format!(", {}s", d.num_seconds()))
                        .unwrap_or_default();
                    println!(
                        "call {} to {}: {}{duration}",
                        guard.call_id(),
                        guard.remote(),
                        guard.state()
                    );
                }
                None => println!("no call"),
            }
            Ok(())
        }
        "/follow" => {
            let mut view = view.lock().await;
            if view.anchor.following() {
                let scrollback = view.scrollback;
                view.anchor.on_scroll(scrollback);
                println!("feed paused; new messages will be held");
            } else {
                view.anchor.jump_to_latest();
                let held = std::mem::take(&mut view.held);
                for message in &held {
                    print_message(message);
                }
                println!("caught up ({} held)", held.len());
            }
            Ok(())
        }
        "/pause" => {
            let paused = coordinator.toggle_paused().await?;
            println!(
                "{}",
                if paused {
                    "automation paused"
                } else {
                    "automation resumed"
                }
            );
            Ok(())
        }
        "/handoff" => {
            let reason = if rest.is_empty() { "requested from shell" } else { rest };
            coordinator.request_handoff(reason).await?;
            println!("handoff requested: {reason}");
            Ok(())
        }
        "/clearhandoff" => {
            coordinator.clear_handoff().await?;
            println!("handoff cleared");
            Ok(())
        }
        "/invoke" => {
            if coordinator.invoke_now(*channel).await? {
                println!("automation invoked");
            } else {
                println!("automation already running");
            }
            Ok(())
        }
        "/ai" => {
            let state = coordinator.state().await?;
            println!(
                "ai: handled={} paused={} handoff_requested={}",
                state.ai_handled, state.ai_paused, state.ai_handoff_requested
            );
            Ok(())
        }
        _ if command.starts_with('/') => Err(CommlineError::Validation(format!(
            "unknown command {command} (try /help)"
        ))),
        _ => {
            let stub = stream.send(OutboundDraft::text(input), *channel).await?;
            debug!(stub = %stub, "message submitted");
            // The gate decides whether the AI agent chimes in after a send.
            if coordinator.automation_allowed().await? {
                let _ = coordinator.invoke_now(*channel).await;
            }
            Ok(())
        }
    }
}

fn print_message(message: &Message) {
    let who = match message.direction {
        Direction::Outbound => "you".green(),
        Direction::Inbound => "customer".cyan(),
    };
    let marker = if message.id.is_temp() {
        " (sending)".dimmed().to_string()
    } else {
        String::new()
    };
    println!("{who}: {}{marker}", message.body);
}

fn print_help() {
    println!("commands:");
    println!("  <text>               send a message on the selected channel");
    println!("  /channel [kind]      show or set the outbound channel");
    println!("  /call <number>       start a simulated call");
    println!("  /hold /mute          toggle hold / mute on the live call");
    println!("  /transfer <number>   transfer the live call");
    println!("  /hangup /callstatus  end / inspect the live call");
    println!("  /follow              pause or resume the live message feed");
    println!("  /pause               toggle AI automation pause");
    println!("  /handoff [reason]    request a human handoff");
    println!("  /clearhandoff        dismiss a pending handoff request");
    println!("  /invoke              trigger one automation run now");
    println!("  /ai                  show the AI responsibility state");
    println!("  /quit                exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_feed_holds_arrivals_until_catch_up() {
        let mut view = FeedView::new(100.0);
        assert!(view.anchor.following());
        assert_eq!(view.anchor.on_new_content(), AnchorAction::AutoScroll);

        let scrollback = view.scrollback;
        view.anchor.on_scroll(scrollback);
        assert!(!view.anchor.following());
        assert_eq!(view.anchor.on_new_content(), AnchorAction::Preserve);
        assert_eq!(view.anchor.on_new_content(), AnchorAction::Preserve);
        assert_eq!(view.anchor.unseen_count(), 2);

        view.anchor.jump_to_latest();
        assert!(view.anchor.following());
        assert_eq!(view.anchor.unseen_count(), 0);
        assert_eq!(view.anchor.on_new_content(), AnchorAction::AutoScroll);
    }
}
