// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Optimistic message tracker.
//!
//! Creates locally-visible message stubs at send time, before the server has
//! confirmed anything, and retires them when the conversation stream observes
//! a matching confirmed record. A failed background send reverts the stub.
//!
//! Reconciliation prefers an exact match on the echoed client reference.
//! Backends that cannot pass the client id through fall back to
//! content+direction matching, which is heuristic: two identical bodies sent
//! in quick succession are ambiguous, and a single confirmation must retire
//! only one of them.

use std::collections::HashSet;

use chrono::Utc;
use tracing::debug;

use commline_core::types::{
    ConversationId, Direction, Message, MessageId, MessageStatus, OutboundDraft,
};

/// Tracks unconfirmed outbound stubs for one conversation.
#[derive(Debug)]
pub struct OptimisticTracker {
    conversation_id: ConversationId,
    stubs: Vec<Message>,
    /// Confirmed ids that have already retired a stub. A confirmed record is
    /// consumed at most once, so one confirmation can never retire two
    /// identical-content stubs.
    consumed: HashSet<MessageId>,
}

impl OptimisticTracker {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            stubs: Vec::new(),
            consumed: HashSet::new(),
        }
    }

    /// Append a `sending` stub for a draft and return its temporary id.
    ///
    /// Synchronous and non-blocking: the background send is the caller's
    /// concern. The tracker never talks to the store or transport.
    pub fn submit(&mut self, draft: &OutboundDraft) -> MessageId {
        let id = MessageId::new_temp();
        let stub = Message {
            id: id.clone(),
            conversation_id: self.conversation_id.clone(),
            direction: Direction::Outbound,
            body: draft.body.clone(),
            media_url: draft.media_url.clone(),
            status: MessageStatus::Sending,
            client_ref: Some(id.0.clone()),
            created_at: Utc::now(),
            sent_at: None,
            delivered_at: None,
            read_at: None,
        };
        self.stubs.push(stub);
        debug!(
            conversation = %self.conversation_id,
            stub = %id,
            "optimistic stub appended"
        );
        id
    }

    /// Retire stubs matched by a batch of confirmed records.
    ///
    /// A confirmed record retires a stub when it is outbound and either
    /// echoes the stub's client reference or (for backends without echo)
    /// carries identical content. First match wins, and each confirmed id is
    /// consumed at most once across reconciles.
    ///
    /// Returns the number of stubs retired.
    pub fn reconcile(&mut self, confirmed: &[Message]) -> usize {
        let mut retired = 0;
        let stubs = std::mem::take(&mut self.stubs);

        for stub in stubs {
            let matched = confirmed.iter().find(|record| {
                record.direction == Direction::Outbound
                    && !self.consumed.contains(&record.id)
                    && match record.client_ref.as_deref() {
                        Some(client_ref) => client_ref == stub.id.0,
                        None => record.body == stub.body,
                    }
            });

            match matched {
                Some(record) => {
                    self.consumed.insert(record.id.clone());
                    retired += 1;
                    debug!(
                        conversation = %self.conversation_id,
                        stub = %stub.id,
                        confirmed = %record.id,
                        "stub retired by confirmed record"
                    );
                }
                None => self.stubs.push(stub),
            }
        }

        retired
    }

    /// Remove a stub after its background send failed. Idempotent: reverting
    /// an already-retired or unknown stub is a no-op returning `false`.
    pub fn revert(&mut self, stub_id: &MessageId) -> bool {
        let before = self.stubs.len();
        self.stubs.retain(|s| s.id != *stub_id);
        let removed = self.stubs.len() < before;
        if removed {
            debug!(
                conversation = %self.conversation_id,
                stub = %stub_id,
                "optimistic stub reverted"
            );
        }
        removed
    }

    /// The unconfirmed stubs, in submission order.
    pub fn stubs(&self) -> &[Message] {
        &self.stubs
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }
}
