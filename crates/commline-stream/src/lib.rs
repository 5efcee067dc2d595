// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time conversation streaming for the Commline workspace.
//!
//! Three pieces keep a user's view of "what messages exist" consistent while
//! sends are optimistic and inserts arrive asynchronously:
//!
//! - [`OptimisticTracker`]: local stubs for outbound messages awaiting
//!   server confirmation.
//! - [`ConversationStream`]: the server-confirmed list for one conversation,
//!   merged with the tracker's stubs and refreshed on change-feed notices.
//! - [`ScrollAnchor`]: follow-or-preserve decisions for the viewport, with
//!   an unseen-arrival counter.

pub mod anchor;
pub mod stream;
pub mod tracker;

pub use anchor::{AnchorAction, ScrollAnchor};
pub use stream::{ConversationStream, StreamError};
pub use tracker::OptimisticTracker;
