// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI handoff coordination.
//!
//! Tracks, per conversation, whether an automated agent or a human is
//! responsible and whether a handoff has been asked for. Consulted by the
//! message and call flows to decide whether automation is suppressed.

pub mod coordinator;

pub use coordinator::HandoffCoordinator;
