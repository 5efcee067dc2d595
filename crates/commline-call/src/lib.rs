// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call session management.
//!
//! One live call per workspace. [`ActiveLine`] owns the slot, the
//! [`machine::CallSession`] state machine governs what the call can do, and
//! the [`poller::StatusPoller`] drives provider-backed sessions by reading
//! the remote record on an interval.

pub mod line;
pub mod machine;
pub mod poller;

pub use line::{ActiveLine, SharedSession};
pub use machine::{CallSession, CallSignal};
pub use poller::{PollerConfig, PollerHandle, StatusPoller};
