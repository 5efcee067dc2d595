// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters and test harness for deterministic Commline testing.
//!
//! Provides in-memory stand-ins for every external collaborator: the hosted
//! store and its change feed ([`MockBackend`]), the outbound transport
//! ([`MockTransport`]), the telephony provider ([`MockTelephony`]), and the
//! automated agent ([`MockAutomation`]), plus a pre-wired [`TestHarness`].

pub mod harness;
pub mod mock_automation;
pub mod mock_backend;
pub mod mock_telephony;
pub mod mock_transport;

pub use harness::TestHarness;
pub use mock_automation::MockAutomation;
pub use mock_backend::{backend_handles, MockBackend};
pub use mock_telephony::MockTelephony;
pub use mock_transport::{MockTransport, SentRecord};
