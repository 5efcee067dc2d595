// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Commline conversation core.

pub mod adapter;
pub mod automation;
pub mod feed;
pub mod gate;
pub mod store;
pub mod telephony;
pub mod transport;

pub use adapter::Adapter;
pub use automation::Automation;
pub use feed::{ChangeFeed, FeedSubscription};
pub use gate::AiGateStore;
pub use store::MessageStore;
pub use telephony::Telephony;
pub use transport::MessageTransport;
