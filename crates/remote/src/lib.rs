// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ovl-remote: HTTP delivery to team instances
//!
//! The API client wraps the team HTTP surface; the sender batches events
//! per team with retry/backoff and auth suspension; the poller mirrors
//! each team's active-session snapshot to a local file.

pub mod client;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod poller;
pub mod sender;

pub use client::{
    ApiClient, ApiError, IngestReport, IngestTransport, OverlapQueryRequest, OverlapQueryResponse,
    RepoEntry, VerifiedUser,
};
pub use poller::Poller;
pub use sender::{Sender, SenderNotice, SenderParams, TeamAuth};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransport, RecordedCall};
