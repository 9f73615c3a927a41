// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ovl-core: Core types for the Overlap tracer and probe

pub mod accumulator;
pub mod config;
pub mod event;
pub mod paths;
pub mod team_state;
pub mod tracked;

pub use accumulator::SessionAccumulator;
pub use config::{Config, ConfigError, TeamConfig, TracerConfig, SERVER_MAX_BATCH_SIZE};
pub use event::{Event, EventKind, FileOperation, ResponseType, TokenUsage};
pub use paths::{OverlapHome, PathsError};
pub use team_state::{
    ActiveRegion, OverlapHit, ProbeDecision, TeamStateMirror, TeamStateSession, Tier,
    MIRROR_FRESH_SECS,
};
pub use tracked::TrackedFile;
