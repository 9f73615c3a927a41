// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ovl-daemon: the tracer daemon (`ovld`)
//!
//! Hosts the supervisor loop: directory watch, state-flush and roster
//! timers, team-state polling, signal handling, and reload.

pub mod env;
pub mod lifecycle;

pub use lifecycle::{startup, DaemonPaths, DaemonState, LifecycleError};
