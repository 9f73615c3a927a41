// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::time::Duration;

/// Git subprocess timeout, overridable via `OVL_GIT_TIMEOUT_MS` (default 5 s).
pub fn git_timeout() -> Duration {
    std::env::var("OVL_GIT_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
