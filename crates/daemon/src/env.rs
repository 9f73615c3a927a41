// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::time::Duration;

fn duration_var(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

/// State-flush cadence (durable offset commit), default 10 s.
pub fn state_flush_interval() -> Duration {
    duration_var("OVL_STATE_FLUSH_MS", Duration::from_secs(10))
}

/// Team-state poll cadence, default 30 s.
pub fn poll_interval() -> Duration {
    duration_var("OVL_POLL_INTERVAL_MS", ovl_remote::poller::POLL_INTERVAL)
}

/// Reload-flag-file poll cadence, default 2 s.
pub fn reload_poll_interval() -> Duration {
    duration_var("OVL_RELOAD_POLL_MS", Duration::from_secs(2))
}
