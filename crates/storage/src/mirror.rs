// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide team-state mirror file.
//!
//! Written atomically by the daemon's poller, read by the overlap probe
//! from a different process. A missing mirror means "no data"; a stale one
//! means the daemon is not running (or polling is suspended).

use crate::persist::{save_json_atomic, PersistError};
use ovl_core::TeamStateMirror;
use std::path::Path;

pub fn write_mirror(path: &Path, mirror: &TeamStateMirror) -> Result<(), PersistError> {
    save_json_atomic(path, mirror)
}

/// Read the mirror, retrying once on a parse failure.
///
/// The writer renames atomically, so a failed parse almost always means we
/// raced the rename; the second read sees the settled file.
pub fn read_mirror(path: &Path) -> Option<TeamStateMirror> {
    for _ in 0..2 {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(mirror) => return Some(mirror),
                Err(_) => continue,
            },
            Err(_) => return None,
        }
    }
    None
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
