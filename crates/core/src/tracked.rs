// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-journal-file tracking record.

use crate::accumulator::SessionAccumulator;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Persisted state for one journal file.
///
/// Invariant: the byte range `[0, byte_offset)` has been parsed and every
/// derived event has been acknowledged by every team in `matched_teams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    #[serde(default)]
    pub byte_offset: u64,
    pub session_id: String,
    /// Canonical instance URLs this file's events are routed to.
    #[serde(default)]
    pub matched_teams: Vec<String>,
    pub matched_repo: String,
    /// Subdir-name → repo-name map for parent-directory sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_dir_repos: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub turn_number: u32,
    #[serde(default)]
    pub files_touched: BTreeSet<String>,
    pub cwd: String,
}

impl TrackedFile {
    /// Rebuild the volatile accumulator for this file.
    ///
    /// A tracked file only exists once a record carrying `cwd` was seen, so
    /// a non-zero acknowledged offset implies the base SessionStart went
    /// out. Branch/model backfill flags are not persisted; re-emitting one
    /// after a restart is acceptable because the server deduplicates.
    pub fn accumulator(&self) -> SessionAccumulator {
        SessionAccumulator {
            turn_number: self.turn_number,
            files_touched: self.files_touched.clone(),
            session_start_emitted: self.byte_offset > 0,
            branch_emitted: false,
            model_emitted: false,
            cwd: Some(self.cwd.clone()),
            git_branch: None,
            model: None,
        }
    }

    /// Fold the accumulator's progress back into the durable record.
    pub fn absorb(&mut self, acc: &SessionAccumulator) {
        self.turn_number = acc.turn_number;
        self.files_touched = acc.files_touched.clone();
        if let Some(cwd) = &acc.cwd {
            self.cwd = cwd.clone();
        }
    }

    /// Whether this file is a parent-directory session spanning subrepos.
    pub fn is_parent_session(&self) -> bool {
        self.sub_dir_repos.as_ref().is_some_and(|m| !m.is_empty())
    }
}

#[cfg(test)]
#[path = "tracked_tests.rs"]
mod tests;
