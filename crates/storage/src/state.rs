// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tracked-files table persisted as `state.json`.

use crate::persist::{load_json_or_default, save_json_atomic, PersistError};
use ovl_core::TrackedFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Durable map of journal-file path → tracking record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TracerState {
    #[serde(default)]
    pub tracked_files: BTreeMap<String, TrackedFile>,
}

impl TracerState {
    pub fn load(path: &Path) -> Self {
        load_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        save_json_atomic(path, self)
    }

    pub fn get(&self, journal_path: &str) -> Option<&TrackedFile> {
        self.tracked_files.get(journal_path)
    }

    pub fn get_mut(&mut self, journal_path: &str) -> Option<&mut TrackedFile> {
        self.tracked_files.get_mut(journal_path)
    }

    pub fn insert(&mut self, journal_path: String, tracked: TrackedFile) {
        self.tracked_files.insert(journal_path, tracked);
    }

    /// Advance the acknowledged offset; offsets never move backwards.
    pub fn advance_offset(&mut self, journal_path: &str, offset: u64) {
        if let Some(tracked) = self.tracked_files.get_mut(journal_path) {
            if offset > tracked.byte_offset {
                tracked.byte_offset = offset;
            }
        }
    }

    /// Truncation reset: drop all state for the path so it re-processes
    /// from zero. The server deduplicates any re-sent events.
    pub fn reset(&mut self, journal_path: &str) {
        self.tracked_files.remove(journal_path);
    }

    /// Evict every file routed to one of the removed repos.
    ///
    /// Returns the evicted journal paths (for logging and read-head
    /// cleanup).
    pub fn evict_repos(&mut self, removed: &[String]) -> Vec<String> {
        let evicted: Vec<String> = self
            .tracked_files
            .iter()
            .filter(|(_, t)| removed.contains(&t.matched_repo))
            .map(|(path, _)| path.clone())
            .collect();
        for path in &evicted {
            self.tracked_files.remove(path);
        }
        evicted
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
