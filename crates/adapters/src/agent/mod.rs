// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent adapter capability set.
//!
//! One implementation per coding agent. The supervisor is agnostic: it
//! watches `watch_dir()` for `file_extension()` files and feeds each
//! complete record through `parse_line`. New agents add another instance
//! without touching the supervisor.

pub mod claude;

use ovl_core::{Event, SessionAccumulator};
use std::path::{Path, PathBuf};

/// Capability set for one supported coding agent.
pub trait AgentAdapter: Send + Sync {
    /// Stable identifier stamped on every derived event.
    fn agent_type(&self) -> &'static str;

    /// Root directory to watch recursively for session journals.
    fn watch_dir(&self) -> PathBuf;

    /// Journal file extension, without the dot.
    fn file_extension(&self) -> &'static str;

    /// Derive the session id from a journal file path.
    fn extract_session_id(&self, path: &Path) -> String;

    /// Turn one journal record into zero or more events.
    ///
    /// Malformed records yield no events and must not move the
    /// accumulator. Parsing the same record against an equal accumulator
    /// yields an identical event sequence.
    fn parse_line(
        &self,
        record: &str,
        session_id: &str,
        acc: &mut SessionAccumulator,
    ) -> Vec<Event>;
}
