// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregated team activity: remote snapshots, overlap tiers, decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mirror older than this is stale and treated as empty.
pub const MIRROR_FRESH_SECS: i64 = 120;

/// A file region a teammate session is actively touching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRegion {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_touched_at: Option<String>,
}

/// One active session in a team's aggregated view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStateSession {
    pub session_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub repo_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub regions: Vec<ActiveRegion>,
    /// Originating team, tagged by the poller when merging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
}

/// The merged local mirror of all teams' active sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStateMirror {
    #[serde(default)]
    pub sessions: Vec<TeamStateSession>,
    pub updated_at: DateTime<Utc>,
}

impl TeamStateMirror {
    pub fn new(sessions: Vec<TeamStateSession>) -> Self {
        Self {
            sessions,
            updated_at: Utc::now(),
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        (now - self.updated_at).num_seconds() <= MIRROR_FRESH_SECS
    }

    /// Sessions if the mirror is fresh, empty otherwise.
    pub fn active_sessions(&self, now: DateTime<Utc>) -> &[TeamStateSession] {
        if self.is_fresh(now) {
            &self.sessions
        } else {
            &[]
        }
    }
}

/// Overlap severity. Variant order is ascending so `Line` compares highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    File,
    Adjacent,
    Function,
    Line,
}

impl Tier {
    /// Tiers that block an edit outright.
    pub fn is_blocking(self) -> bool {
        matches!(self, Tier::Line | Tier::Function)
    }
}

/// One overlap between the intended edit and a teammate's region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapHit {
    pub session_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub file_path: String,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Probe verdict for an intended edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeDecision {
    Proceed,
    Warn,
    Block,
}

impl ProbeDecision {
    /// Block iff any overlap is line- or function-tier, warn on any other
    /// overlap, proceed when there are none.
    pub fn from_overlaps(overlaps: &[OverlapHit]) -> Self {
        if overlaps.iter().any(|o| o.tier.is_blocking()) {
            ProbeDecision::Block
        } else if overlaps.is_empty() {
            ProbeDecision::Proceed
        } else {
            ProbeDecision::Warn
        }
    }
}

#[cfg(test)]
#[path = "team_state_tests.rs"]
mod tests;
