// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic team-state mirroring.
//!
//! Every poll fetches each team's active-session snapshot, tags sessions
//! with their originating instance, merges across teams, and atomically
//! replaces the local mirror file. The overlap probe reads the mirror from
//! its own process when teams are unreachable.

use crate::client::{ApiClient, ApiError};
use ovl_core::{TeamStateMirror, TeamStateSession};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of one poll round.
#[derive(Debug, Default)]
pub struct PollOutcome {
    /// Teams whose token was rejected this round.
    pub auth_failures: Vec<String>,
    /// Whether the mirror file was rewritten.
    pub mirror_written: bool,
}

pub struct Poller {
    client: ApiClient,
    mirror_path: PathBuf,
}

impl Poller {
    pub fn new(client: ApiClient, mirror_path: PathBuf) -> Self {
        Self {
            client,
            mirror_path,
        }
    }

    /// Poll each team once, in parallel, and rewrite the mirror.
    ///
    /// `teams` holds `(instance_url, token)` pairs for non-suspended teams.
    /// The mirror is left untouched when no team responds, so a transient
    /// outage does not erase the last known snapshot before it goes stale
    /// on its own.
    pub async fn poll_once(&self, teams: &[(String, String)]) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        if teams.is_empty() {
            return outcome;
        }

        let mut set = JoinSet::new();
        for (url, token) in teams {
            let client = self.client.clone();
            let url = url.clone();
            let token = token.clone();
            set.spawn(async move {
                let result = client.team_state(&url, &token).await;
                (url, result)
            });
        }

        let mut merged: Vec<TeamStateSession> = Vec::new();
        let mut any_success = false;
        while let Some(joined) = set.join_next().await {
            let Ok((url, result)) = joined else { continue };
            match result {
                Ok(sessions) => {
                    any_success = true;
                    for mut session in sessions {
                        if session.instance_url.is_none() {
                            session.instance_url = Some(url.clone());
                        }
                        merged.push(session);
                    }
                }
                Err(ApiError::Auth) => {
                    warn!(team_url = %url, "team-state poll rejected; suspending team");
                    outcome.auth_failures.push(url);
                }
                Err(e) => {
                    debug!(team_url = %url, error = %e, "team-state poll failed; mirror kept");
                }
            }
        }

        if any_success {
            // Stable order for the mirror file
            merged.sort_by(|a, b| a.session_id.cmp(&b.session_id));
            match ovl_storage::write_mirror(&self.mirror_path, &TeamStateMirror::new(merged)) {
                Ok(()) => outcome.mirror_written = true,
                Err(e) => warn!(error = %e, "failed to write team-state mirror"),
            }
        }
        outcome
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
