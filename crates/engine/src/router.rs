// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attach routing targets to parsed events.
//!
//! A normal session routes everything to its matched repo. A
//! parent-directory session splits by subdirectory: file ops under
//! `cwd/<subdir>/…` are relabeled with the subrepo (and a repo-suffixed
//! session id) and file ops outside every registered subdir are dropped.

use ovl_core::event::{EventKind, BASH_SENTINEL, GLOB_SENTINEL, GREP_SENTINEL};
use ovl_core::{Event, TrackedFile};
use crate::matcher::Rosters;
use std::path::Path;

/// One event labeled with its destination team.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEvent {
    pub team_url: String,
    pub event: Event,
}

fn is_sentinel(path: &str) -> bool {
    matches!(path, BASH_SENTINEL | GREP_SENTINEL | GLOB_SENTINEL)
}

/// Route a batch of events parsed from one journal file.
pub fn route_events(events: Vec<Event>, tracked: &TrackedFile, rosters: &Rosters) -> Vec<RoutedEvent> {
    let mut routed = Vec::new();
    for event in events {
        if tracked.is_parent_session() && event.is_file_op() {
            route_parent_file_op(event, tracked, rosters, &mut routed);
        } else {
            route_plain(event, tracked, &mut routed);
        }
    }
    routed
}

/// Default routing: stamp the matched repo, relativize the path against
/// the session cwd, fan out to every matched team.
fn route_plain(mut event: Event, tracked: &TrackedFile, routed: &mut Vec<RoutedEvent>) {
    event.repo_name = Some(tracked.matched_repo.clone());
    if let EventKind::FileOp { file_path, .. } = &mut event.kind {
        if !is_sentinel(file_path) {
            *file_path = relative_to(file_path, &tracked.cwd);
        }
    }
    for team_url in &tracked.matched_teams {
        routed.push(RoutedEvent {
            team_url: team_url.clone(),
            event: event.clone(),
        });
    }
}

/// Parent-directory sessions: a file op belongs to the subrepo containing
/// it. The session id is suffixed with the repo so each subrepo reads as
/// its own session server-side.
fn route_parent_file_op(
    mut event: Event,
    tracked: &TrackedFile,
    rosters: &Rosters,
    routed: &mut Vec<RoutedEvent>,
) {
    let Some(sub_dir_repos) = &tracked.sub_dir_repos else {
        return;
    };
    let EventKind::FileOp { file_path, .. } = &event.kind else {
        return;
    };
    if is_sentinel(file_path) {
        // Not attributable to a subrepo
        return;
    }

    let Some((relative, repo)) = sub_dir_repos.iter().find_map(|(subdir, repo)| {
        let prefix = Path::new(&tracked.cwd).join(subdir);
        strip_prefix(file_path, &prefix.to_string_lossy()).map(|rel| (rel, repo.clone()))
    }) else {
        // Outside every registered subdir
        return;
    };

    event.session_id = format!("{}:{}", event.session_id, repo);
    event.repo_name = Some(repo.clone());
    if let EventKind::FileOp { file_path, .. } = &mut event.kind {
        *file_path = relative;
    }

    for team_url in &tracked.matched_teams {
        let owns_repo = rosters
            .get(team_url)
            .is_some_and(|repos| repos.contains(&repo));
        if owns_repo {
            routed.push(RoutedEvent {
                team_url: team_url.clone(),
                event: event.clone(),
            });
        }
    }
}

/// Strip `base` plus the separator from `path`, or `None` if not under it.
///
/// Requires a path-component boundary, so `/w/ab` is not under `/w/a`.
fn strip_prefix(path: &str, base: &str) -> Option<String> {
    let rest = path.strip_prefix(base)?.strip_prefix('/')?;
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// Relativize against `base` when inside it; foreign paths pass through.
fn relative_to(path: &str, base: &str) -> String {
    strip_prefix(path, base).unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
