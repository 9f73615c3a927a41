// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Map a session working directory to team/repo routing targets.
//!
//! Resolution order, short-circuit: directory basename against each team's
//! roster, then the git origin URL (memoized in the match cache), then the
//! parent-of-subrepos walk over direct non-hidden subdirectories.

use crate::git;
use ovl_storage::{GitRemote, MatchCache};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// Team rosters keyed by canonical instance URL.
pub type Rosters = BTreeMap<String, BTreeSet<String>>;

/// One routing target for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMatch {
    pub team_url: String,
    pub repo_name: String,
    /// Set when the repo is a direct subdirectory of the session cwd.
    pub subdir: Option<String>,
}

/// Resolve `cwd` against every team roster.
///
/// Git lookups are memoized in `cache.git_remotes` (including negative
/// results), so repeated matching of the same directories is free and the
/// outcome is a function of its inputs.
pub async fn match_repo(cwd: &Path, rosters: &Rosters, cache: &mut MatchCache) -> Vec<RepoMatch> {
    // 1. Basename
    if let Some(name) = basename(cwd) {
        let matches = matches_for_repo(&name, rosters, None);
        if !matches.is_empty() {
            return matches;
        }
    }

    // 2. Origin URL
    if let Some(name) = cached_repo_name(cwd, cache).await {
        let matches = matches_for_repo(&name, rosters, None);
        if !matches.is_empty() {
            return matches;
        }
    }

    // 3. Parent of subrepos
    let mut matches = Vec::new();
    for subdir in direct_subdirs(cwd) {
        let sub_path = cwd.join(&subdir);
        let mut resolved = None;
        if roster_union_contains(rosters, &subdir) {
            resolved = Some(subdir.clone());
        } else if let Some(name) = cached_repo_name(&sub_path, cache).await {
            if roster_union_contains(rosters, &name) {
                resolved = Some(name);
            }
        }
        if let Some(repo) = resolved {
            matches.extend(matches_for_repo(&repo, rosters, Some(subdir)));
        }
    }
    matches
}

fn basename(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn matches_for_repo(repo: &str, rosters: &Rosters, subdir: Option<String>) -> Vec<RepoMatch> {
    rosters
        .iter()
        .filter(|(_, repos)| repos.contains(repo))
        .map(|(team_url, _)| RepoMatch {
            team_url: team_url.clone(),
            repo_name: repo.to_string(),
            subdir: subdir.clone(),
        })
        .collect()
}

fn roster_union_contains(rosters: &Rosters, repo: &str) -> bool {
    rosters.values().any(|repos| repos.contains(repo))
}

/// Repo name for a directory via its origin URL, through the cache.
async fn cached_repo_name(path: &Path, cache: &mut MatchCache) -> Option<String> {
    let key = path.to_string_lossy().into_owned();

    if let Some(entry) = cache.git_remotes.get(&key) {
        return entry
            .name
            .clone()
            .or_else(|| entry.remote_url.as_deref().and_then(git::repo_name_from_url));
    }

    let entry = match git::origin_url(path).await {
        Some(url) => {
            let name = git::repo_name_from_url(&url);
            GitRemote::from_url(name, url)
        }
        None => {
            debug!(path = %path.display(), "no git origin; caching negative result");
            GitRemote::none()
        }
    };
    let name = entry.name.clone();
    cache.git_remotes.insert(key, entry);
    name
}

/// Direct non-hidden subdirectories, sorted for deterministic matching.
fn direct_subdirs(cwd: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(cwd) else {
        return Vec::new();
    };
    let mut dirs: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    dirs.sort();
    dirs
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
