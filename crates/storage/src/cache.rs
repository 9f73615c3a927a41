// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repo rosters and git-remote lookups persisted as `cache.json`.

use crate::persist::{load_json_or_default, save_json_atomic, PersistError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Repos registered on one team, as of `fetched_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRoster {
    #[serde(default)]
    pub repos: BTreeSet<String>,
    pub fetched_at: DateTime<Utc>,
}

impl RepoRoster {
    pub fn new(repos: BTreeSet<String>) -> Self {
        Self {
            repos,
            fetched_at: Utc::now(),
        }
    }
}

/// Memoized git remote lookup for one working directory.
///
/// `remote_url: None` is a negative cache entry: the directory has no
/// origin remote (or is not a repo), so the 5 s git query is not repeated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitRemote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

impl GitRemote {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_url(name: Option<String>, remote_url: String) -> Self {
        Self {
            name,
            remote_url: Some(remote_url),
        }
    }
}

// An older cache format stored the bare remote URL string. Accept both and
// migrate to the object form on the next save.
impl<'de> Deserialize<'de> for GitRemote {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Legacy(String),
            Entry {
                #[serde(default)]
                name: Option<String>,
                #[serde(default)]
                remote_url: Option<String>,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Legacy(url) => GitRemote {
                name: None,
                remote_url: if url.is_empty() { None } else { Some(url) },
            },
            Raw::Entry { name, remote_url } => GitRemote { name, remote_url },
        })
    }
}

/// The `cache.json` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchCache {
    #[serde(default)]
    pub repo_lists: BTreeMap<String, RepoRoster>,
    #[serde(default)]
    pub git_remotes: BTreeMap<String, GitRemote>,
}

impl MatchCache {
    pub fn load(path: &Path) -> Self {
        load_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        save_json_atomic(path, self)
    }

    pub fn roster(&self, team_url: &str) -> Option<&RepoRoster> {
        self.repo_lists.get(team_url)
    }

    pub fn set_roster(&mut self, team_url: String, repos: BTreeSet<String>) {
        self.repo_lists.insert(team_url, RepoRoster::new(repos));
    }

    /// Repo names added/removed by a roster refresh, for eviction and
    /// rescan decisions.
    pub fn roster_diff(&self, team_url: &str, fresh: &BTreeSet<String>) -> RosterDiff {
        let empty = BTreeSet::new();
        let old = self
            .repo_lists
            .get(team_url)
            .map(|r| &r.repos)
            .unwrap_or(&empty);
        RosterDiff {
            added: fresh.difference(old).cloned().collect(),
            removed: old.difference(fresh).cloned().collect(),
        }
    }
}

/// Added/removed repo names between two roster fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
