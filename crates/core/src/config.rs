// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User configuration: joined teams and tracer tuning.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// The server rejects ingest batches larger than this.
pub const SERVER_MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate team instance URL after canonicalization: {url}")]
    DuplicateTeamUrl { url: String },
}

/// One remote team instance the user has joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub name: String,
    /// Canonical base URL, no trailing slash.
    pub instance_url: String,
    pub user_token: String,
    pub user_id: String,
}

impl TeamConfig {
    /// Strip trailing slashes so URL equality is structural.
    pub fn canonicalize(&mut self) {
        while self.instance_url.ends_with('/') {
            self.instance_url.pop();
        }
    }
}

/// Tracer tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracerConfig {
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_repo_sync_interval_ms")]
    pub repo_sync_interval_ms: u64,
}

fn default_batch_interval_ms() -> u64 {
    2000
}

fn default_max_batch_size() -> usize {
    50
}

fn default_repo_sync_interval_ms() -> u64 {
    300_000
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            batch_interval_ms: default_batch_interval_ms(),
            max_batch_size: default_max_batch_size(),
            repo_sync_interval_ms: default_repo_sync_interval_ms(),
        }
    }
}

impl TracerConfig {
    /// Configured batch size clamped to the server maximum.
    pub fn effective_batch_size(&self) -> usize {
        self.max_batch_size.min(SERVER_MAX_BATCH_SIZE).max(1)
    }
}

/// Root of `~/.overlap/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub teams: Vec<TeamConfig>,
    #[serde(default)]
    pub tracer: Option<TracerConfig>,
}

impl Config {
    /// Load and validate the config file.
    ///
    /// A missing file yields the empty config (no teams joined yet). Team
    /// URLs are canonicalized on load; two teams whose URLs differ only by
    /// trailing slashes are the same team and rejected as duplicates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let mut config: Config = serde_json::from_str(&raw)?;
        for team in &mut config.teams {
            team.canonicalize();
        }
        let mut seen = BTreeSet::new();
        for team in &config.teams {
            if !seen.insert(team.instance_url.as_str()) {
                return Err(ConfigError::DuplicateTeamUrl {
                    url: team.instance_url.clone(),
                });
            }
        }
        Ok(config)
    }

    pub fn tracer(&self) -> TracerConfig {
        self.tracer.clone().unwrap_or_default()
    }

    pub fn team(&self, instance_url: &str) -> Option<&TeamConfig> {
        self.teams
            .iter()
            .find(|t| t.instance_url == instance_url.trim_end_matches('/'))
    }

    /// All configured user ids (for probe self-exclusion).
    pub fn user_ids(&self) -> BTreeSet<String> {
        self.teams.iter().map(|t| t.user_id.clone()).collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
