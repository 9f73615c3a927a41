// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version-control interrogation: origin URLs, repo names, repo roots.
//!
//! All subprocess calls carry a timeout and degrade to `None` when git is
//! missing or slow; callers fall back to directory basenames.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::process::Command;

/// Hosting service, used by the probe's output for link formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GitHost {
    Github,
    Gitlab,
    None,
}

/// What we know about the repository enclosing a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInfo {
    pub repo_name: Option<String>,
    pub host: GitHost,
    pub remote_url: Option<String>,
    pub git_root: PathBuf,
}

/// Run one git subcommand under the configured timeout.
async fn git_output(cwd: &Path, args: &[&str]) -> Option<String> {
    let run = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .kill_on_drop(true)
        .output();
    let output = tokio::time::timeout(crate::env::git_timeout(), run)
        .await
        .ok()?
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// The `origin` remote URL of the repo containing `cwd`, if any.
pub async fn origin_url(cwd: &Path) -> Option<String> {
    git_output(cwd, &["config", "--get", "remote.origin.url"]).await
}

/// Resolve the repo enclosing `cwd`: root, origin, and derived name.
///
/// `None` when `cwd` is not inside a working tree.
pub async fn git_info(cwd: &Path) -> Option<GitInfo> {
    let root = git_output(cwd, &["rev-parse", "--show-toplevel"]).await?;
    let git_root = PathBuf::from(root);
    let remote_url = origin_url(cwd).await;

    let repo_name = remote_url
        .as_deref()
        .and_then(repo_name_from_url)
        .or_else(|| {
            git_root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        });
    let host = remote_url.as_deref().map(classify_host).unwrap_or(GitHost::None);

    Some(GitInfo {
        repo_name,
        host,
        remote_url,
        git_root,
    })
}

/// Tail segment of a remote URL, with an optional `.git` suffix stripped.
///
/// Handles both `git@host:org/name.git` and `https://host/org/name`.
pub fn repo_name_from_url(url: &str) -> Option<String> {
    static NAME: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = NAME
        .get_or_init(|| Regex::new(r"[/:]([^/:]+?)(?:\.git)?$").ok())
        .as_ref()?;
    pattern
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn classify_host(url: &str) -> GitHost {
    if url.contains("github.com") {
        GitHost::Github
    } else if url.contains("gitlab") {
        GitHost::Gitlab
    } else {
        GitHost::None
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
