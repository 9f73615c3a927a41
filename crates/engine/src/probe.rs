// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The synchronous overlap probe.
//!
//! Called per edit attempt: resolve where the edit lands, ask each team's
//! server (2 s budget), and fall back to the locally mirrored team state
//! when every team is unreachable. The decision blocks only on line- or
//! function-tier overlaps.

use crate::git::{git_info, GitHost};
use chrono::Utc;
use ovl_adapters::symbols;
use ovl_core::{
    ActiveRegion, Config, OverlapHit, OverlapHome, ProbeDecision, TeamStateSession, Tier,
};
use ovl_remote::{ApiClient, OverlapQueryRequest};
use std::path::{Component, Path, PathBuf};
use tokio::task::JoinSet;
use tracing::debug;

/// Regions this many lines apart (or closer) count as adjacent.
const ADJACENT_GAP_LINES: u32 = 30;

/// One intended edit, as reported by the editor hook or CLI flags.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub cwd: PathBuf,
    pub file_path: String,
    /// The substring the edit proposes to replace, for region resolution.
    pub old_string: Option<String>,
    /// Overrides git-derived repo naming (for non-repo working dirs).
    pub repo_override: Option<String>,
    pub session_id: Option<String>,
}

/// The probe's structured verdict.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub decision: ProbeDecision,
    pub overlaps: Vec<OverlapHit>,
    pub guidance: Option<String>,
    pub git_host: GitHost,
    /// Set when the remote was unreachable and the local mirror answered.
    pub warning: Option<String>,
    /// Teammate sessions in the target repo (mirror fallback only).
    pub team_sessions: Vec<TeamStateSession>,
}

impl ProbeOutcome {
    fn proceed(git_host: GitHost) -> Self {
        Self {
            decision: ProbeDecision::Proceed,
            overlaps: Vec::new(),
            guidance: None,
            git_host,
            warning: None,
            team_sessions: Vec::new(),
        }
    }
}

/// Run the probe for one intended edit.
pub async fn run_probe(
    config: &Config,
    home: &OverlapHome,
    client: &ApiClient,
    request: ProbeRequest,
) -> ProbeOutcome {
    let info = git_info(&request.cwd).await;

    let (repo_name, git_host, git_root) = match (info, request.repo_override.clone()) {
        (Some(info), override_repo) => {
            let Some(repo) = override_repo.or(info.repo_name) else {
                return ProbeOutcome::proceed(info.host);
            };
            (repo, info.host, info.git_root)
        }
        (None, Some(repo)) => (repo, GitHost::None, request.cwd.clone()),
        (None, None) => return ProbeOutcome::proceed(GitHost::None),
    };

    let absolute = if Path::new(&request.file_path).is_absolute() {
        PathBuf::from(&request.file_path)
    } else {
        request.cwd.join(&request.file_path)
    };
    let Some(relative) = relative_to_root(&absolute, &git_root) else {
        // Escapes the repo root; nothing to check
        return ProbeOutcome::proceed(git_host);
    };

    let target = request
        .old_string
        .as_deref()
        .and_then(|old| symbols::resolve_region(&absolute, old));
    let (target_start, target_end, target_function) = match &target {
        Some(region) => (
            Some(region.start_line),
            Some(region.end_line),
            region.enclosing_symbol.clone(),
        ),
        None => (None, None, None),
    };

    // Ask every team in parallel; any success settles the answer remotely.
    let mut set = JoinSet::new();
    for team in &config.teams {
        let client = client.clone();
        let url = team.instance_url.clone();
        let token = team.user_token.clone();
        let query = OverlapQueryRequest {
            repo_name: repo_name.clone(),
            file_path: relative.clone(),
            session_id: request.session_id.clone(),
            start_line: target_start,
            end_line: target_end,
            function_name: target_function.clone(),
        };
        set.spawn(async move {
            let result = client.overlap_query(&url, &token, &query).await;
            (url, result)
        });
    }

    let own_ids = config.user_ids();
    let mut overlaps = Vec::new();
    let mut guidance = None;
    let mut any_success = false;
    while let Some(joined) = set.join_next().await {
        let Ok((url, result)) = joined else { continue };
        match result {
            Ok(response) => {
                any_success = true;
                overlaps.extend(
                    response
                        .overlaps
                        .into_iter()
                        .filter(|o| !own_ids.contains(&o.user_id)),
                );
                if guidance.is_none() {
                    guidance = response.guidance;
                }
            }
            Err(e) => debug!(team_url = %url, error = %e, "overlap query failed"),
        }
    }

    if any_success {
        return ProbeOutcome {
            decision: ProbeDecision::from_overlaps(&overlaps),
            overlaps,
            guidance,
            git_host,
            warning: None,
            team_sessions: Vec::new(),
        };
    }

    // Every team unreachable: consult the poller's local mirror.
    mirror_fallback(
        home,
        &repo_name,
        &relative,
        target_start,
        target_end,
        target_function.as_deref(),
        &own_ids,
        git_host,
    )
}

#[allow(clippy::too_many_arguments)]
fn mirror_fallback(
    home: &OverlapHome,
    repo_name: &str,
    relative: &str,
    target_start: Option<u32>,
    target_end: Option<u32>,
    target_function: Option<&str>,
    own_ids: &std::collections::BTreeSet<String>,
    git_host: GitHost,
) -> ProbeOutcome {
    let Some(mirror) = ovl_storage::read_mirror(&home.mirror_path()) else {
        return ProbeOutcome::proceed(git_host);
    };

    let team_sessions: Vec<TeamStateSession> = mirror
        .active_sessions(Utc::now())
        .iter()
        .filter(|s| s.repo_name == repo_name && !own_ids.contains(&s.user_id))
        .cloned()
        .collect();

    let mut overlaps = Vec::new();
    for session in &team_sessions {
        for region in &session.regions {
            if region.file_path != relative {
                continue;
            }
            let tier = classify_region(region, target_start, target_end, target_function);
            overlaps.push(OverlapHit {
                session_id: session.session_id.clone(),
                user_id: session.user_id.clone(),
                display_name: session.display_name.clone(),
                file_path: region.file_path.clone(),
                tier,
                start_line: region.start_line,
                end_line: region.end_line,
                function_name: region.function_name.clone(),
                summary: session.summary.clone(),
            });
        }
    }

    let warning = (!overlaps.is_empty() || !team_sessions.is_empty())
        .then(|| "teams unreachable; answered from the cached team snapshot".to_string());

    ProbeOutcome {
        decision: ProbeDecision::from_overlaps(&overlaps),
        overlaps,
        guidance: None,
        git_host,
        warning,
        team_sessions,
    }
}

/// Classify one teammate region against the target region.
pub(crate) fn classify_region(
    region: &ActiveRegion,
    target_start: Option<u32>,
    target_end: Option<u32>,
    target_function: Option<&str>,
) -> Tier {
    let same_function = matches!(
        (region.function_name.as_deref(), target_function),
        (Some(theirs), Some(ours)) if theirs == ours
    );

    if let (Some(rs), Some(re), Some(ts), Some(te)) =
        (region.start_line, region.end_line, target_start, target_end)
    {
        if ts <= re && te >= rs {
            return Tier::Line;
        }
        if same_function {
            return Tier::Function;
        }
        let gap = if te < rs { rs - te } else { ts - re };
        if gap <= ADJACENT_GAP_LINES {
            return Tier::Adjacent;
        }
        return Tier::File;
    }

    if same_function {
        return Tier::Function;
    }
    Tier::File
}

/// Lexically normalize and relativize `path` against `root`.
///
/// `None` when the path escapes the root (its relative form would start
/// with `..`).
fn relative_to_root(path: &Path, root: &Path) -> Option<String> {
    let path = normalize_lexical(path);
    let root = normalize_lexical(root);
    let relative = path.strip_prefix(&root).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(relative.to_string_lossy().into_owned())
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
