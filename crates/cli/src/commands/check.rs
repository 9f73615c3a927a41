// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ovl check` - the overlap probe front-end.
//!
//! Three modes: editor hook (payload on stdin, hook JSON out, always exit
//! 0), machine JSON, and human text. Strict mode exits 2 on a blocking
//! overlap so shell scripts can gate on it.

use crate::output::OutputFormat;
use anyhow::Result;
use clap::Args;
use ovl_core::{Config, OverlapHome, ProbeDecision, Tier};
use ovl_engine::{run_probe, ProbeOutcome, ProbeRequest};
use ovl_remote::ApiClient;
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;

/// Exit code for a blocking overlap under `--strict`.
const EXIT_BLOCKED: i32 = 2;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// File the edit targets (relative to cwd or absolute)
    #[arg(long)]
    pub file: Option<String>,

    /// The text the edit replaces, for line-level overlap resolution
    #[arg(long)]
    pub old_string: Option<String>,

    /// Repo name override when cwd is not a git checkout
    #[arg(long)]
    pub repo: Option<String>,

    /// Working directory (defaults to the current directory)
    #[arg(short = 'C', long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Exit 2 when the decision is block (text/json modes only)
    #[arg(long)]
    pub strict: bool,
}

/// The slice of an editor hook payload the probe needs.
#[derive(Debug, Default, Deserialize)]
pub struct HookPayload {
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub tool_input: HookToolInput,
}

#[derive(Debug, Default, Deserialize)]
pub struct HookToolInput {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub notebook_path: Option<String>,
    #[serde(default)]
    pub old_string: Option<String>,
}

pub async fn run(args: CheckArgs) -> Result<i32> {
    let home = OverlapHome::resolve()?;
    let config = match Config::load(&home.config_path()) {
        Ok(config) => config,
        // Hook mode never surfaces errors to the editor
        Err(_) if args.format == OutputFormat::Hook => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let request = match build_request(&args)? {
        Some(request) => request,
        // Missing preconditions: silent in hook mode, usage error otherwise
        None if args.format == OutputFormat::Hook => return Ok(0),
        None => {
            anyhow::bail!("--file is required (or pipe a hook payload with --format hook)")
        }
    };

    let outcome = run_probe(&config, &home, &ApiClient::new(), request).await;
    Ok(render(&args, &outcome))
}

/// Assemble the probe request from flags, or stdin in hook mode.
fn build_request(args: &CheckArgs) -> Result<Option<ProbeRequest>> {
    let cwd = args
        .cwd
        .clone()
        .map(Ok)
        .unwrap_or_else(std::env::current_dir)?;

    if args.format == OutputFormat::Hook {
        let mut raw = String::new();
        if std::io::stdin().read_to_string(&mut raw).is_err() {
            return Ok(None);
        }
        let Ok(payload) = serde_json::from_str::<HookPayload>(&raw) else {
            return Ok(None);
        };
        return Ok(request_from_hook(payload, cwd, args.repo.clone()));
    }

    let Some(file) = args.file.clone() else {
        return Ok(None);
    };
    Ok(Some(ProbeRequest {
        cwd,
        file_path: file,
        old_string: args.old_string.clone(),
        repo_override: args.repo.clone(),
        session_id: None,
    }))
}

fn request_from_hook(
    payload: HookPayload,
    fallback_cwd: PathBuf,
    repo_override: Option<String>,
) -> Option<ProbeRequest> {
    let file_path = payload
        .tool_input
        .file_path
        .or(payload.tool_input.notebook_path)?;
    Some(ProbeRequest {
        cwd: payload.cwd.map(PathBuf::from).unwrap_or(fallback_cwd),
        file_path,
        old_string: payload.tool_input.old_string,
        repo_override,
        session_id: payload.session_id,
    })
}

/// Print the outcome in the selected format; returns the exit code.
fn render(args: &CheckArgs, outcome: &ProbeOutcome) -> i32 {
    match args.format {
        OutputFormat::Hook => {
            if let Some(json) = hook_output(outcome) {
                println!("{json}");
            }
            0
        }
        OutputFormat::Json => {
            println!("{}", machine_output(outcome));
            strict_exit(args, outcome)
        }
        OutputFormat::Text => {
            print!("{}", human_output(outcome));
            strict_exit(args, outcome)
        }
    }
}

fn strict_exit(args: &CheckArgs, outcome: &ProbeOutcome) -> i32 {
    if args.strict && outcome.decision == ProbeDecision::Block {
        EXIT_BLOCKED
    } else {
        0
    }
}

/// Hook protocol output. Silent on proceed; deny on block; context-only
/// on warn.
pub fn hook_output(outcome: &ProbeOutcome) -> Option<String> {
    let context = human_output(outcome);
    let body = match outcome.decision {
        ProbeDecision::Proceed => return None,
        ProbeDecision::Block => serde_json::json!({
            "hookSpecificOutput": {
                "hookEventName": "PreToolUse",
                "permissionDecision": "deny",
                "permissionDecisionReason": context.trim_end(),
                "additionalContext": context.trim_end(),
            }
        }),
        ProbeDecision::Warn => serde_json::json!({
            "hookSpecificOutput": {
                "hookEventName": "PreToolUse",
                "additionalContext": context.trim_end(),
            }
        }),
    };
    Some(body.to_string())
}

pub fn machine_output(outcome: &ProbeOutcome) -> String {
    let mut body = serde_json::json!({
        "decision": outcome.decision,
        "overlaps": outcome.overlaps,
        "git_host": outcome.git_host,
    });
    if let Some(warning) = &outcome.warning {
        body["warning"] = serde_json::Value::String(warning.clone());
    }
    if !outcome.team_sessions.is_empty() {
        body["team_sessions"] = serde_json::to_value(&outcome.team_sessions)
            .unwrap_or(serde_json::Value::Null);
    }
    body.to_string()
}

pub fn human_output(outcome: &ProbeOutcome) -> String {
    let mut out = String::new();
    match outcome.decision {
        ProbeDecision::Proceed => out.push_str("No overlapping work. Safe to edit.\n"),
        ProbeDecision::Warn => out.push_str("Heads up: teammates are active in this file.\n"),
        ProbeDecision::Block => {
            out.push_str("Hold on: a teammate is editing the same region.\n")
        }
    }
    for overlap in &outcome.overlaps {
        let who = overlap
            .display_name
            .as_deref()
            .unwrap_or(overlap.user_id.as_str());
        let where_ = match (overlap.start_line, overlap.end_line) {
            (Some(start), Some(end)) => format!("{}:{}-{}", overlap.file_path, start, end),
            _ => overlap.file_path.clone(),
        };
        out.push_str(&format!(
            "  [{}] {} - {}{}\n",
            tier_label(overlap.tier),
            who,
            where_,
            overlap
                .function_name
                .as_deref()
                .map(|f| format!(" (in {f})"))
                .unwrap_or_default(),
        ));
    }
    if let Some(guidance) = &outcome.guidance {
        out.push_str(&format!("  {guidance}\n"));
    }
    if let Some(warning) = &outcome.warning {
        out.push_str(&format!("  note: {warning}\n"));
    }
    out
}

fn tier_label(tier: Tier) -> &'static str {
    match tier {
        Tier::Line => "line",
        Tier::Function => "function",
        Tier::Adjacent => "adjacent",
        Tier::File => "file",
    }
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
