// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude Code journal adapter.
//!
//! Claude writes one JSONL file per session under
//! `~/.claude/projects/<project-dir>/<session-id>.jsonl`. Records of
//! interest: the first record carrying `cwd` (session start), `user`
//! messages (prompts), `assistant` messages (text/thinking/tool_use
//! blocks), and the final `result` record.

use super::AgentAdapter;
use ovl_core::event::{operation_for_tool, sentinel_for_tool};
use ovl_core::{Event, EventKind, FileOperation, ResponseType, SessionAccumulator, TokenUsage};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Environment variables that indicate a remote development host.
const REMOTE_INDICATOR_VARS: &[&str] = &[
    "SSH_CONNECTION",
    "SSH_CLIENT",
    "SSH_TTY",
    "CODESPACES",
    "REMOTE_CONTAINERS",
];

#[derive(Debug, Clone, Default)]
pub struct ClaudeAdapter;

impl ClaudeAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl AgentAdapter for ClaudeAdapter {
    fn agent_type(&self) -> &'static str {
        "claude"
    }

    /// Uses `CLAUDE_CONFIG_DIR` if set, otherwise defaults to `~/.claude`.
    fn watch_dir(&self) -> PathBuf {
        let base = std::env::var("CLAUDE_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".claude"));
        base.join("projects")
    }

    fn file_extension(&self) -> &'static str {
        "jsonl"
    }

    /// Journal files are named `<session-id>.jsonl`.
    fn extract_session_id(&self, path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn parse_line(
        &self,
        record: &str,
        session_id: &str,
        acc: &mut SessionAccumulator,
    ) -> Vec<Event> {
        let Ok(json) = serde_json::from_str::<Value>(record) else {
            return Vec::new();
        };
        if !json.is_object() {
            return Vec::new();
        }

        let session_id = get_str(&json, "sessionId")
            .or_else(|| get_str(&json, "session_id"))
            .unwrap_or(session_id)
            .to_string();
        let timestamp = extract_timestamp(&json).unwrap_or_default();

        let mut events = Vec::new();

        observe_session_fields(&json, acc);
        emit_session_starts(&json, acc, &session_id, &timestamp, &mut events);

        match get_str(&json, "type") {
            Some("user") => {
                if let Some(text) = extract_prompt_text(&json) {
                    acc.turn_number += 1;
                    events.push(event(
                        &session_id,
                        &timestamp,
                        EventKind::Prompt {
                            prompt_text: text,
                            turn_number: acc.turn_number,
                        },
                    ));
                }
            }
            Some("assistant") => {
                extract_assistant_events(&json, acc, &session_id, &timestamp, &mut events);
            }
            Some("result") => {
                events.push(session_end(&json, acc, &session_id, &timestamp));
            }
            _ => {}
        }

        events
    }
}

fn event(session_id: &str, timestamp: &str, kind: EventKind) -> Event {
    Event {
        session_id: session_id.to_string(),
        timestamp: timestamp.to_string(),
        user_id: None,
        repo_name: None,
        agent_type: "claude".to_string(),
        kind,
    }
}

fn get_str<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(|v| v.as_str())
}

fn extract_timestamp(json: &Value) -> Option<String> {
    get_str(json, "timestamp")
        .or_else(|| json.get("message").and_then(|m| get_str(m, "created_at")))
        .map(String::from)
}

/// Fold cwd/branch/model observations from this record into the accumulator.
fn observe_session_fields(json: &Value, acc: &mut SessionAccumulator) {
    if let Some(cwd) = get_str(json, "cwd") {
        acc.cwd = Some(cwd.to_string());
    }
    if acc.git_branch.is_none() {
        if let Some(branch) = get_str(json, "gitBranch").filter(|b| !b.is_empty()) {
            acc.git_branch = Some(branch.to_string());
        }
    }
    if acc.model.is_none() {
        let model = get_str(json, "model")
            .or_else(|| json.get("message").and_then(|m| get_str(m, "model")));
        if let Some(model) = model {
            acc.model = Some(model.to_string());
        }
    }
}

/// Emit the base SessionStart and at most one backfill per discovered field.
///
/// cwd, branch, and model can each first appear on a later record than the
/// logical session start, so a second SessionStart carrying the now-known
/// fields is emitted once per field. The server deduplicates.
fn emit_session_starts(
    json: &Value,
    acc: &mut SessionAccumulator,
    session_id: &str,
    timestamp: &str,
    events: &mut Vec<Event>,
) {
    if !acc.session_start_emitted {
        if acc.turn_number == 0 && acc.cwd.is_some() {
            events.push(event(session_id, timestamp, session_start_kind(json, acc)));
            acc.session_start_emitted = true;
            acc.branch_emitted = acc.git_branch.is_some();
            acc.model_emitted = acc.model.is_some();
        }
        return;
    }

    let backfill_branch = !acc.branch_emitted && acc.git_branch.is_some();
    let backfill_model = !acc.model_emitted && acc.model.is_some();
    if backfill_branch || backfill_model {
        events.push(event(session_id, timestamp, session_start_kind(json, acc)));
        acc.branch_emitted = acc.branch_emitted || backfill_branch;
        acc.model_emitted = acc.model_emitted || backfill_model;
    }
}

fn session_start_kind(json: &Value, acc: &SessionAccumulator) -> EventKind {
    EventKind::SessionStart {
        cwd: acc.cwd.clone().unwrap_or_default(),
        git_branch: acc.git_branch.clone(),
        git_remote_url: get_str(json, "gitRemoteUrl").map(String::from),
        model: acc.model.clone(),
        agent_version: get_str(json, "version").map(String::from),
        hostname: local_hostname(),
        is_remote: is_remote_host(),
        device_name: device_name(),
    }
}

fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// First DNS label of the hostname.
fn device_name() -> String {
    let host = local_hostname();
    host.split('.').next().unwrap_or(&host).to_string()
}

fn is_remote_host() -> bool {
    REMOTE_INDICATOR_VARS
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Prompt text from a user record: a plain string or an array of text
/// blocks. Tool-result-only records carry no text and yield nothing.
fn extract_prompt_text(json: &Value) -> Option<String> {
    let content = json.get("message")?.get("content")?;
    let text = match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| get_str(b, "type") == Some("text"))
            .filter_map(|b| get_str(b, "text"))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => return None,
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// One event per assistant content block, in block order.
fn extract_assistant_events(
    json: &Value,
    acc: &mut SessionAccumulator,
    session_id: &str,
    timestamp: &str,
    events: &mut Vec<Event>,
) {
    let Some(content) = json
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array())
    else {
        return;
    };

    for block in content {
        match get_str(block, "type") {
            Some("text") => {
                if let Some(text) = get_str(block, "text").filter(|t| !t.is_empty()) {
                    events.push(event(
                        session_id,
                        timestamp,
                        EventKind::AgentResponse {
                            response_text: text.to_string(),
                            response_type: ResponseType::Text,
                            turn_number: acc.turn_number,
                        },
                    ));
                }
            }
            Some("thinking") => {
                if let Some(text) = get_str(block, "thinking").filter(|t| !t.is_empty()) {
                    events.push(event(
                        session_id,
                        timestamp,
                        EventKind::AgentResponse {
                            response_text: text.to_string(),
                            response_type: ResponseType::Thinking,
                            turn_number: acc.turn_number,
                        },
                    ));
                }
            }
            Some("tool_use") => {
                if let Some(ev) = file_op_from_tool_use(block, acc, session_id, timestamp) {
                    events.push(ev);
                }
            }
            _ => {}
        }
    }
}

fn file_op_from_tool_use(
    block: &Value,
    acc: &mut SessionAccumulator,
    session_id: &str,
    timestamp: &str,
) -> Option<Event> {
    let tool_name = get_str(block, "name")?;
    let operation = operation_for_tool(tool_name)?;
    let input = block.get("input").cloned().unwrap_or(Value::Null);

    let file_path = get_str(&input, "file_path")
        .or_else(|| get_str(&input, "notebook_path"))
        .or_else(|| get_str(&input, "path"))
        .map(String::from)
        .or_else(|| sentinel_for_tool(tool_name).map(String::from))?;

    let bash_command = if tool_name == "Bash" {
        get_str(&input, "command").map(String::from)
    } else {
        None
    };

    // Edit carries the replacement directly; MultiEdit carries a list of
    // edits, and the first anchors the region.
    let (old_string, new_string) = match tool_name {
        "Edit" => (
            get_str(&input, "old_string").map(String::from),
            get_str(&input, "new_string").map(String::from),
        ),
        "MultiEdit" => {
            let first = input.get("edits").and_then(|e| e.as_array()).and_then(|a| a.first());
            (
                first.and_then(|e| get_str(e, "old_string")).map(String::from),
                first.and_then(|e| get_str(e, "new_string")).map(String::from),
            )
        }
        _ => (None, None),
    };

    if matches!(operation, FileOperation::Create | FileOperation::Modify)
        && sentinel_for_tool(tool_name).is_none()
    {
        acc.touch_file(&file_path);
    }

    Some(event(
        session_id,
        timestamp,
        EventKind::FileOp {
            tool_name: tool_name.to_string(),
            file_path,
            operation,
            start_line: None,
            end_line: None,
            function_name: None,
            bash_command,
            old_string,
            new_string,
        },
    ))
}

fn session_end(json: &Value, acc: &SessionAccumulator, session_id: &str, timestamp: &str) -> Event {
    let usage = json
        .get("usage")
        .cloned()
        .and_then(|u| serde_json::from_value::<TokenUsage>(u).ok());
    event(
        session_id,
        timestamp,
        EventKind::SessionEnd {
            total_cost_usd: json.get("total_cost_usd").and_then(|v| v.as_f64()),
            duration_ms: json.get("duration_ms").and_then(|v| v.as_u64()),
            num_turns: json
                .get("num_turns")
                .and_then(|v| v.as_u64())
                .map(|n| n as u32)
                .or(Some(acc.turn_number)),
            usage,
            result_summary: get_str(json, "result").map(String::from),
            files_touched: acc.files_touched.iter().cloned().collect(),
        },
    )
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
