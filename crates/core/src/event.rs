// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed activity events derived from agent session journals.

use serde::{Deserialize, Serialize};

/// Sentinel file path for Bash tool uses with no file argument.
pub const BASH_SENTINEL: &str = "(bash)";
/// Sentinel file path for Grep tool uses with no file argument.
pub const GREP_SENTINEL: &str = "(grep)";
/// Sentinel file path for Glob tool uses with no file argument.
pub const GLOB_SENTINEL: &str = "(glob)";

/// One activity event derived from a journal record.
///
/// `user_id` is filled by the sender at transmission time and `repo_name`
/// by the router when the event is matched to a team repo. Everything else
/// is set by the agent adapter that parsed the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub session_id: String,
    /// RFC-3339 timestamp copied from the journal record.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    pub agent_type: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Variant payload, tagged as `event_type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    SessionStart {
        cwd: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        git_branch: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        git_remote_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_version: Option<String>,
        hostname: String,
        is_remote: bool,
        device_name: String,
    },
    FileOp {
        tool_name: String,
        /// Repo-relative after routing; sentinel for non-file tools.
        file_path: String,
        operation: FileOperation,
        #[serde(skip_serializing_if = "Option::is_none")]
        start_line: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_line: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        function_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bash_command: Option<String>,
        /// Transient enrichment input. Stripped by [`Event::redact`] before send.
        #[serde(skip_serializing_if = "Option::is_none")]
        old_string: Option<String>,
        /// Transient enrichment input. Stripped by [`Event::redact`] before send.
        #[serde(skip_serializing_if = "Option::is_none")]
        new_string: Option<String>,
    },
    Prompt {
        prompt_text: String,
        turn_number: u32,
    },
    AgentResponse {
        response_text: String,
        response_type: ResponseType,
        turn_number: u32,
    },
    SessionEnd {
        #[serde(skip_serializing_if = "Option::is_none")]
        total_cost_usd: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        num_turns: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
        #[serde(skip_serializing_if = "Option::is_none")]
        result_summary: Option<String>,
        files_touched: Vec<String>,
    },
}

/// What a FileOp did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    Create,
    Modify,
    Read,
    Execute,
    Search,
}

/// Assistant output flavor for AgentResponse events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Text,
    Thinking,
}

/// Token usage reported on a session's result record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
}

impl Event {
    /// Short variant name for logging.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::SessionStart { .. } => "session_start",
            EventKind::FileOp { .. } => "file_op",
            EventKind::Prompt { .. } => "prompt",
            EventKind::AgentResponse { .. } => "agent_response",
            EventKind::SessionEnd { .. } => "session_end",
        }
    }

    pub fn is_file_op(&self) -> bool {
        matches!(self.kind, EventKind::FileOp { .. })
    }

    /// The file path of a FileOp event, if this is one.
    pub fn file_path(&self) -> Option<&str> {
        match &self.kind {
            EventKind::FileOp { file_path, .. } => Some(file_path),
            _ => None,
        }
    }

    /// Strip fields that must never leave the machine.
    ///
    /// `old_string`/`new_string` are carried on FileOps only for local
    /// enrichment (line ranges, enclosing symbol) and the overlap query.
    pub fn redact(&mut self) {
        if let EventKind::FileOp {
            old_string,
            new_string,
            ..
        } = &mut self.kind
        {
            *old_string = None;
            *new_string = None;
        }
    }
}

/// Map a tracked tool name to its file operation.
///
/// Returns `None` for tools the tracer does not follow.
pub fn operation_for_tool(tool_name: &str) -> Option<FileOperation> {
    match tool_name {
        "Write" => Some(FileOperation::Create),
        "Edit" | "MultiEdit" | "NotebookEdit" => Some(FileOperation::Modify),
        "Read" => Some(FileOperation::Read),
        "Bash" => Some(FileOperation::Execute),
        "Grep" | "Glob" => Some(FileOperation::Search),
        _ => None,
    }
}

/// Sentinel path for a non-file tool, if it has one.
pub fn sentinel_for_tool(tool_name: &str) -> Option<&'static str> {
    match tool_name {
        "Bash" => Some(BASH_SENTINEL),
        "Grep" => Some(GREP_SENTINEL),
        "Glob" => Some(GLOB_SENTINEL),
        _ => None,
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
