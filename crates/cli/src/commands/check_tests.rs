// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ovl_core::OverlapHit;
use ovl_engine::GitHost;

fn hit(tier: Tier, who: &str) -> OverlapHit {
    OverlapHit {
        session_id: "s9".into(),
        user_id: "u9".into(),
        display_name: Some(who.into()),
        file_path: "src/a.ts".into(),
        tier,
        start_line: Some(40),
        end_line: Some(60),
        function_name: Some("render".into()),
        summary: None,
    }
}

fn outcome(decision: ProbeDecision, overlaps: Vec<OverlapHit>) -> ProbeOutcome {
    ProbeOutcome {
        decision,
        overlaps,
        guidance: None,
        git_host: GitHost::Github,
        warning: None,
        team_sessions: vec![],
    }
}

#[test]
fn hook_output_is_silent_on_proceed() {
    assert!(hook_output(&outcome(ProbeDecision::Proceed, vec![])).is_none());
}

#[test]
fn hook_output_denies_on_block() {
    let out = outcome(ProbeDecision::Block, vec![hit(Tier::Line, "Ada")]);
    let json: serde_json::Value = serde_json::from_str(&hook_output(&out).unwrap()).unwrap();
    assert_eq!(json["hookSpecificOutput"]["permissionDecision"], "deny");
    assert_eq!(json["hookSpecificOutput"]["hookEventName"], "PreToolUse");
    let reason = json["hookSpecificOutput"]["permissionDecisionReason"]
        .as_str()
        .unwrap();
    assert!(reason.contains("Ada"));
    assert!(reason.contains("src/a.ts:40-60"));
    // The human-readable context rides along with the denial
    let context = json["hookSpecificOutput"]["additionalContext"]
        .as_str()
        .unwrap();
    assert_eq!(context, reason);
}

#[test]
fn hook_output_adds_context_on_warn() {
    let out = outcome(ProbeDecision::Warn, vec![hit(Tier::File, "Ada")]);
    let json: serde_json::Value = serde_json::from_str(&hook_output(&out).unwrap()).unwrap();
    assert!(json["hookSpecificOutput"].get("permissionDecision").is_none());
    assert!(json["hookSpecificOutput"]["additionalContext"]
        .as_str()
        .unwrap()
        .contains("Ada"));
}

#[test]
fn machine_output_carries_decision_and_overlaps() {
    let out = outcome(ProbeDecision::Warn, vec![hit(Tier::Adjacent, "Ada")]);
    let json: serde_json::Value = serde_json::from_str(&machine_output(&out)).unwrap();
    assert_eq!(json["decision"], "warn");
    assert_eq!(json["git_host"], "github");
    assert_eq!(json["overlaps"][0]["tier"], "adjacent");
    assert!(json.get("warning").is_none());
    assert!(json.get("team_sessions").is_none());
}

#[test]
fn machine_output_includes_warning_when_set() {
    let mut out = outcome(ProbeDecision::Proceed, vec![]);
    out.warning = Some("teams unreachable".into());
    let json: serde_json::Value = serde_json::from_str(&machine_output(&out)).unwrap();
    assert_eq!(json["warning"], "teams unreachable");
}

#[test]
fn human_output_names_tier_and_function() {
    let text = human_output(&outcome(
        ProbeDecision::Block,
        vec![hit(Tier::Function, "Ada")],
    ));
    assert!(text.contains("[function]"));
    assert!(text.contains("(in render)"));
    assert!(text.starts_with("Hold on"));
}

#[test]
fn hook_payload_parses_edit_fields() {
    let raw = r#"{
        "session_id": "abc",
        "cwd": "/w/repo",
        "tool_name": "Edit",
        "tool_input": {"file_path": "/w/repo/a.ts", "old_string": "x", "new_string": "y"}
    }"#;
    let payload: HookPayload = serde_json::from_str(raw).unwrap();
    let request = request_from_hook(payload, PathBuf::from("/fallback"), None).unwrap();
    assert_eq!(request.cwd, PathBuf::from("/w/repo"));
    assert_eq!(request.file_path, "/w/repo/a.ts");
    assert_eq!(request.old_string.as_deref(), Some("x"));
    assert_eq!(request.session_id.as_deref(), Some("abc"));
}

#[test]
fn hook_payload_without_file_yields_no_request() {
    let raw = r#"{"cwd": "/w/repo", "tool_input": {}}"#;
    let payload: HookPayload = serde_json::from_str(raw).unwrap();
    assert!(request_from_hook(payload, PathBuf::from("/fallback"), None).is_none());
}

#[test]
fn strict_exit_codes() {
    let args = |strict| CheckArgs {
        file: Some("a.ts".into()),
        old_string: None,
        repo: None,
        cwd: None,
        format: OutputFormat::Json,
        strict,
    };
    let blocked = outcome(ProbeDecision::Block, vec![hit(Tier::Line, "Ada")]);
    let warned = outcome(ProbeDecision::Warn, vec![hit(Tier::File, "Ada")]);

    assert_eq!(strict_exit(&args(true), &blocked), 2);
    assert_eq!(strict_exit(&args(false), &blocked), 0);
    assert_eq!(strict_exit(&args(true), &warned), 0);
}
