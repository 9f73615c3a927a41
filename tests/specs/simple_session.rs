// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: one session, one edit, one result, everything routed to the
//! single team that tracks the repo.

use crate::prelude::*;
use ovl_core::EventKind;
use ovl_remote::FakeTransport;

const TEAM: &str = "http://127.0.0.1:19999";

#[tokio::test]
async fn simple_session_produces_the_canonical_event_sequence() {
    let transport = FakeTransport::new();
    let mut h = harness(
        transport.clone(),
        manual_send(),
        &[TeamFixture {
            url: TEAM,
            user_id: "u1",
            repos: &["repo"],
        }],
    );

    let cwd = format!("{}/w/repo", h.home_dir.path().display());
    let path = h.append(
        "S1.jsonl",
        &[
            session_start_record(&cwd, "S1"),
            user_record("fix"),
            edit_record(&format!("{cwd}/a.ts"), "x", "y"),
            result_record(0.01),
        ],
    );

    h.tracer.process_path(&path).await;
    h.drain().await;

    let calls = transport.calls();
    assert_eq!(calls.len(), 1, "one batch for one team");
    let events = &calls[0].events;
    assert_eq!(events.len(), 4);

    match &events[0].kind {
        EventKind::SessionStart { cwd: c, .. } => assert_eq!(c, &cwd),
        other => panic!("expected SessionStart, got {other:?}"),
    }
    match &events[1].kind {
        EventKind::Prompt {
            prompt_text,
            turn_number,
        } => {
            assert_eq!(prompt_text, "fix");
            assert_eq!(*turn_number, 1);
        }
        other => panic!("expected Prompt, got {other:?}"),
    }
    match &events[2].kind {
        EventKind::FileOp {
            tool_name,
            file_path,
            operation,
            ..
        } => {
            assert_eq!(tool_name, "Edit");
            assert_eq!(file_path, "a.ts");
            assert_eq!(*operation, ovl_core::FileOperation::Modify);
        }
        other => panic!("expected FileOp, got {other:?}"),
    }
    match &events[3].kind {
        EventKind::SessionEnd {
            total_cost_usd,
            files_touched,
            ..
        } => {
            assert_eq!(*total_cost_usd, Some(0.01));
            assert_eq!(files_touched, &vec![format!("{cwd}/a.ts")]);
        }
        other => panic!("expected SessionEnd, got {other:?}"),
    }

    for event in events {
        assert_eq!(event.session_id, "S1");
        assert_eq!(event.repo_name.as_deref(), Some("repo"));
        assert_eq!(event.user_id.as_deref(), Some("u1"));
        assert_eq!(event.agent_type, "claude");
    }
}
