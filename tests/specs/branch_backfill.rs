// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: the branch only appears on the second record, so a second
//! SessionStart backfills it, exactly once.

use crate::prelude::*;
use ovl_core::EventKind;
use ovl_remote::FakeTransport;

const TEAM: &str = "http://127.0.0.1:19999";

#[tokio::test]
async fn branch_discovered_later_is_backfilled_once() {
    let transport = FakeTransport::new();
    let mut h = harness(
        transport.clone(),
        manual_send(),
        &[TeamFixture {
            url: TEAM,
            user_id: "u1",
            repos: &["r"],
        }],
    );

    let cwd = format!("{}/w/r", h.home_dir.path().display());
    let path = h.append(
        "S1.jsonl",
        &[
            session_start_record(&cwd, "S1"),
            format!(
                r#"{{"type":"system","cwd":"{cwd}","gitBranch":"main","timestamp":"2026-01-30T08:00:01Z"}}"#
            ),
            user_record("go"),
        ],
    );

    h.tracer.process_path(&path).await;
    h.drain().await;

    let events: Vec<_> = transport
        .calls()
        .into_iter()
        .flat_map(|c| c.events)
        .collect();
    assert_eq!(events.len(), 3);

    match &events[0].kind {
        EventKind::SessionStart { git_branch, .. } => assert!(git_branch.is_none()),
        other => panic!("expected SessionStart, got {other:?}"),
    }
    match &events[1].kind {
        EventKind::SessionStart { git_branch, .. } => {
            assert_eq!(git_branch.as_deref(), Some("main"));
        }
        other => panic!("expected backfill SessionStart, got {other:?}"),
    }
    // The third record yields only a Prompt, no further SessionStarts
    match &events[2].kind {
        EventKind::Prompt { turn_number, .. } => assert_eq!(*turn_number, 1),
        other => panic!("expected Prompt, got {other:?}"),
    }
}
