// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: every team is unreachable, but the daemon's mirror knows a
//! teammate holds src/a.ts lines 40-60. An edit resolving to lines 50-55
//! is blocked with a line-tier overlap.

use ovl_core::{
    ActiveRegion, Config, OverlapHome, ProbeDecision, TeamConfig, TeamStateMirror,
    TeamStateSession, Tier,
};
use ovl_engine::{run_probe, ProbeRequest};
use ovl_remote::ApiClient;
use std::io::Write;
use tempfile::tempdir;

fn config(user_id: &str) -> Config {
    Config {
        teams: vec![TeamConfig {
            name: "t".into(),
            instance_url: "http://127.0.0.1:19999".into(),
            user_token: "tok".into(),
            user_id: user_id.into(),
        }],
        tracer: None,
    }
}

fn teammate_mirror() -> TeamStateMirror {
    TeamStateMirror::new(vec![TeamStateSession {
        session_id: "s-teammate".into(),
        user_id: "u-teammate".into(),
        display_name: Some("Ada".into()),
        repo_name: "r".into(),
        started_at: None,
        summary: None,
        regions: vec![ActiveRegion {
            file_path: "src/a.ts".into(),
            start_line: Some(40),
            end_line: Some(60),
            function_name: None,
            last_touched_at: None,
        }],
        instance_url: None,
    }])
}

/// Lay out a working tree whose src/a.ts has a unique marker at 50-55.
fn write_tree(root: &std::path::Path) -> String {
    let src = root.join("src");
    std::fs::create_dir_all(&src).unwrap();
    let mut content = String::new();
    for n in 1..=100 {
        if (50..=55).contains(&n) {
            content.push_str(&format!("  marker {n}\n"));
        } else {
            content.push_str(&format!("line {n}\n"));
        }
    }
    let mut f = std::fs::File::create(src.join("a.ts")).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    (50..=55)
        .map(|n| format!("  marker {n}\n"))
        .collect::<String>()
        .trim_end_matches('\n')
        .to_string()
}

#[tokio::test]
async fn line_overlap_blocks_via_local_mirror() {
    let work = tempdir().unwrap();
    let overlap_home = tempdir().unwrap();
    let home = OverlapHome::at(overlap_home.path().to_path_buf());
    let old_string = write_tree(work.path());

    ovl_storage::write_mirror(&home.mirror_path(), &teammate_mirror()).unwrap();

    let outcome = run_probe(
        &config("me"),
        &home,
        &ApiClient::new(),
        ProbeRequest {
            cwd: work.path().to_path_buf(),
            file_path: "src/a.ts".into(),
            old_string: Some(old_string),
            repo_override: Some("r".into()),
            session_id: None,
        },
    )
    .await;

    assert_eq!(outcome.decision, ProbeDecision::Block);
    assert_eq!(outcome.overlaps.len(), 1);
    assert_eq!(outcome.overlaps[0].tier, Tier::Line);
    assert_eq!(outcome.overlaps[0].user_id, "u-teammate");
    assert!(outcome.warning.is_some(), "mirror fallback is flagged");
}

#[tokio::test]
async fn own_session_in_mirror_never_blocks() {
    let work = tempdir().unwrap();
    let overlap_home = tempdir().unwrap();
    let home = OverlapHome::at(overlap_home.path().to_path_buf());
    let old_string = write_tree(work.path());

    ovl_storage::write_mirror(&home.mirror_path(), &teammate_mirror()).unwrap();

    // The teammate session belongs to the caller's own user id
    let outcome = run_probe(
        &config("u-teammate"),
        &home,
        &ApiClient::new(),
        ProbeRequest {
            cwd: work.path().to_path_buf(),
            file_path: "src/a.ts".into(),
            old_string: Some(old_string),
            repo_override: Some("r".into()),
            session_id: None,
        },
    )
    .await;

    assert_eq!(outcome.decision, ProbeDecision::Proceed);
    assert!(outcome.overlaps.is_empty());
}
