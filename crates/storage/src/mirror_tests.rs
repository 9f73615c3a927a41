// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ovl_core::TeamStateSession;
use tempfile::tempdir;

fn session(id: &str) -> TeamStateSession {
    TeamStateSession {
        session_id: id.into(),
        user_id: "u1".into(),
        display_name: Some("Ada".into()),
        repo_name: "repo".into(),
        started_at: None,
        summary: None,
        regions: vec![],
        instance_url: Some("https://team.example".into()),
    }
}

#[test]
fn write_read_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("team-state.json");

    let mirror = TeamStateMirror::new(vec![session("s1"), session("s2")]);
    write_mirror(&path, &mirror).unwrap();

    let loaded = read_mirror(&path).unwrap();
    assert_eq!(loaded, mirror);
}

#[test]
fn missing_mirror_is_none() {
    let dir = tempdir().unwrap();
    assert!(read_mirror(&dir.path().join("team-state.json")).is_none());
}

#[test]
fn garbage_mirror_is_none_after_retry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("team-state.json");
    std::fs::write(&path, "{truncated").unwrap();
    assert!(read_mirror(&path).is_none());
}
