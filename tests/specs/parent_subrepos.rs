// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: the session cwd is a parent directory holding two tracked
//! subrepos. File ops route to the owning subrepo with a repo-suffixed
//! session id; file ops outside every registered subdir are dropped.

use crate::prelude::*;
use ovl_core::EventKind;
use ovl_remote::FakeTransport;
use ovl_storage::{GitRemote, MatchCache};

const TEAM_A: &str = "http://127.0.0.1:19901";
const TEAM_B: &str = "http://127.0.0.1:19902";

#[tokio::test]
async fn parent_directory_session_splits_by_subrepo() {
    let transport = FakeTransport::new();
    let mut h = harness(
        transport.clone(),
        manual_send(),
        &[
            TeamFixture {
                url: TEAM_A,
                user_id: "u1",
                repos: &["a"],
            },
            TeamFixture {
                url: TEAM_B,
                user_id: "u1",
                repos: &["a", "b"],
            },
        ],
    );

    // A real parent directory with subdirs a/, b/, c/ (c untracked)
    let mono = h.home_dir.path().join("w/mono");
    for sub in ["a", "b", "c"] {
        std::fs::create_dir_all(mono.join(sub)).unwrap();
    }
    let cwd = mono.to_string_lossy().into_owned();

    // Seed negative git entries so matching never shells out
    let home = h.home();
    let mut cache = MatchCache::load(&home.cache_path());
    for p in [cwd.clone(), format!("{cwd}/c")] {
        cache.git_remotes.insert(p, GitRemote::none());
    }
    cache.save(&home.cache_path()).unwrap();

    let path = h.append(
        "S.jsonl",
        &[
            session_start_record(&cwd, "S"),
            edit_record(&format!("{cwd}/a/x.ts"), "old", "new"),
            edit_record(&format!("{cwd}/c/y.ts"), "old", "new"),
        ],
    );

    h.tracer.process_path(&path).await;
    h.drain().await;

    let mut by_team: std::collections::BTreeMap<String, Vec<ovl_core::Event>> = Default::default();
    for call in transport.calls() {
        by_team.entry(call.team_url).or_default().extend(call.events);
    }

    // Session events go to both teams (they each own a subrepo)
    for team in [TEAM_A, TEAM_B] {
        let events = &by_team[team];
        assert!(
            matches!(events[0].kind, EventKind::SessionStart { .. }),
            "team {team} missing SessionStart"
        );
    }

    // The a/x.ts edit reaches both teams, relabeled for repo `a`
    for team in [TEAM_A, TEAM_B] {
        let file_ops: Vec<_> = by_team[team]
            .iter()
            .filter(|e| e.is_file_op())
            .collect();
        assert_eq!(file_ops.len(), 1, "team {team} should see exactly one file op");
        assert_eq!(file_ops[0].file_path(), Some("x.ts"));
        assert_eq!(file_ops[0].repo_name.as_deref(), Some("a"));
        assert_eq!(file_ops[0].session_id, "S:a");
    }

    // The c/y.ts edit (unregistered subdir) was dropped everywhere
    let all_paths: Vec<_> = by_team
        .values()
        .flatten()
        .filter_map(|e| e.file_path())
        .collect();
    assert!(!all_paths.iter().any(|p| p.contains("y.ts")));
}
