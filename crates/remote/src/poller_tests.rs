// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn team_state_body(session_id: &str, with_instance: Option<&str>) -> serde_json::Value {
    let mut session = serde_json::json!({
        "session_id": session_id,
        "user_id": "u9",
        "repo_name": "repo",
        "regions": [{"file_path": "src/a.ts", "start_line": 1, "end_line": 5}]
    });
    if let Some(url) = with_instance {
        session["instance_url"] = url.into();
    }
    serde_json::json!({"data": {"sessions": [session]}})
}

async fn mock_team(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/team-state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn merges_teams_and_tags_instance_url() {
    let a = mock_team(team_state_body("s-a", None)).await;
    let b = mock_team(team_state_body("s-b", Some("https://already.example"))).await;
    let dir = tempdir().unwrap();
    let mirror_path = dir.path().join("team-state.json");

    let poller = Poller::new(ApiClient::new(), mirror_path.clone());
    let outcome = poller
        .poll_once(&[
            (a.uri(), "tok-a".to_string()),
            (b.uri(), "tok-b".to_string()),
        ])
        .await;

    assert!(outcome.mirror_written);
    assert!(outcome.auth_failures.is_empty());

    let mirror = ovl_storage::read_mirror(&mirror_path).unwrap();
    assert_eq!(mirror.sessions.len(), 2);
    let by_id = |id: &str| {
        mirror
            .sessions
            .iter()
            .find(|s| s.session_id == id)
            .unwrap()
            .clone()
    };
    // Untagged sessions get their origin; tagged ones keep it
    assert_eq!(by_id("s-a").instance_url.as_deref(), Some(a.uri().as_str()));
    assert_eq!(
        by_id("s-b").instance_url.as_deref(),
        Some("https://already.example")
    );
}

#[tokio::test]
async fn auth_failure_is_reported_but_others_still_mirror() {
    let good = mock_team(team_state_body("s-good", None)).await;
    let bad = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/team-state"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&bad)
        .await;

    let dir = tempdir().unwrap();
    let mirror_path = dir.path().join("team-state.json");
    let poller = Poller::new(ApiClient::new(), mirror_path.clone());

    let outcome = poller
        .poll_once(&[
            (good.uri(), "tok".to_string()),
            (bad.uri(), "tok".to_string()),
        ])
        .await;

    assert_eq!(outcome.auth_failures, vec![bad.uri()]);
    let mirror = ovl_storage::read_mirror(&mirror_path).unwrap();
    assert_eq!(mirror.sessions.len(), 1);
    assert_eq!(mirror.sessions[0].session_id, "s-good");
}

#[tokio::test]
async fn transport_error_leaves_existing_mirror_untouched() {
    let dir = tempdir().unwrap();
    let mirror_path = dir.path().join("team-state.json");

    // Seed a mirror, then poll a dead endpoint
    let seeded = ovl_core::TeamStateMirror::new(vec![]);
    ovl_storage::write_mirror(&mirror_path, &seeded).unwrap();

    let poller = Poller::new(ApiClient::new(), mirror_path.clone());
    let outcome = poller
        .poll_once(&[("http://127.0.0.1:1".to_string(), "tok".to_string())])
        .await;

    assert!(!outcome.mirror_written);
    let mirror = ovl_storage::read_mirror(&mirror_path).unwrap();
    assert_eq!(mirror.updated_at, seeded.updated_at);
}

#[tokio::test]
async fn no_teams_is_a_noop() {
    let dir = tempdir().unwrap();
    let mirror_path = dir.path().join("team-state.json");
    let poller = Poller::new(ApiClient::new(), mirror_path.clone());
    let outcome = poller.poll_once(&[]).await;
    assert!(!outcome.mirror_written);
    assert!(!mirror_path.exists());
}
