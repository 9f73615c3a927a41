// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: one team rejects our token. Its sender suspends and later
//! adds become no-ops; the other team keeps receiving events.

use crate::prelude::*;
use ovl_remote::{ApiClient, SenderParams};
use std::time::Duration;
use wiremock::matchers::{method, path as url_path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn rejected_team_suspends_while_others_continue() {
    let bad = MockServer::start().await;
    Mock::given(method("POST"))
        .and(url_path("/api/v1/ingest"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&bad)
        .await;

    let good = MockServer::start().await;
    Mock::given(method("POST"))
        .and(url_path("/api/v1/ingest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"processed": 4, "errors": []}
        })))
        .mount(&good)
        .await;

    let params = SenderParams {
        batch_interval: Duration::from_millis(25),
        ..manual_send()
    };
    let mut h = harness(
        ApiClient::new(),
        params,
        &[
            TeamFixture {
                url: &bad.uri(),
                user_id: "u1",
                repos: &["repo"],
            },
            TeamFixture {
                url: &good.uri(),
                user_id: "u1",
                repos: &["repo"],
            },
        ],
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

    assert!(h.sender.is_suspended(&bad.uri()));
    assert_eq!(h.sender.pending_count(&bad.uri()), 0);

    // The good team received the full batch
    let good_requests = good.received_requests().await.unwrap();
    assert_eq!(good_requests.len(), 1);
    let body: serde_json::Value = good_requests[0].body_json().unwrap();
    assert_eq!(body["events"].as_array().unwrap().len(), 4);

    // Later events for the suspended team are dropped silently
    h.append("S1.jsonl", &[user_record("more work")]);
    h.tracer.process_path(&path).await;
    h.drain().await;

    let bad_requests = bad.received_requests().await.unwrap();
    assert_eq!(bad_requests.len(), 1, "no further sends after suspension");
    assert_eq!(good.received_requests().await.unwrap().len(), 2);
}
