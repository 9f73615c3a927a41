// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: ingest returns 500 twice, then 200. The batch stays queued,
//! retries with backoff, and the durable offset only advances after the
//! sender has nothing pending for the journal.

use crate::prelude::*;
use ovl_remote::{ApiClient, SenderParams};
use std::time::Duration;
use wiremock::matchers::{method, path as url_path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn ingest_retries_until_success_then_commits_offset() {
    let server = MockServer::start().await;
    // First two attempts fail, everything after succeeds
    Mock::given(method("POST"))
        .and(url_path("/api/v1/ingest"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(url_path("/api/v1/ingest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"processed": 4, "errors": []}
        })))
        .mount(&server)
        .await;

    // Short real-time backoff so the retries land inside the test budget
    let params = SenderParams {
        batch_interval: Duration::from_millis(25),
        max_batch_size: 100,
        max_queue_size: 500,
        max_retries: 5,
        max_retry_delay: Duration::from_secs(60),
    };
    let mut h = harness(
        ApiClient::new(),
        params,
        &[TeamFixture {
            url: &server.uri(),
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
    let key = path.to_string_lossy().into_owned();
    let journal_len = std::fs::metadata(&path).unwrap().len();

    h.tracer.process_path(&path).await;

    // While the batch is failing, the durable offset must not move
    h.tracer.commit_offsets();
    let state = ovl_storage::TracerState::load(&h.home().state_path());
    assert_eq!(state.get(&key).unwrap().byte_offset, 0);

    // Backoff schedule: 25 ms batch timer, then 50 ms and 100 ms retries
    for _ in 0..100 {
        if h.sender.pending_count(&server.uri()) == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(h.sender.pending_count(&server.uri()), 0);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);

    // Now the flush cadence can commit the read head durably
    h.tracer.commit_offsets();
    let state = ovl_storage::TracerState::load(&h.home().state_path());
    assert_eq!(state.get(&key).unwrap().byte_offset, journal_len);
}
