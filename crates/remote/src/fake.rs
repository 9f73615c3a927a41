// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted ingest transport for sender tests.

use crate::client::{ApiError, IngestReport, IngestTransport};
use async_trait::async_trait;
use ovl_core::Event;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// One recorded ingest call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub team_url: String,
    pub token: String,
    pub events: Vec<Event>,
}

#[derive(Default)]
struct FakeState {
    /// Scripted outcomes, consumed in order. Empty = acknowledge everything.
    responses: VecDeque<Result<IngestReport, ApiError>>,
    calls: Vec<RecordedCall>,
}

/// In-memory transport that records calls and replays scripted outcomes.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome for the next ingest call.
    pub fn enqueue(&self, response: Result<IngestReport, ApiError>) {
        self.state.lock().responses.push_back(response);
    }

    /// Queue `n` consecutive HTTP-status failures.
    pub fn enqueue_failures(&self, n: usize, status: u16) {
        for _ in 0..n {
            self.enqueue(Err(ApiError::Status(status)));
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }
}

#[async_trait]
impl IngestTransport for FakeTransport {
    async fn ingest(
        &self,
        base_url: &str,
        token: &str,
        events: &[Event],
    ) -> Result<IngestReport, ApiError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            team_url: base_url.to_string(),
            token: token.to_string(),
            events: events.to_vec(),
        });
        state.responses.pop_front().unwrap_or_else(|| {
            Ok(IngestReport {
                processed: events.len() as u64,
                ..Default::default()
            })
        })
    }
}
