// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed client for the team instance HTTP API.
//!
//! All endpoints use bearer auth and wrap their payload in a `{data: ...}`
//! envelope. Timeouts are per endpoint: interactive calls (verify, overlap
//! query) are tight; background calls (roster, ingest, team state) get 5 s.

use async_trait::async_trait;
use ovl_core::{Event, OverlapHit, ProbeDecision, TeamStateSession};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(3);
pub const ROSTER_TIMEOUT: Duration = Duration::from_secs(5);
pub const INGEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const TEAM_STATE_TIMEOUT: Duration = Duration::from_secs(5);
pub const OVERLAP_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ApiError {
    /// The team rejected our token (HTTP 401).
    #[error("authentication rejected by the team instance")]
    Auth,
    #[error("team instance returned HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// `GET /api/v1/auth/verify` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedUser {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// One repo in `GET /api/v1/repos`.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepoList {
    #[serde(default)]
    repos: Vec<RepoEntry>,
}

/// `POST /api/v1/ingest` result. The server is the source of truth for
/// dedup; `errors` are partial failures that are logged, never retried.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestReport {
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    #[serde(default)]
    pub sessions_created: u64,
    #[serde(default)]
    pub sessions_ended: u64,
    #[serde(default)]
    pub file_ops_created: u64,
    #[serde(default)]
    pub prompts_created: u64,
    #[serde(default)]
    pub agent_responses_created: u64,
}

#[derive(Debug, Deserialize)]
struct TeamState {
    #[serde(default)]
    sessions: Vec<TeamStateSession>,
}

/// `POST /api/v1/overlap-query` request body.
#[derive(Debug, Clone, Serialize)]
pub struct OverlapQueryRequest {
    pub repo_name: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

/// `POST /api/v1/overlap-query` response payload.
#[derive(Debug, Clone, Deserialize)]
pub struct OverlapQueryResponse {
    pub decision: ProbeDecision,
    #[serde(default)]
    pub overlaps: Vec<OverlapHit>,
    #[serde(default)]
    pub guidance: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginLink {
    login_url: String,
}

/// Reusable HTTP client for all team endpoints.
#[derive(Debug, Clone, Default)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn verify(&self, base_url: &str, token: &str) -> Result<VerifiedUser, ApiError> {
        self.get_json(base_url, "/api/v1/auth/verify", token, VERIFY_TIMEOUT)
            .await
    }

    pub async fn list_repos(&self, base_url: &str, token: &str) -> Result<Vec<RepoEntry>, ApiError> {
        let list: RepoList = self
            .get_json(base_url, "/api/v1/repos", token, ROSTER_TIMEOUT)
            .await?;
        Ok(list.repos)
    }

    pub async fn team_state(
        &self,
        base_url: &str,
        token: &str,
    ) -> Result<Vec<TeamStateSession>, ApiError> {
        let state: TeamState = self
            .get_json(base_url, "/api/v1/team-state", token, TEAM_STATE_TIMEOUT)
            .await?;
        Ok(state.sessions)
    }

    pub async fn overlap_query(
        &self,
        base_url: &str,
        token: &str,
        request: &OverlapQueryRequest,
    ) -> Result<OverlapQueryResponse, ApiError> {
        self.post_json(
            base_url,
            "/api/v1/overlap-query",
            token,
            request,
            OVERLAP_QUERY_TIMEOUT,
        )
        .await
    }

    pub async fn login_link(&self, base_url: &str, token: &str) -> Result<String, ApiError> {
        let link: LoginLink = self
            .post_json(
                base_url,
                "/api/v1/auth/login-link",
                token,
                &serde_json::json!({}),
                VERIFY_TIMEOUT,
            )
            .await?;
        Ok(link.login_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .get(format!("{base_url}{path}"))
            .bearer_auth(token)
            .timeout(timeout)
            .send()
            .await?;
        Self::unwrap_envelope(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        token: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .post(format!("{base_url}{path}"))
            .bearer_auth(token)
            .timeout(timeout)
            .json(body)
            .send()
            .await?;
        Self::unwrap_envelope(response).await
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status.as_u16() == 401 {
            return Err(ApiError::Auth);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

/// Seam between the sender and the wire, so delivery behavior is testable
/// without a server.
#[async_trait]
pub trait IngestTransport: Send + Sync + 'static {
    async fn ingest(
        &self,
        base_url: &str,
        token: &str,
        events: &[Event],
    ) -> Result<IngestReport, ApiError>;
}

#[async_trait]
impl IngestTransport for ApiClient {
    async fn ingest(
        &self,
        base_url: &str,
        token: &str,
        events: &[Event],
    ) -> Result<IngestReport, ApiError> {
        self.post_json(
            base_url,
            "/api/v1/ingest",
            token,
            &serde_json::json!({ "events": events }),
            INGEST_TIMEOUT,
        )
        .await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
