// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario specs.

use ovl_adapters::{AgentAdapter, ClaudeAdapter};
use ovl_core::{Config, Event, OverlapHome, SessionAccumulator, TeamConfig};
use ovl_engine::Tracer;
use ovl_remote::client::IngestTransport;
use ovl_remote::{ApiClient, Sender, SenderParams};
use ovl_storage::MatchCache;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Claude journal parsing with journals rooted in a test directory.
pub struct TestAdapter {
    pub root: PathBuf,
    pub inner: ClaudeAdapter,
}

impl AgentAdapter for TestAdapter {
    fn agent_type(&self) -> &'static str {
        self.inner.agent_type()
    }
    fn watch_dir(&self) -> PathBuf {
        self.root.clone()
    }
    fn file_extension(&self) -> &'static str {
        self.inner.file_extension()
    }
    fn extract_session_id(&self, path: &Path) -> String {
        self.inner.extract_session_id(path)
    }
    fn parse_line(
        &self,
        record: &str,
        session_id: &str,
        acc: &mut SessionAccumulator,
    ) -> Vec<Event> {
        self.inner.parse_line(record, session_id, acc)
    }
}

/// One team definition for a fixture: URL plus its roster.
pub struct TeamFixture<'a> {
    pub url: &'a str,
    pub user_id: &'a str,
    pub repos: &'a [&'a str],
}

pub struct Harness<T: IngestTransport> {
    pub home_dir: TempDir,
    pub journal_dir: TempDir,
    pub tracer: Tracer<T>,
    pub sender: Sender<T>,
}

impl<T: IngestTransport> Harness<T> {
    pub fn home(&self) -> OverlapHome {
        OverlapHome::at(self.home_dir.path().to_path_buf())
    }

    pub fn journal_path(&self, name: &str) -> PathBuf {
        self.journal_dir.path().join(name)
    }

    pub fn append(&self, name: &str, lines: &[String]) -> PathBuf {
        let path = self.journal_path(name);
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        path
    }

    pub async fn drain(&self) {
        self.sender.flush_all(Duration::from_secs(10)).await;
    }
}

/// Build a tracer harness over a scripted or real transport.
///
/// Rosters are pre-seeded into the cache file so matching needs no HTTP;
/// the sender never auto-flushes unless `params` says otherwise.
pub fn harness<T: IngestTransport + Clone>(
    transport: T,
    params: SenderParams,
    teams: &[TeamFixture<'_>],
) -> Harness<T> {
    let home_dir = TempDir::new().unwrap();
    let journal_dir = TempDir::new().unwrap();
    let home = OverlapHome::at(home_dir.path().to_path_buf());

    let mut cache = MatchCache::default();
    for team in teams {
        cache.set_roster(
            team.url.to_string(),
            team.repos.iter().map(|r| r.to_string()).collect(),
        );
    }
    cache.save(&home.cache_path()).unwrap();

    let config = Config {
        teams: teams
            .iter()
            .map(|t| TeamConfig {
                name: t.url.to_string(),
                instance_url: t.url.trim_end_matches('/').to_string(),
                user_token: format!("tok-{}", t.user_id),
                user_id: t.user_id.to_string(),
            })
            .collect(),
        tracer: None,
    };

    let (sender, _notices) = Sender::new(transport, params);
    let adapter = Arc::new(TestAdapter {
        root: journal_dir.path().to_path_buf(),
        inner: ClaudeAdapter::new(),
    });
    let tracer = Tracer::new(
        adapter,
        config,
        home,
        sender.clone(),
        ApiClient::new(),
    );

    Harness {
        home_dir,
        journal_dir,
        tracer,
        sender,
    }
}

/// Sender tuning that only flushes when the test asks.
pub fn manual_send() -> SenderParams {
    SenderParams {
        batch_interval: Duration::from_secs(3600),
        max_batch_size: 100,
        max_queue_size: 500,
        max_retries: 5,
        max_retry_delay: Duration::from_secs(60),
    }
}

pub fn session_start_record(cwd: &str, session: &str) -> String {
    format!(
        r#"{{"type":"system","cwd":"{cwd}","sessionId":"{session}","timestamp":"2026-01-30T08:00:00Z"}}"#
    )
}

pub fn user_record(text: &str) -> String {
    format!(
        r#"{{"type":"user","message":{{"content":"{text}"}},"timestamp":"2026-01-30T08:00:01Z"}}"#
    )
}

pub fn edit_record(file_path: &str, old: &str, new: &str) -> String {
    format!(
        r#"{{"type":"assistant","message":{{"content":[{{"type":"tool_use","name":"Edit","input":{{"file_path":"{file_path}","old_string":"{old}","new_string":"{new}"}}}}]}},"timestamp":"2026-01-30T08:00:02Z"}}"#
    )
}

pub fn result_record(cost: f64) -> String {
    format!(r#"{{"type":"result","total_cost_usd":{cost},"timestamp":"2026-01-30T08:00:03Z"}}"#)
}
