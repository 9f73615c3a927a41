// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tracer supervisor: journal files in, acknowledged events out.
//!
//! Owns the tracked-file table, the match cache, and the sender. The
//! daemon feeds it filesystem events and timer ticks; everything here runs
//! on that single serial loop, so no internal locking is needed.
//!
//! Durability: a `read_head` (in memory) tracks how far each journal has
//! been parsed; the persisted `byte_offset` only advances once the sender
//! holds nothing derived from that file, so a crash re-reads exactly the
//! unacknowledged tail and the server deduplicates.

use crate::matcher::{match_repo, Rosters};
use crate::router::route_events;
use ovl_adapters::{read_records, symbols, AgentAdapter};
use ovl_core::event::sentinel_for_tool;
use ovl_core::{Config, Event, EventKind, OverlapHome, SessionAccumulator, TrackedFile};
use ovl_remote::client::IngestTransport;
use ovl_remote::{ApiClient, ApiError, Sender, SenderNotice, TeamAuth};
use ovl_storage::{MatchCache, TracerState};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the shutdown drain may take.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Starting,
    Running,
    Draining,
    Stopped,
}

pub struct Tracer<T: IngestTransport> {
    adapter: Arc<dyn AgentAdapter>,
    config: Config,
    home: OverlapHome,
    state: TracerState,
    cache: MatchCache,
    sender: Sender<T>,
    client: ApiClient,
    /// Parse progress per journal path, ahead of the durable offset.
    read_heads: HashMap<String, u64>,
    accumulators: HashMap<String, SessionAccumulator>,
    /// Teams whose token was rejected; skipped until reload.
    suspended: BTreeSet<String>,
    phase: Phase,
}

impl<T: IngestTransport> Tracer<T> {
    pub fn new(
        adapter: Arc<dyn AgentAdapter>,
        config: Config,
        home: OverlapHome,
        sender: Sender<T>,
        client: ApiClient,
    ) -> Self {
        let state = TracerState::load(&home.state_path());
        let cache = MatchCache::load(&home.cache_path());
        info!(
            tracked_files = state.tracked_files.len(),
            teams = config.teams.len(),
            "tracer state loaded"
        );
        Self {
            adapter,
            config,
            home,
            state,
            cache,
            sender,
            client,
            read_heads: HashMap::new(),
            accumulators: HashMap::new(),
            suspended: BTreeSet::new(),
            phase: Phase::Starting,
        }
    }

    pub fn watch_dir(&self) -> PathBuf {
        self.adapter.watch_dir()
    }

    pub fn file_extension(&self) -> &str {
        self.adapter.file_extension()
    }

    /// Load rosters and process every existing journal file.
    pub async fn start(&mut self) {
        self.refresh_rosters().await;
        self.scan_journal_root().await;
        self.phase = Phase::Running;
        info!(watch_dir = %self.watch_dir().display(), "tracer running");
    }

    /// Walk the journal root and process each file with our extension.
    pub async fn scan_journal_root(&mut self) {
        let root = self.watch_dir();
        for path in collect_journals(&root, self.file_extension()) {
            self.process_path(&path).await;
        }
    }

    /// Process new bytes of one journal file (from a scan or a watch event).
    pub async fn process_path(&mut self, path: &Path) {
        if self.phase == Phase::Draining || self.phase == Phase::Stopped {
            return;
        }
        if !path
            .extension()
            .is_some_and(|ext| ext == self.file_extension())
        {
            return;
        }
        let key = path.to_string_lossy().into_owned();

        // One retry so a truncation reset re-processes from zero immediately
        for _ in 0..2 {
            if self.state.get(&key).is_none() && !self.try_track(path, &key).await {
                return;
            }
            if self.consume(path, &key).await {
                return;
            }
        }
    }

    /// First sight of a journal: find its cwd, match it, create tracking
    /// state. Files with no cwd yet are retried on the next event; files
    /// matching no roster are skipped entirely.
    async fn try_track(&mut self, path: &Path, key: &str) -> bool {
        let read = match read_records(path, 0) {
            Ok(read) => read,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "journal unreadable");
                return false;
            }
        };
        let Some(cwd) = find_cwd(&read.records) else {
            debug!(path = %path.display(), "no cwd in journal yet");
            return false;
        };

        let rosters = self.rosters();
        let matches = match_repo(Path::new(&cwd), &rosters, &mut self.cache).await;
        if matches.is_empty() {
            debug!(path = %path.display(), cwd, "cwd matches no tracked repo, skipping file");
            return false;
        }

        let mut matched_teams: Vec<String> = Vec::new();
        for m in &matches {
            if !matched_teams.contains(&m.team_url) {
                matched_teams.push(m.team_url.clone());
            }
        }
        let sub_dir_repos: BTreeMap<String, String> = matches
            .iter()
            .filter_map(|m| m.subdir.clone().map(|s| (s, m.repo_name.clone())))
            .collect();

        let tracked = TrackedFile {
            byte_offset: 0,
            session_id: self.adapter.extract_session_id(path),
            matched_teams,
            matched_repo: matches[0].repo_name.clone(),
            sub_dir_repos: (!sub_dir_repos.is_empty()).then_some(sub_dir_repos),
            turn_number: 0,
            files_touched: BTreeSet::new(),
            cwd,
        };
        info!(
            path = %path.display(),
            repo = %tracked.matched_repo,
            teams = tracked.matched_teams.len(),
            parent_session = tracked.is_parent_session(),
            "tracking journal"
        );
        self.read_heads.insert(key.to_string(), 0);
        self.accumulators
            .insert(key.to_string(), SessionAccumulator::new());
        self.state.insert(key.to_string(), tracked);
        true
    }

    /// Parse and route everything past the read head. Returns false when a
    /// truncation reset requires re-processing from zero.
    async fn consume(&mut self, path: &Path, key: &str) -> bool {
        let Some(tracked) = self.state.get(key).cloned() else {
            return true;
        };
        let offset = self
            .read_heads
            .get(key)
            .copied()
            .unwrap_or(tracked.byte_offset);

        let read = match read_records(path, offset) {
            Ok(read) => read,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "journal read failed");
                return true;
            }
        };
        if read.truncated {
            warn!(path = %path.display(), offset, "journal shrank; resetting state for path");
            self.state.reset(key);
            self.read_heads.remove(key);
            self.accumulators.remove(key);
            return false;
        }
        if read.records.is_empty() {
            return true;
        }

        let mut acc = self
            .accumulators
            .remove(key)
            .unwrap_or_else(|| tracked.accumulator());

        let mut events: Vec<Event> = Vec::new();
        for record in &read.records {
            events.extend(
                self.adapter
                    .parse_line(record, &tracked.session_id, &mut acc),
            );
        }
        for event in &mut events {
            enrich_file_op(event);
        }

        let rosters = self.rosters();
        let routed = route_events(events, &tracked, &rosters);
        for r in routed {
            let Some(team) = self.config.team(&r.team_url) else {
                continue;
            };
            let auth = TeamAuth {
                token: team.user_token.clone(),
                user_id: team.user_id.clone(),
            };
            self.sender.add(&r.team_url, &auth, r.event, Some(path));
        }

        self.read_heads.insert(key.to_string(), read.new_offset);
        if let Some(tracked) = self.state.get_mut(key) {
            tracked.absorb(&acc);
        }
        self.accumulators.insert(key.to_string(), acc);
        true
    }

    /// Rosters for matching: configured, non-suspended teams only.
    pub fn rosters(&self) -> Rosters {
        self.config
            .teams
            .iter()
            .filter(|t| !self.suspended.contains(&t.instance_url))
            .filter_map(|t| {
                self.cache
                    .roster(&t.instance_url)
                    .map(|r| (t.instance_url.clone(), r.repos.clone()))
            })
            .collect()
    }

    /// Refresh every team's roster; returns true when new repos appeared
    /// (the caller should rescan the journal root to backfill).
    pub async fn refresh_rosters(&mut self) -> bool {
        let mut needs_rescan = false;
        let mut removed: Vec<String> = Vec::new();

        for team in self.config.teams.clone() {
            if self.suspended.contains(&team.instance_url) {
                continue;
            }
            match self
                .client
                .list_repos(&team.instance_url, &team.user_token)
                .await
            {
                Ok(repos) => {
                    let fresh: BTreeSet<String> = repos.into_iter().map(|r| r.name).collect();
                    let diff = self.cache.roster_diff(&team.instance_url, &fresh);
                    if !diff.added.is_empty() {
                        info!(team_url = %team.instance_url, added = diff.added.len(), "roster gained repos");
                        needs_rescan = true;
                    }
                    removed.extend(diff.removed);
                    self.cache.set_roster(team.instance_url.clone(), fresh);
                }
                Err(ApiError::Auth) => {
                    warn!(
                        team_url = %team.instance_url,
                        "token rejected while fetching repos; suspending team. Re-join the team to resume."
                    );
                    self.suspend_team(&team.instance_url);
                }
                Err(e) => {
                    warn!(team_url = %team.instance_url, error = %e, "roster refresh failed; keeping cached roster");
                }
            }
        }

        if !removed.is_empty() {
            let evicted = self.state.evict_repos(&removed);
            for path in &evicted {
                self.read_heads.remove(path);
                self.accumulators.remove(path);
            }
            info!(
                repos = removed.len(),
                files = evicted.len(),
                "evicted tracking state for unregistered repos"
            );
        }
        needs_rescan
    }

    pub fn suspend_team(&mut self, team_url: &str) {
        self.suspended.insert(team_url.to_string());
        self.sender.suspend(team_url);
    }

    /// `(instance_url, token)` pairs for the poller.
    pub fn active_teams(&self) -> Vec<(String, String)> {
        self.config
            .teams
            .iter()
            .filter(|t| !self.suspended.contains(&t.instance_url))
            .map(|t| (t.instance_url.clone(), t.user_token.clone()))
            .collect()
    }

    pub fn handle_notice(&mut self, notice: SenderNotice) {
        match notice {
            SenderNotice::Sent {
                team_url,
                processed,
            } => {
                debug!(team_url, processed, "batch acknowledged");
            }
            SenderNotice::AuthFailure { team_url } => {
                self.suspended.insert(team_url);
            }
        }
    }

    /// Advance durable offsets for fully-acknowledged paths and save.
    ///
    /// Runs on the state-flush cadence. A path's offset moves only when
    /// the sender holds nothing derived from it.
    pub fn commit_offsets(&mut self) {
        let heads: Vec<(String, u64)> = self
            .read_heads
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        for (key, head) in heads {
            let Some(tracked) = self.state.get(&key) else {
                continue;
            };
            if head > tracked.byte_offset && !self.sender.has_pending_for(Path::new(&key)) {
                self.state.advance_offset(&key, head);
            }
        }
        self.save();
    }

    fn save(&self) {
        if let Err(e) = self.state.save(&self.home.state_path()) {
            warn!(error = %e, "failed to save tracer state");
        }
        if let Err(e) = self.cache.save(&self.home.cache_path()) {
            warn!(error = %e, "failed to save match cache");
        }
    }

    /// Swap in a fresh config and sender after a reload, then refresh
    /// rosters so newly joined teams start matching immediately instead
    /// of waiting out the next roster cycle.
    ///
    /// Pending queues in the old sender are discarded (the user just
    /// reconfigured; unacknowledged bytes re-read on the next pass) and
    /// suspensions are lifted so replaced tokens get a fresh chance.
    pub async fn reload(&mut self, config: Config, sender: Sender<T>) {
        self.sender.shutdown();
        self.sender = sender;
        self.config = config;
        self.suspended.clear();
        if self.refresh_rosters().await {
            self.scan_journal_root().await;
        }
        info!(teams = self.config.teams.len(), "tracer reloaded");
    }

    /// Drain and persist. Idempotent; later calls are no-ops.
    pub async fn shutdown(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        self.phase = Phase::Draining;
        self.sender.flush_all(DRAIN_TIMEOUT).await;

        // Best effort: anything the drain could not deliver has been
        // logged; committing the read heads avoids re-sending what was.
        let heads: Vec<(String, u64)> = self
            .read_heads
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        for (key, head) in heads {
            self.state.advance_offset(&key, head);
        }
        self.save();
        self.phase = Phase::Stopped;
        info!("tracer stopped");
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self, key: &str) -> Option<&TrackedFile> {
        self.state.get(key)
    }

    #[cfg(test)]
    pub(crate) fn sender_for_tests(&self) -> &Sender<T> {
        &self.sender
    }

    #[cfg(test)]
    pub(crate) fn durable_offset(&self, key: &str) -> Option<u64> {
        self.state.get(key).map(|t| t.byte_offset)
    }
}

/// Resolve line range and enclosing symbol for edit-bearing file ops.
fn enrich_file_op(event: &mut Event) {
    let EventKind::FileOp {
        tool_name,
        file_path,
        start_line,
        end_line,
        function_name,
        old_string,
        ..
    } = &mut event.kind
    else {
        return;
    };
    if sentinel_for_tool(tool_name).is_some() || start_line.is_some() {
        return;
    }
    let Some(old) = old_string.as_deref() else {
        return;
    };
    if let Some(region) = symbols::resolve_region(Path::new(file_path), old) {
        *start_line = Some(region.start_line);
        *end_line = Some(region.end_line);
        *function_name = region.enclosing_symbol;
    }
}

/// First record that carries a `cwd` field.
fn find_cwd(records: &[String]) -> Option<String> {
    records.iter().find_map(|record| {
        serde_json::from_str::<serde_json::Value>(record)
            .ok()?
            .get("cwd")?
            .as_str()
            .map(String::from)
    })
}

/// Recursive walk for journal files, sorted for determinism.
fn collect_journals(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut journals = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == extension) {
                journals.push(path);
            }
        }
    }
    journals.sort();
    journals
}

#[cfg(test)]
#[path = "tracer_tests.rs"]
mod tests;
