// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, duplicate handling, shutdown.

use fs2::FileExt;
use ovl_adapters::ClaudeAdapter;
use ovl_core::{paths, Config, OverlapHome};
use ovl_engine::Tracer;
use ovl_remote::{ApiClient, Poller, Sender, SenderNotice, SenderParams};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not determine home directory")]
    NoHomeDir(#[from] ovl_core::PathsError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ovl_core::ConfigError),
    #[error("another tracer is already running")]
    LockFailed(std::io::Error),
}

/// Filesystem layout the daemon operates in.
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    pub home: OverlapHome,
    pub log_path: PathBuf,
    pub error_log_path: PathBuf,
    pub pid_path: PathBuf,
    pub reload_flag_path: PathBuf,
}

impl DaemonPaths {
    pub fn resolve() -> Result<Self, LifecycleError> {
        let home = OverlapHome::resolve()?;
        Ok(Self {
            log_path: home.log_path(),
            error_log_path: home.error_log_path(),
            pid_path: home.pid_path(),
            reload_flag_path: home.reload_flag_path(),
            home,
        })
    }
}

/// Everything the main loop owns after startup.
pub struct DaemonState {
    pub paths: DaemonPaths,
    pub config: Config,
    pub tracer: Tracer<ApiClient>,
    pub poller: Poller,
    pub notices: mpsc::UnboundedReceiver<SenderNotice>,
    // NOTE(lifetime): held to maintain the exclusive PID-file lock
    #[allow(dead_code)]
    lock_file: File,
}

impl std::fmt::Debug for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonState")
            .field("paths", &self.paths)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Bring the daemon up: kill stray duplicates, take the PID lock, load
/// config and state, and build the tracer.
pub fn startup(paths: &DaemonPaths) -> Result<DaemonState, LifecycleError> {
    paths.home.ensure_dirs()?;

    // Host supervisors (launchd, systemd) occasionally double-start us.
    // The pidfile lock below is authoritative where flock works; the
    // command-line sweep catches stale daemons from older installs.
    terminate_duplicate_tracers();

    let lock_file = acquire_pid_lock(paths)?;

    let config = Config::load(&paths.home.config_path())?;
    if config.teams.is_empty() {
        warn!("no teams configured; tracing locally but sending nowhere");
    }

    let client = ApiClient::new();
    let (sender, notices) = Sender::new(client.clone(), SenderParams::from_tracer(&config.tracer()));
    let tracer = Tracer::new(
        Arc::new(ClaudeAdapter::new()),
        config.clone(),
        paths.home.clone(),
        sender,
        client.clone(),
    );
    let poller = Poller::new(client, paths.home.mirror_path());

    info!(pid = std::process::id(), "daemon startup complete");
    Ok(DaemonState {
        paths: paths.clone(),
        config,
        tracer,
        poller,
        notices,
        lock_file,
    })
}

/// Take an exclusive lock on the PID file and write our PID into it.
fn acquire_pid_lock(paths: &DaemonPaths) -> Result<File, LifecycleError> {
    let lock_file = File::options()
        .create(true)
        .read(true)
        .write(true)
        .open(&paths.pid_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    paths::write_pid(&paths.pid_path)?;
    Ok(lock_file)
}

/// Remove the PID file if it still names this process.
pub fn release_pid(paths: &DaemonPaths) {
    paths::remove_pid_if_owned(&paths.pid_path);
}

/// Best-effort sweep for other tracer processes, matched by command line.
///
/// Advisory-lock platforms are protected by the pidfile lock regardless;
/// this only clears daemons that predate the lock (or survived a crashed
/// supervisor) so they cannot double-send events.
#[cfg(target_os = "linux")]
fn terminate_duplicate_tracers() {
    let own_pid = std::process::id();
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return;
    };
    for entry in entries.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|n| n.parse::<u32>().ok())
        else {
            continue;
        };
        if pid == own_pid {
            continue;
        }
        let Ok(cmdline) = std::fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        let argv0 = cmdline.split(|b| *b == 0).next().unwrap_or_default();
        let name = String::from_utf8_lossy(argv0);
        if name.ends_with("ovld") {
            warn!(pid, "terminating duplicate tracer process");
            let _ = std::process::Command::new("kill")
                .arg(pid.to_string())
                .status();
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn terminate_duplicate_tracers() {}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
