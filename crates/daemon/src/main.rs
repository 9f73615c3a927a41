// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overlap tracer daemon (ovld)
//!
//! Background process that tails coding-agent session journals and ships
//! derived activity events to the user's team instances.
//!
//! Architecture:
//! - Watcher task: notify callbacks funneled into an mpsc channel
//! - Supervisor loop: single serial task owning all tracker state

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod lifecycle;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use ovl_core::Config;
use ovl_engine::Tracer;
use ovl_remote::{ApiClient, Sender, SenderNotice, SenderParams};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::lifecycle::{DaemonPaths, LifecycleError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ovld {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ovld {}", env!("CARGO_PKG_VERSION"));
                println!("Overlap tracer daemon - observes coding-agent sessions and");
                println!("forwards activity events to your team instances.");
                println!();
                println!("USAGE:");
                println!("    ovld");
                println!();
                println!("The daemon is typically started by the `ovl` CLI or a platform");
                println!("service and should not need to be invoked directly.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ovld [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let paths = DaemonPaths::resolve()?;
    paths.home.ensure_dirs()?;

    rotate_log_if_needed(&paths.log_path);
    write_startup_marker(&paths)?;
    let log_guard = setup_logging(&paths)?;

    info!("starting tracer daemon");

    let mut state = match lifecycle::startup(&paths) {
        Ok(state) => state,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&paths.pid_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("ovld is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&paths, &e);
            error!("failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Watcher callbacks arrive on notify's thread; funnel them into the
    // serial supervisor loop.
    let (fs_tx, mut fs_rx) = mpsc::channel::<PathBuf>(256);
    let watch_dir = state.tracer.watch_dir();
    let _watcher_guard = match create_dir_watcher(&watch_dir, fs_tx) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!(dir = %watch_dir.display(), error = %e, "directory watch failed; relying on rescans");
            None
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    state.tracer.start().await;
    info!(watch_dir = %watch_dir.display(), "daemon ready");
    println!("READY");

    // The notice receiver lives outside `state` so select! can poll it
    // while handlers borrow the tracer.
    let mut notices = state.notices;

    // NOTE: intervals created outside the loop; select! re-evaluates
    // branches each iteration and would otherwise reset them on activity.
    let mut flush_timer = tokio::time::interval(env::state_flush_interval());
    let mut poll_timer = tokio::time::interval(env::poll_interval());
    let mut reload_timer = tokio::time::interval(env::reload_poll_interval());
    let mut roster_timer = roster_interval(&state.config);

    loop {
        tokio::select! {
            Some(path) = fs_rx.recv() => {
                state.tracer.process_path(&path).await;
            }

            Some(notice) = notices.recv() => {
                state.tracer.handle_notice(notice);
            }

            _ = flush_timer.tick() => {
                state.tracer.commit_offsets();
            }

            _ = roster_timer.tick() => {
                if state.tracer.refresh_rosters().await {
                    state.tracer.scan_journal_root().await;
                }
            }

            _ = poll_timer.tick() => {
                let teams = state.tracer.active_teams();
                let outcome = state.poller.poll_once(&teams).await;
                for team_url in outcome.auth_failures {
                    state.tracer.suspend_team(&team_url);
                }
            }

            _ = reload_timer.tick() => {
                // Windows has no SIGHUP; a flag file is the portable trigger
                if state.paths.reload_flag_path.exists() {
                    let _ = std::fs::remove_file(&state.paths.reload_flag_path);
                    if reload(&state.paths, &mut state.config, &mut state.tracer, &mut notices).await {
                        roster_timer = roster_interval(&state.config);
                    }
                }
            }

            _ = sighup.recv() => {
                info!("received SIGHUP, reloading configuration");
                if reload(&state.paths, &mut state.config, &mut state.tracer, &mut notices).await {
                    roster_timer = roster_interval(&state.config);
                }
            }

            _ = sigterm.recv() => {
                info!("received SIGTERM, draining...");
                break;
            }

            _ = sigint.recv() => {
                info!("received SIGINT, draining...");
                break;
            }
        }
    }

    // Drain with a wall-clock cap; a second signal forces immediate exit.
    tokio::select! {
        _ = state.tracer.shutdown() => {}
        _ = sigterm.recv() => {
            warn!("second termination signal, exiting without drain");
            lifecycle::release_pid(&paths);
            std::process::exit(1);
        }
        _ = sigint.recv() => {
            warn!("second termination signal, exiting without drain");
            lifecycle::release_pid(&paths);
            std::process::exit(1);
        }
    }

    lifecycle::release_pid(&paths);
    info!("daemon stopped");
    Ok(())
}

/// Re-read config, refresh rosters, and swap in a fresh sender with the
/// new batch tuning. Returns true when the new configuration took effect
/// (the caller rebuilds config-derived timers).
async fn reload(
    paths: &DaemonPaths,
    config: &mut Config,
    tracer: &mut Tracer<ApiClient>,
    notices: &mut mpsc::UnboundedReceiver<SenderNotice>,
) -> bool {
    let fresh = match Config::load(&paths.home.config_path()) {
        Ok(fresh) => fresh,
        Err(e) => {
            warn!(error = %e, "reload failed; keeping previous configuration");
            return false;
        }
    };
    let (sender, fresh_notices) =
        Sender::new(ApiClient::new(), SenderParams::from_tracer(&fresh.tracer()));
    *notices = fresh_notices;
    *config = fresh.clone();
    tracer.reload(fresh, sender).await;
    true
}

/// Roster-refresh interval from the active config.
fn roster_interval(config: &Config) -> tokio::time::Interval {
    let mut timer = tokio::time::interval(Duration::from_millis(
        config.tracer().repo_sync_interval_ms.max(1000),
    ));
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    timer
}

/// Watch the journal root recursively; any create/modify event forwards
/// the affected path to the supervisor loop.
fn create_dir_watcher(
    dir: &std::path::Path,
    tx: mpsc::Sender<PathBuf>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if let Ok(event) = res {
            if event.kind.is_create() || event.kind.is_modify() {
                for path in event.paths {
                    let _ = tx.blocking_send(path);
                }
            }
        }
    })?;
    watcher.watch(dir, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Best-effort: rotation failures are ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let _ = std::fs::rename(format!("{log_str}.{i}"), format!("{log_str}.{}", i + 1));
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to the log before tracing is up, so a
/// human scanning the log can find where this run began.
const STARTUP_MARKER_PREFIX: &str = "--- ovld: starting (pid: ";

fn write_startup_marker(paths: &DaemonPaths) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = paths.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

/// Write startup errors synchronously to the error log; the non-blocking
/// tracing appender may not flush before a fast exit.
fn write_startup_error(paths: &DaemonPaths, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.error_log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {}", error);
}

fn setup_logging(
    paths: &DaemonPaths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = paths
        .log_path
        .parent()
        .map(std::path::Path::to_path_buf)
        .unwrap_or_default();
    std::fs::create_dir_all(&dir)?;

    let file_name = paths
        .log_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tracer.log".to_string());
    let file_appender = tracing_appender::rolling::never(&dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
