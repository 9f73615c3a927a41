// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user state directory layout and PID file lifecycle.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathsError {
    #[error("could not determine home directory")]
    NoHomeDir,
}

/// The `~/.overlap/` directory and the files inside it.
///
/// Resolution: `$OVERLAP_HOME` if set, else `~/.overlap`.
#[derive(Debug, Clone)]
pub struct OverlapHome {
    root: PathBuf,
}

impl OverlapHome {
    pub fn resolve() -> Result<Self, PathsError> {
        if let Ok(dir) = std::env::var("OVERLAP_HOME") {
            return Ok(Self::at(PathBuf::from(dir)));
        }
        let home = dirs::home_dir().ok_or(PathsError::NoHomeDir)?;
        Ok(Self::at(home.join(".overlap")))
    }

    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root.join("cache.json")
    }

    pub fn mirror_path(&self) -> PathBuf {
        self.root.join("team-state.json")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.root.join("tracer.pid")
    }

    /// Existence of this file asks the daemon to reload its config.
    pub fn reload_flag_path(&self) -> PathBuf {
        self.root.join("reload")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir().join("tracer.log")
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.log_dir().join("tracer.error.log")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.log_dir())
    }
}

/// Write this process's PID as an ASCII integer.
pub fn write_pid(path: &Path) -> std::io::Result<()> {
    std::fs::write(path, format!("{}\n", std::process::id()))
}

/// Read a PID file. `None` on absence or garbage.
pub fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Remove the PID file, but only if it still names this process.
///
/// The file is advisory; another daemon may have replaced it since we
/// wrote ours.
pub fn remove_pid_if_owned(path: &Path) {
    if read_pid(path) == Some(std::process::id()) {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
