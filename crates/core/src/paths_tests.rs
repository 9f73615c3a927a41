// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial]
fn env_override_wins() {
    let dir = tempdir().unwrap();
    std::env::set_var("OVERLAP_HOME", dir.path());
    let home = OverlapHome::resolve().unwrap();
    std::env::remove_var("OVERLAP_HOME");
    assert_eq!(home.root(), dir.path());
}

#[test]
fn layout_is_fixed() {
    let home = OverlapHome::at(PathBuf::from("/u/.overlap"));
    assert_eq!(home.config_path(), PathBuf::from("/u/.overlap/config.json"));
    assert_eq!(home.state_path(), PathBuf::from("/u/.overlap/state.json"));
    assert_eq!(home.cache_path(), PathBuf::from("/u/.overlap/cache.json"));
    assert_eq!(
        home.mirror_path(),
        PathBuf::from("/u/.overlap/team-state.json")
    );
    assert_eq!(home.pid_path(), PathBuf::from("/u/.overlap/tracer.pid"));
    assert_eq!(home.reload_flag_path(), PathBuf::from("/u/.overlap/reload"));
    assert_eq!(
        home.log_path(),
        PathBuf::from("/u/.overlap/logs/tracer.log")
    );
}

#[test]
fn pid_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tracer.pid");

    write_pid(&path).unwrap();
    assert_eq!(read_pid(&path), Some(std::process::id()));

    remove_pid_if_owned(&path);
    assert!(!path.exists());
}

#[test]
fn foreign_pid_file_is_left_alone() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tracer.pid");
    std::fs::write(&path, "999999999\n").unwrap();

    remove_pid_if_owned(&path);
    assert!(path.exists());
}

#[test]
fn garbage_pid_reads_as_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tracer.pid");
    std::fs::write(&path, "not-a-pid").unwrap();
    assert_eq!(read_pid(&path), None);
}
