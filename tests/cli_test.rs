//! CLI end-to-end tests for the kino binary.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[allow(deprecated)]
fn kino_cmd() -> Command {
    Command::cargo_bin("kino").unwrap()
}

#[test]
fn no_args_shows_help() {
    kino_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn version_command() {
    kino_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kino"));
}

#[test]
fn check_tools_lists_both_tools() {
    let dir = tempdir().unwrap();
    kino_cmd()
        .current_dir(dir.path())
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg").and(predicate::str::contains("ffprobe")));
}

#[test]
fn validate_accepts_good_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("kino.toml");
    fs::write(
        &config,
        format!(
            "[library]\nsource_root = {:?}\n\n[server]\nport = 9123\n",
            dir.path()
        ),
    )
    .unwrap();

    kino_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"))
        .stdout(predicate::str::contains("9123"));
}

#[test]
fn validate_rejects_port_zero() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("kino.toml");
    fs::write(&config, "[server]\nport = 0\n").unwrap();

    kino_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("port"));
}

#[test]
fn sync_then_catalog() {
    let dir = tempdir().unwrap();
    let usb = dir.path().join("usb");
    fs::create_dir_all(usb.join("Movies/Action")).unwrap();
    fs::write(usb.join("Movies/Action/My_Clip.mp4"), b"not a video").unwrap();
    fs::create_dir_all(dir.path().join("www")).unwrap();

    let config = dir.path().join("kino.toml");
    fs::write(
        &config,
        format!(
            "[library]\nsource_root = {:?}\ndb_path = {:?}\nsnapshot_path = {:?}\n\n[server]\nserve_root = {:?}\n\n[tools]\nffmpeg_path = \"/nonexistent/ffmpeg\"\nffprobe_path = \"/nonexistent/ffprobe\"\n",
            usb,
            dir.path().join("movies.db"),
            dir.path().join("library.json"),
            dir.path().join("www"),
        ),
    )
    .unwrap();

    // Tools may or may not be on PATH; either way the file is cataloged.
    kino_cmd()
        .env("PATH", "")
        .arg("--config")
        .arg(&config)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entries"));

    kino_cmd()
        .arg("--config")
        .arg(&config)
        .arg("catalog")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"My Clip\""))
        .stdout(predicate::str::contains("\"type\": \"Movies\""));
}
