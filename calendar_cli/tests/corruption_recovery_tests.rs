//! Corruption recovery tests for kal.
//!
//! These tests verify the system handles:
//! - Corrupted events files (refuses to overwrite user data)
//! - Missing and empty files
//! - Invalid configuration
//! - Concurrent writers racing on the same data directory

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kal"));
    cmd.env("XDG_CONFIG_HOME", dir.path().join("config"))
        .arg("--data-dir")
        .arg(dir.path().join("data"));
    cmd
}

#[test]
fn test_corrupted_events_file_is_not_overwritten() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let events_path = data_dir.join("events.json");
    fs::write(&events_path, "{ invalid json }}}}").expect("Failed to write corrupted events");

    cli(&temp_dir)
        .args(["add", "--title", "Gym", "--date", "2024-10-15", "--start", "18:00", "--end", "19:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Json"));

    // The user's file is left as it was for manual recovery
    let content = fs::read_to_string(&events_path).unwrap();
    assert_eq!(content, "{ invalid json }}}}");
}

#[test]
fn test_missing_events_file() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .arg("list")
        .assert()
        .success()
        .stdout("No events.\n");
}

#[test]
fn test_empty_events_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("events.json"), "").unwrap();

    cli(&temp_dir)
        .args(["add", "--title", "Gym", "--date", "2024-10-15", "--start", "18:00", "--end", "19:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 1 event(s)"));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp_dir = setup_test_dir();
    let config_dir = temp_dir.path().join("config/kal");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[recurrence\nbroken").unwrap();

    cli(&temp_dir)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Toml"));
}

#[test]
fn test_sequential_writers_keep_every_event() {
    let temp_dir = setup_test_dir();

    for day in 10..15 {
        let date = format!("2024-10-{}", day);
        cli(&temp_dir)
            .args(["add", "--title", "Run", "--date", date.as_str(), "--start", "07:00", "--end", "07:30"])
            .assert()
            .success();
    }

    let content = fs::read_to_string(temp_dir.path().join("data/events.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(doc["events"].as_array().map(|a| a.len()), Some(5));

    // No temp files left behind by the atomic rename
    let mut entries: Vec<String> = fs::read_dir(temp_dir.path().join("data"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, ["events.json", "events.lock"]);
}

#[test]
fn test_parallel_writers_keep_every_event() {
    let temp_dir = setup_test_dir();
    let writers = 16;

    // Seed the file so every writer goes through load-modify-save
    cli(&temp_dir)
        .args(["add", "--title", "Seed", "--date", "2024-10-01", "--start", "06:00", "--end", "06:30"])
        .assert()
        .success();

    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let mut cmd = cli(&temp_dir);
            let title = format!("Writer {}", i);
            std::thread::spawn(move || {
                cmd.args(["add", "--title", title.as_str(), "--date", "2024-10-15", "--start", "07:00", "--end", "07:30"])
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Writer thread panicked");
    }

    let content = fs::read_to_string(temp_dir.path().join("data/events.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&content).unwrap();
    let events = doc["events"].as_array().cloned().unwrap_or_default();
    assert_eq!(events.len(), writers + 1, "Lost updates under concurrent add");

    for i in 0..writers {
        let title = format!("Writer {}", i);
        assert!(
            events.iter().any(|e| e["title"] == title.as_str()),
            "Missing {}",
            title
        );
    }
}
