//! CLI integration tests
//!
//! Each test drives the `studyhub` binary against a scratch SQLite file and
//! inspects the JSON it prints.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const STORE_VARS: [&str; 5] = [
    "STUDYHUB_BACKEND",
    "STUDYHUB_SQLITE_PATH",
    "STUDYHUB_DATABASE_URL",
    "DATABASE_URL",
    "RUST_LOG",
];

fn db_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("data").join("store.db")
}

fn run(temp_dir: &TempDir, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_studyhub"));
    command.current_dir(temp_dir.path());
    for var in STORE_VARS {
        command.env_remove(var);
    }
    command
        .arg("--sqlite-path")
        .arg(db_path(temp_dir))
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn run_json(temp_dir: &TempDir, args: &[&str]) -> Value {
    let output = run(temp_dir, args);
    assert!(
        output.status.success(),
        "CLI command {:?} should succeed. Stderr: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn seeded(temp_dir: &TempDir) -> Value {
    let outcome = run_json(temp_dir, &["seed"]);
    assert_eq!(outcome["status"], "seeded");
    outcome
}

#[test]
fn test_migrate_creates_database_file() {
    // Given: An empty directory
    let temp_dir = TempDir::new().unwrap();

    // When: `studyhub migrate` runs
    let report = run_json(&temp_dir, &["migrate"]);

    // Then: The schema is recorded and the file exists
    assert_eq!(report["backend"], "sqlite");
    assert_eq!(report["migrations"][0], "001_initial_schema");
    assert!(db_path(&temp_dir).exists());
}

#[test]
fn test_seed_is_idempotent() {
    // Given: A seeded database
    let temp_dir = TempDir::new().unwrap();
    let first = seeded(&temp_dir);

    // When: Seeding runs again
    let second = run_json(&temp_dir, &["seed"]);

    // Then: Nothing new is written
    assert_eq!(second["status"], "already_seeded");
    assert_eq!(second["adminId"], first["adminId"]);
}

#[test]
fn test_tree_prints_seeded_hierarchy() {
    let temp_dir = TempDir::new().unwrap();
    seeded(&temp_dir);

    let tree = run_json(&temp_dir, &["tree"]);

    let mains = tree.as_array().unwrap();
    assert_eq!(mains.len(), 1);
    assert_eq!(mains[0]["title"], "People of God in the Bible");
    let classes = mains[0]["classes"].as_array().unwrap();
    assert_eq!(classes.len(), 2);
    assert_eq!(classes[0]["lessons"].as_array().unwrap().len(), 2);
    assert!(classes[0].get("subClasses").is_none());
}

#[test]
fn test_progress_then_bookmarks() {
    // Given: Seeded content
    let temp_dir = TempDir::new().unwrap();
    let outcome = seeded(&temp_dir);
    let admin_id = outcome["adminId"].as_str().unwrap().to_string();
    let lesson_id = outcome["lessonIds"][0].as_str().unwrap().to_string();

    // When: The admin bookmarks a lesson and logs study time
    let record = run_json(
        &temp_dir,
        &[
            "progress",
            &admin_id,
            &lesson_id,
            "--bookmarked",
            "true",
            "--study-time",
            "12",
        ],
    );

    // Then: The record reflects the update
    assert_eq!(record["bookmarked"], true);
    assert_eq!(record["completed"], false);
    assert_eq!(record["studyTime"], 12);

    // And: The lesson is listed among the bookmarks with its progress
    let bookmarks = run_json(&temp_dir, &["bookmarks", &admin_id]);
    let bookmarks = bookmarks.as_array().unwrap();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0]["id"], lesson_id.as_str());
    assert_eq!(bookmarks[0]["progress"]["studyTime"], 12);

    // And: Nothing is completed yet
    let completed = run_json(&temp_dir, &["completed", &admin_id]);
    assert!(completed.as_array().unwrap().is_empty());
}

#[test]
fn test_search_matches_case_insensitively() {
    let temp_dir = TempDir::new().unwrap();
    seeded(&temp_dir);

    let hits = run_json(&temp_dir, &["search", "EXODUS"]);

    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["bibleReference"], "Exodus 3:1-15");
}

#[test]
fn test_missing_lesson_exits_with_error() {
    let temp_dir = TempDir::new().unwrap();
    run_json(&temp_dir, &["migrate"]);

    let output = run(&temp_dir, &["lessons", "--id", "no-such-lesson"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("lesson not found"));
}

#[test]
fn test_progress_for_unknown_user_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let outcome = seeded(&temp_dir);
    let lesson_id = outcome["lessonIds"][0].as_str().unwrap().to_string();

    let output = run(
        &temp_dir,
        &["progress", "ghost", &lesson_id, "--completed", "true"],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_CONSTRAINT_VIOLATION"));
}
