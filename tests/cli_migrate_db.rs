//! CLI integration tests for the `--migrate-db` flag.
//!
//! These tests spawn the prtally binary as a subprocess to verify exit status
//! and ensure no GitHub operations occur during migration-only runs.

mod support;

use std::process::{Command, Output};

use prtally::persistence::CURRENT_SCHEMA_VERSION;
use rstest::rstest;

use support::create_temp_dir;

fn run_prtally(args: &[&str], env: &[(&str, Option<&str>)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_prtally"));
    command.args(args);

    // Keep runs hermetic even if the developer has prtally env vars set.
    command
        .env_remove("PRTALLY_DATABASE_URL")
        .env_remove("PRTALLY_MIGRATE_DB")
        .env_remove("PRTALLY_TOKEN")
        .env_remove("PRTALLY_OWNER")
        .env_remove("PRTALLY_REPO")
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG");

    for (key, value) in env {
        match value {
            Some(env_value) => {
                command.env(key, env_value);
            }
            None => {
                command.env_remove(key);
            }
        }
    }

    command
        .output()
        .unwrap_or_else(|error| panic!("failed to execute binary: {error}"))
}

fn run_migrate_db(database_url: Option<&str>, env: &[(&str, Option<&str>)]) -> Output {
    let mut args = vec!["--migrate-db"];
    if let Some(database_url_value) = database_url {
        args.extend(["--database-url", database_url_value]);
    }

    run_prtally(&args, env)
}

fn assert_succeeded(output: &Output) {
    assert!(
        output.status.success(),
        "expected successful exit, got: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn assert_migrate_db_fails(
    database_url: Option<&str>,
    env: &[(&str, Option<&str>)],
    expected_stderr_substring: &str,
) {
    let output = run_migrate_db(database_url, env);
    assert_eq!(output.status.code(), Some(1), "expected failure exit status");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(expected_stderr_substring),
        "expected stderr to contain {expected_stderr_substring:?}, got: {stderr}"
    );
}

#[test]
fn migrate_db_creates_a_file_database() {
    let temp_dir = create_temp_dir();
    let db_path = temp_dir.path().join("prtally.sqlite");
    let db_url = db_path.to_string_lossy().into_owned();

    assert_succeeded(&run_migrate_db(Some(&db_url), &[]));

    assert!(
        db_path.exists(),
        "database file should be created at {}",
        db_path.display()
    );
}

#[test]
fn migrate_db_emits_schema_telemetry_without_contacting_github() {
    let output = run_migrate_db(Some(":memory:"), &[]);
    assert_succeeded(&output);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("schema_version_recorded"),
        "expected telemetry on stderr, got: {stderr}"
    );
    assert!(
        stderr.contains(CURRENT_SCHEMA_VERSION),
        "expected schema version in telemetry, got: {stderr}"
    );
    assert!(
        !stderr.contains("rate limit") && !stderr.contains("starting scrape"),
        "should not interact with GitHub API, got: {stderr}"
    );
}

#[rstest]
#[case::missing_database_url(None, "database URL is required")]
#[case::blank_database_url(Some("   "), "database URL must not be blank")]
fn migrate_db_fails_with_invalid_database_url(
    #[case] database_url: Option<&str>,
    #[case] expected_stderr_substring: &str,
) {
    assert_migrate_db_fails(database_url, &[], expected_stderr_substring);
}

#[test]
fn migrate_db_fails_with_directory_path() {
    let temp_dir = create_temp_dir();
    let dir_path = temp_dir.path().to_string_lossy().into_owned();

    assert_migrate_db_fails(
        Some(&dir_path),
        &[],
        "failed to connect to SQLite database",
    );
}

#[test]
fn migrate_db_reads_database_url_from_environment() {
    let output = run_migrate_db(None, &[("PRTALLY_DATABASE_URL", Some(":memory:"))]);

    assert_succeeded(&output);
}

#[test]
fn migrate_db_cli_database_url_overrides_environment() {
    let output = run_migrate_db(Some(":memory:"), &[("PRTALLY_DATABASE_URL", Some("   "))]);

    assert_succeeded(&output);
}

#[test]
fn scrape_without_repository_fails_with_guidance() {
    let output = run_prtally(&["--database-url", ":memory:"], &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("repository owner is required"),
        "expected owner guidance, got: {stderr}"
    );
}
