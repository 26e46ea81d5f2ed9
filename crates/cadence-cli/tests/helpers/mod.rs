use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands with temporary databases
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("cadence").expect("Failed to find cadence binary");

        // Run inside the temp dir so no stray cadence.toml is picked up.
        cmd.current_dir(self.temp_dir.path());
        cmd.env("CADENCE_DATABASE_PATH", &self.db_path);
        cmd.env_remove("CADENCE_LOG");
        cmd.env_remove("RUST_LOG");

        cmd
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Run a command and return its stdout
    pub fn stdout_of(&self, args: &[&str]) -> String {
        let output = self.run_success(args).get_output().stdout.clone();
        String::from_utf8(output).expect("stdout is not UTF-8")
    }

    /// Add a template and return its full id
    pub fn add_template(&self, args: &[&str]) -> String {
        let stdout = self.stdout_of(args);
        extract_id(&stdout, "Template ID: ").expect("template id in output")
    }
}

/// Removes ANSI colour sequences from CLI output.
pub fn strip_ansi(output: &str) -> String {
    let mut cleaned = String::with_capacity(output.len());
    let mut chars = output.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            cleaned.push(c);
        }
    }
    cleaned
}

/// Pulls the uuid printed after `label`.
pub fn extract_id(output: &str, label: &str) -> Option<String> {
    let output = strip_ansi(output);
    let line = output.lines().find(|l| l.contains(label))?;
    let rest = line[line.find(label)? + label.len()..].trim();
    let id: String = rest.chars().take(36).collect();
    uuid::Uuid::parse_str(&id).ok().map(|_| id)
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Monthly rent on the 31st, anchored in January 2025
    pub fn rent_args() -> Vec<&'static str> {
        vec![
            "add", "Rent",
            "--anchor", "2025-01-31",
            "--every", "month",
            "--day-of-month", "31",
            "--kind", "transaction",
            "--counterparty", "Landlord",
            "--amount", "-1200",
        ]
    }

    /// Weekly task starting on a Monday
    pub fn standup_args() -> Vec<&'static str> {
        vec!["add", "Team sync", "--anchor", "2025-03-03", "--every", "week"]
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use super::*;

    pub fn created_successfully() -> impl Predicate<str> {
        predicate::str::contains("✓").and(predicate::str::contains("Created template"))
    }

    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error").or(predicate::str::contains("error"))
    }
}
