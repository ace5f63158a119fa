//! Common test utilities for flakewatch integration tests.
//!
//! Provides `TestEnv` for isolated test environments: every test runs
//! `fw` inside its own temporary directory with its own data and
//! configuration files, making tests parallel-safe.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// Version string expected by the current binary; fixtures carry it so
/// they load.
pub const DATA_VERSION: &str = "1.0";

/// A sample stored document with three bugs:
/// - 1111: 12 occurrences over 5 days, unassigned, NEW
/// - 2222: 12 occurrences on one day, unassigned, RESOLVED
/// - 3333: 2 occurrences, unassigned, NEW (below the default minimum)
pub fn sample_bugs_json() -> String {
    let occurrences_1111: Vec<String> = (0..12)
        .map(|i| {
            format!(
                r#"{{"timestamp":"2015-04-{:02}T03:16:25","revision":"aaa111222333","buildname":"Ubuntu VM 12.04 mozilla-inbound opt test mochitest-1"}}"#,
                10 + (i % 6)
            )
        })
        .collect();
    let occurrences_2222: Vec<String> = (0..12)
        .map(|_| {
            r#"{"timestamp":"2015-04-11T08:00:00","revision":"bbb444555666","buildname":"Windows 7 32-bit mozilla-inbound debug test reftest"}"#
                .to_string()
        })
        .collect();

    format!(
        r#"{{
  "metadata": {{"version": "{DATA_VERSION}"}},
  "bugs": {{
    "1111": {{
      "status": "NEW",
      "assigned_to": "nobody@mozilla.org",
      "product": "Core",
      "last_change_time": "2015-04-20T11:00:00Z",
      "intermittents": [{}]
    }},
    "2222": {{
      "status": "RESOLVED",
      "assigned_to": "nobody@mozilla.org",
      "product": "Testing",
      "last_change_time": "2015-04-21T09:30:00Z",
      "intermittents": [{}]
    }},
    "3333": {{
      "status": "NEW",
      "assigned_to": "nobody@mozilla.org",
      "product": "Firefox",
      "last_change_time": "2015-04-19T16:45:00Z",
      "intermittents": [
        {{"timestamp":"2015-04-14T01:00:00","revision":"ccc777888999","buildname":"Ubuntu VM 12.04 mozilla-inbound opt test reftest"}},
        {{"timestamp":"2015-04-15T02:00:00","revision":"ccc777888999","buildname":"Ubuntu VM 12.04 mozilla-inbound opt test reftest"}}
      ]
    }}
  }}
}}"#,
        occurrences_1111.join(","),
        occurrences_2222.join(",")
    )
}

/// A test environment with an isolated working directory.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Create a test environment seeded with the sample stored bugs.
    pub fn with_sample_bugs() -> Self {
        let env = Self::new();
        env.write_bugs(&sample_bugs_json());
        env
    }

    /// Get a Command for the fw binary running in this environment.
    pub fn fw(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_fw"));
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Write the stored bugs file.
    pub fn write_bugs(&self, contents: &str) {
        std::fs::write(self.dir.path().join("intermittents.json"), contents).unwrap();
    }

    /// Write the configuration file.
    pub fn write_conf(&self, contents: &str) {
        std::fs::write(self.dir.path().join("flakewatch.toml"), contents).unwrap();
    }

    /// Get the path to the working directory.
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
