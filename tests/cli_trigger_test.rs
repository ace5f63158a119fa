//! Integration tests for the offline parts of `fw trigger`.
//!
//! Resolution and rebuild requests need the network; these tests only
//! cover the argument surface and the failure paths that come before
//! any request is made.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_trigger_unknown_bug() {
    let env = TestEnv::with_sample_bugs();

    env.fw()
        .args(["trigger", "9999", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to find bug 9999"));
}

#[test]
fn test_trigger_unrecognized_buildname() {
    let env = TestEnv::with_sample_bugs();

    env.fw()
        .args(["trigger", "-b", "some unknown build flavor", "1111", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "unable to determine the repository",
        ));
}

#[test]
fn test_trigger_dry_run_prints_tracking_url() {
    let env = TestEnv::with_sample_bugs();

    // back_revisions = 0 and --dry-run: the revision is used as-is and
    // no request leaves the machine.
    env.fw()
        .args(["trigger", "--dry-run", "1111", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Use the following treeherder url to keep track of the builds:",
        ))
        .stdout(predicate::str::contains(
            "https://treeherder.mozilla.org/#/jobs?repo=mozilla-inbound&revision=aaa111222333",
        ))
        .stdout(predicate::str::contains("filter-searchStr="));
}

#[test]
fn test_trigger_missing_data_file() {
    let env = TestEnv::new();

    env.fw()
        .args(["trigger", "1111", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to load bug data"));
}
