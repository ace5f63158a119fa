//! Build re-triggering through the pushlog and build APIs.
//!
//! Resolves a human build name plus a revision to a concrete set of
//! rebuild requests: the repository is recognized from the build name,
//! `back_revisions` walks the push-ordered revision list through the
//! pushlog, and each requested rebuild goes to the build API. The
//! returned treeherder URL lets the user track the triggered builds.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Deserialize;

use crate::bugzilla::http_error;
use crate::{Error, Result};

const HG_BASE: &str = "https://hg.mozilla.org";
const BUILDAPI_BASE: &str = "https://secure.pub.build.mozilla.org/buildapi/self-serve";
const TREEHERDER_BASE: &str = "https://treeherder.mozilla.org/#/jobs";

/// User-Agent header sent with every request.
const USER_AGENT: &str = "flakewatch-cli";

/// HTTP status the build API answers when a rebuild request is
/// accepted for processing.
const ACCEPTED: u16 = 202;

/// Branches recognized inside build names, with their repository paths
/// on the source host.
const BRANCH_PATHS: &[(&str, &str)] = &[
    ("mozilla-central", "mozilla-central"),
    ("mozilla-inbound", "integration/mozilla-inbound"),
    ("b2g-inbound", "integration/b2g-inbound"),
    ("fx-team", "integration/fx-team"),
    ("mozilla-aurora", "releases/mozilla-aurora"),
    ("mozilla-beta", "releases/mozilla-beta"),
    ("mozilla-release", "releases/mozilla-release"),
    ("try", "try"),
];

/// One build re-trigger request.
#[derive(Debug, Clone)]
pub struct TriggerRequest<'a> {
    pub buildname: &'a str,
    pub revision: &'a str,
    /// Walk this many pushes back from `revision` before triggering.
    pub back_revisions: u64,
    /// Number of rebuilds to request.
    pub times: u32,
    /// Resolve everything but skip the actual rebuild requests.
    pub dry_run: bool,
}

/// Trigger the requested rebuilds and return the tracking URL.
///
/// Rebuild requests the build API does not accept are counted and
/// reported as a warning; they never abort the run, since the other
/// requests may well have been accepted.
pub fn trigger_jobs(request: &TriggerRequest<'_>) -> Result<String> {
    let buildname = request.buildname.trim();
    let (repo_name, repo_path) = repo_for_buildname(buildname)?;
    let repo_url = format!("{HG_BASE}/{repo_path}");

    let revision = if request.back_revisions > 0 {
        resolve_back_revision(&repo_url, request.revision, request.back_revisions)?
    } else {
        short_rev(request.revision).to_string()
    };

    if request.dry_run {
        tracing::info!(
            "dry run: would request {} rebuilds of {buildname:?} at {revision}",
            request.times
        );
    } else {
        let mut rejected = 0u32;
        for _ in 0..request.times {
            if !request_rebuild(repo_name, buildname, &revision)? {
                rejected += 1;
            }
        }
        if rejected > 0 {
            tracing::warn!(
                "{rejected} of {} trigger requests were not accepted",
                request.times
            );
        }
    }

    Ok(tracking_url(repo_name, &revision, buildname))
}

/// Recognize the repository a build name belongs to.
fn repo_for_buildname(buildname: &str) -> Result<(&'static str, &'static str)> {
    BRANCH_PATHS
        .iter()
        .find(|(name, _)| buildname.split_whitespace().any(|word| word == *name))
        .copied()
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "unable to determine the repository from buildname {buildname:?}"
            ))
        })
}

/// Pushlog entry (only the changesets are read).
#[derive(Debug, Deserialize)]
struct Push {
    changesets: Vec<String>,
}

/// Resolve the head revision `back` pushes before `revision`.
fn resolve_back_revision(repo_url: &str, revision: &str, back: u64) -> Result<String> {
    let push_id = query_push_id(repo_url, revision)?;
    // startID is exclusive in the pushlog API.
    let start_id = push_id.saturating_sub(back + 1);
    let pushes = query_push_range(repo_url, start_id, push_id)?;
    oldest_head(&pushes)
        .map(|rev| short_rev(rev).to_string())
        .ok_or_else(|| {
            Error::InvalidInput(format!("no pushes found before revision {revision}"))
        })
}

/// The push id containing `revision`.
fn query_push_id(repo_url: &str, revision: &str) -> Result<u64> {
    let url = format!("{repo_url}/json-pushes");
    let response = ureq::get(&url)
        .set("User-Agent", USER_AGENT)
        .query("changeset", revision)
        .call()
        .map_err(http_error)?;
    let pushes: BTreeMap<String, Push> = response
        .into_json()
        .map_err(|e| Error::Http(format!("invalid pushlog response: {e}")))?;
    pushes
        .keys()
        .next()
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| {
            Error::InvalidInput(format!("revision {revision} not found in the pushlog"))
        })
}

/// Pushes with ids in `(start_id, end_id]`, keyed by push id.
fn query_push_range(
    repo_url: &str,
    start_id: u64,
    end_id: u64,
) -> Result<BTreeMap<u64, Push>> {
    let url = format!("{repo_url}/json-pushes");
    let response = ureq::get(&url)
        .set("User-Agent", USER_AGENT)
        .query("startID", &start_id.to_string())
        .query("endID", &end_id.to_string())
        .call()
        .map_err(http_error)?;
    let pushes: BTreeMap<String, Push> = response
        .into_json()
        .map_err(|e| Error::Http(format!("invalid pushlog response: {e}")))?;

    let mut by_id = BTreeMap::new();
    for (id, push) in pushes {
        let id: u64 = id
            .parse()
            .map_err(|_| Error::Http(format!("non-numeric push id {id:?} in pushlog")))?;
        by_id.insert(id, push);
    }
    Ok(by_id)
}

/// Head changeset of the oldest push in the range.
///
/// Pushlog changesets are listed oldest first within a push, so the
/// push head is the last one.
fn oldest_head(pushes: &BTreeMap<u64, Push>) -> Option<&str> {
    pushes
        .values()
        .next()
        .and_then(|push| push.changesets.last())
        .map(String::as_str)
}

/// Request one rebuild. Returns whether the build API accepted it.
fn request_rebuild(repo_name: &str, buildname: &str, revision: &str) -> Result<bool> {
    let url = format!(
        "{BUILDAPI_BASE}/{repo_name}/builders/{}/{revision}",
        encode_component(buildname)
    );
    match ureq::post(&url)
        .set("User-Agent", USER_AGENT)
        .set("Accept", "application/json")
        .call()
    {
        Ok(response) => Ok(response.status() == ACCEPTED),
        // A rejected request is a warning, not an abort.
        Err(ureq::Error::Status(_, _)) => Ok(false),
        Err(e) => Err(Error::Http(e.to_string())),
    }
}

/// Treeherder URL tracking the triggered builds.
fn tracking_url(repo_name: &str, revision: &str, buildname: &str) -> String {
    format!(
        "{TREEHERDER_BASE}?{}",
        encode_query(&[
            ("repo", repo_name),
            ("revision", revision),
            ("filter-searchStr", buildname),
        ])
    )
}

fn encode_query(pairs: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (i, (key, value)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(&encode_component(key));
        out.push('=');
        out.push_str(&encode_component(value));
    }
    out
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

/// Pushlog revisions are referenced by their 12-char short form.
fn short_rev(revision: &str) -> &str {
    revision.get(..12).unwrap_or(revision)
}
