//! Bug tracker queries for intermittent-failure bugs.
//!
//! This module is the "update" side of the tool: it searches the
//! tracker's REST API for bugs carrying the intermittent-failure
//! keyword, pulls each bug's comments, and extracts the recorded
//! occurrences from the machine-generated comment lines. A previous
//! snapshot short-circuits the comment fetch for bugs whose
//! `last_change_time` has not moved.

use std::collections::{HashMap, HashSet};
use std::io::Write as _;
use std::sync::OnceLock;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;

use crate::models::{BugRecord, Occurrence, RawBugs, TIMESTAMP_FORMAT};
use crate::{Error, Result};

/// Bug tracker REST API base URL.
const BUGZILLA_API_BASE: &str = "https://bugzilla.mozilla.org/rest";

/// User-Agent header sent with every tracker request.
const USER_AGENT: &str = "flakewatch-cli";

/// Tracker keyword marking intermittent-failure bugs.
const INTERMITTENT_KEYWORD: &str = "intermittent-failure";

/// Progress callbacks for a finder run.
///
/// All methods default to no-ops; [`ConsoleReporter`] implements the
/// interactive progress output of `fw update`.
pub trait FinderReporter {
    fn started(&mut self) {}
    fn found_bugs(&mut self, _count: usize) {}
    fn analyzing(&mut self, _bug_id: &str, _current: usize, _total: usize) {}
    fn reused(&mut self, _bug_id: &str) {}
    fn analyzed(&mut self, _bug_id: &str, _occurrences: usize) {}
    fn finished(&mut self, _result: &RawBugs) {}
}

/// Reporter that stays silent.
#[derive(Debug, Default)]
pub struct QuietReporter;

impl FinderReporter for QuietReporter {}

/// Reporter printing fetch progress to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    reused: HashSet<String>,
}

impl FinderReporter for ConsoleReporter {
    fn started(&mut self) {
        println!("Looking for bugs...");
    }

    fn found_bugs(&mut self, count: usize) {
        println!("Found {count} bugs");
    }

    fn analyzing(&mut self, bug_id: &str, current: usize, total: usize) {
        print!("Analyzing bug {bug_id} ({current}/{total})\r");
        let _ = std::io::stdout().flush();
    }

    fn reused(&mut self, bug_id: &str) {
        self.reused.insert(bug_id.to_string());
    }

    fn finished(&mut self, result: &RawBugs) {
        let with_data: Vec<&str> = result
            .bugs
            .iter()
            .filter(|(_, record)| !record.intermittents.is_empty())
            .map(|(id, _)| id.as_str())
            .collect();
        let without_data = result.len() - with_data.len();
        if without_data > 0 {
            println!(
                "Found {without_data} bugs without intermittents data - we won't use them"
            );
        }

        let reused = with_data
            .iter()
            .filter(|id| self.reused.contains(**id))
            .count();
        let up2date = if reused > 0 {
            format!(" ({reused} already up to date)")
        } else {
            String::new()
        };
        println!(
            "Finished analysis - kept {} new intermittents{up2date}",
            with_data.len() - reused
        );
    }
}

/// Search response shape (only the fields we read).
#[derive(Debug, Deserialize)]
struct SearchResponse {
    bugs: Vec<TrackerBug>,
}

#[derive(Debug, Deserialize)]
struct TrackerBug {
    id: u64,
    status: String,
    product: String,
    assigned_to: String,
    last_change_time: String,
}

#[derive(Debug, Deserialize)]
struct CommentsResponse {
    bugs: HashMap<String, BugComments>,
}

#[derive(Debug, Deserialize)]
struct BugComments {
    comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    text: String,
}

/// Finds intermittent bugs in the tracker, reusing a previous snapshot
/// where the tracker reports no change.
pub struct BugFinder<'a> {
    previous: Option<&'a RawBugs>,
}

impl<'a> BugFinder<'a> {
    pub fn new(previous: Option<&'a RawBugs>) -> Self {
        Self { previous }
    }

    /// Search bugs created within `[date_limit - days_ago, date_limit]`
    /// and build a fresh document. `date_limit` defaults to today.
    pub fn find(
        &self,
        days_ago: i64,
        date_limit: Option<NaiveDate>,
        reporter: &mut dyn FinderReporter,
    ) -> Result<RawBugs> {
        let date_limit = date_limit.unwrap_or_else(|| Local::now().date_naive());
        let start_date = date_limit - Duration::days(days_ago);

        reporter.started();
        let search = self.search_bugs(start_date, date_limit)?;
        reporter.found_bugs(search.bugs.len());

        let total = search.bugs.len();
        let mut result = RawBugs::new();
        for (index, bug) in search.bugs.into_iter().enumerate() {
            let bug_id = bug.id.to_string();
            reporter.analyzing(&bug_id, index + 1, total);

            if let Some(previous) = reusable(self.previous, &bug_id, &bug.last_change_time) {
                reporter.reused(&bug_id);
                result.bugs.insert(bug_id, previous.clone());
                continue;
            }

            let comments = self.fetch_comments(bug.id)?;
            let intermittents: Vec<Occurrence> = comments
                .iter()
                .filter_map(|c| occurrence_from_comment(&c.text))
                .collect();
            reporter.analyzed(&bug_id, intermittents.len());

            result.bugs.insert(
                bug_id,
                BugRecord {
                    status: bug.status,
                    assigned_to: bug.assigned_to,
                    product: bug.product,
                    last_change_time: bug.last_change_time,
                    intermittents,
                },
            );
        }
        reporter.finished(&result);
        Ok(result)
    }

    fn search_bugs(&self, start_date: NaiveDate, date_limit: NaiveDate) -> Result<SearchResponse> {
        let url = format!("{BUGZILLA_API_BASE}/bug");
        let response = ureq::get(&url)
            .set("User-Agent", USER_AGENT)
            .query("keywords", INTERMITTENT_KEYWORD)
            .query("chfield", "[Bug creation]")
            .query("chfieldfrom", &start_date.to_string())
            .query("chfieldto", &date_limit.to_string())
            .query(
                "include_fields",
                "id,status,product,assigned_to,last_change_time",
            )
            .call()
            .map_err(http_error)?;
        response
            .into_json()
            .map_err(|e| Error::Http(format!("invalid tracker search response: {e}")))
    }

    fn fetch_comments(&self, bug_id: u64) -> Result<Vec<Comment>> {
        let url = format!("{BUGZILLA_API_BASE}/bug/{bug_id}/comment");
        let response = ureq::get(&url)
            .set("User-Agent", USER_AGENT)
            .query("include_fields", "text")
            .call()
            .map_err(http_error)?;
        let parsed: CommentsResponse = response
            .into_json()
            .map_err(|e| Error::Http(format!("invalid tracker comment response: {e}")))?;
        Ok(parsed
            .bugs
            .into_values()
            .next()
            .map(|b| b.comments)
            .unwrap_or_default())
    }
}

/// The previous record for `bug_id`, if the tracker reports it
/// unchanged. `last_change_time` is compared as an opaque string.
fn reusable<'a>(
    previous: Option<&'a RawBugs>,
    bug_id: &str,
    last_change_time: &str,
) -> Option<&'a BugRecord> {
    let record = previous?.get(bug_id)?;
    (record.last_change_time == last_change_time).then_some(record)
}

fn info_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(buildname|revision|start_time|submit_timestamp): (.+)")
            .expect("static regex")
    })
}

/// Extract one occurrence from a machine-generated tracker comment.
///
/// The comment must carry a buildname, a revision and a timestamp
/// (`start_time` or `submit_timestamp`) line; anything less, any extra
/// recognized key, or an unparseable timestamp discards the comment.
fn occurrence_from_comment(text: &str) -> Option<Occurrence> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for line in text.lines() {
        if let Some(captures) = info_line_re().captures(line) {
            let key = match captures.get(1)?.as_str() {
                "start_time" | "submit_timestamp" => "timestamp",
                other => other,
            };
            fields.insert(key, captures.get(2)?.as_str());
        }
    }
    if fields.len() != 3 {
        return None;
    }
    let timestamp =
        NaiveDateTime::parse_from_str(fields.get("timestamp")?, TIMESTAMP_FORMAT).ok()?;
    Some(Occurrence {
        timestamp,
        revision: fields.get("revision")?.to_string(),
        buildname: fields.get("buildname")?.to_string(),
    })
}

pub(crate) fn http_error(err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            Error::Http(format!("bug tracker returned HTTP {code}: {body}"))
        }
        other => Error::Http(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;
    use std::collections::BTreeMap;

    #[test]
    fn test_occurrence_from_comment() {
        let occurrence = occurrence_from_comment(
            "\nbuildname: mybuildname\nrevision: myrevision\n\
             useless: justtobesure\nstart_time: 2015-04-15T03:16:25\n",
        )
        .unwrap();

        assert_eq!(occurrence.buildname, "mybuildname");
        assert_eq!(occurrence.revision, "myrevision");
        assert_eq!(
            occurrence.timestamp,
            NaiveDateTime::parse_from_str("2015-04-15T03:16:25", TIMESTAMP_FORMAT).unwrap()
        );
    }

    #[test]
    fn test_occurrence_from_comment_submit_timestamp() {
        let occurrence = occurrence_from_comment(
            "buildname: b\nrevision: r\nsubmit_timestamp: 2015-04-15T03:16:25\n",
        )
        .unwrap();
        assert_eq!(occurrence.buildname, "b");
    }

    #[test]
    fn test_occurrence_requires_all_three_fields() {
        assert!(occurrence_from_comment("hello\nworld\n").is_none());
        assert!(occurrence_from_comment("buildname: b\nrevision: r\n").is_none());
        assert!(
            occurrence_from_comment("revision: r\nstart_time: 2015-04-15T03:16:25\n").is_none()
        );
    }

    #[test]
    fn test_occurrence_bad_timestamp_discarded() {
        assert!(
            occurrence_from_comment("buildname: b\nrevision: r\nstart_time: last tuesday\n")
                .is_none()
        );
    }

    #[test]
    fn test_info_lines_must_start_the_line() {
        assert!(
            occurrence_from_comment(
                "> buildname: b\n> revision: r\n> start_time: 2015-04-15T03:16:25\n"
            )
            .is_none()
        );
    }

    fn previous_with(bug_id: &str, last_change_time: &str) -> RawBugs {
        RawBugs {
            metadata: Metadata {
                version: crate::models::DATA_VERSION.to_string(),
            },
            bugs: BTreeMap::from([(
                bug_id.to_string(),
                BugRecord {
                    status: "NEW".to_string(),
                    assigned_to: "nobody@mozilla.org".to_string(),
                    product: "Core".to_string(),
                    last_change_time: last_change_time.to_string(),
                    intermittents: Vec::new(),
                },
            )]),
        }
    }

    #[test]
    fn test_reusable_on_equal_last_change_time() {
        let previous = previous_with("1", "2015-05-01T10:00:00Z");
        assert!(reusable(Some(&previous), "1", "2015-05-01T10:00:00Z").is_some());
    }

    #[test]
    fn test_not_reusable_on_any_difference() {
        let previous = previous_with("1", "2015-05-01T10:00:00Z");
        // Different timestamp string, unknown bug, or no snapshot.
        assert!(reusable(Some(&previous), "1", "2015-05-02T10:00:00Z").is_none());
        assert!(reusable(Some(&previous), "2", "2015-05-01T10:00:00Z").is_none());
        assert!(reusable(None, "1", "2015-05-01T10:00:00Z").is_none());
    }

    #[test]
    fn test_search_response_deserialize() {
        let json = r#"{
            "bugs": [{
                "id": 1156310,
                "status": "NEW",
                "product": "Core",
                "assigned_to": "nobody@mozilla.org",
                "last_change_time": "2015-04-20T11:21:12Z"
            }]
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.bugs.len(), 1);
        assert_eq!(response.bugs[0].id, 1156310);
        assert_eq!(response.bugs[0].last_change_time, "2015-04-20T11:21:12Z");
    }

    #[test]
    fn test_comments_response_deserialize() {
        let json = r#"{
            "bugs": {
                "1156310": {
                    "comments": [
                        {"text": "first"},
                        {"text": "second"}
                    ]
                }
            }
        }"#;

        let response: CommentsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.bugs["1156310"].comments.len(), 2);
        assert_eq!(response.bugs["1156310"].comments[0].text, "first");
    }
}
