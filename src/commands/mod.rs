//! Command implementations for the Flakewatch CLI.
//!
//! Each function implements one subcommand and returns its rendered
//! output; `main` prints it. The pipeline is the same everywhere:
//! load the stored document (applying the configured filters), project
//! it into a table, sort/filter/render.

use std::path::Path;

use crate::bugzilla::{BugFinder, ConsoleReporter};
use crate::config::{self, Config};
use crate::models::{BugRecord, RawBugs};
use crate::report::{
    self, BugColumn, MetaColumn, OccurrenceColumn, UNASSIGNED, builds_table, bug_table,
    columns_table, occurrences_table,
};
use crate::table::{Cell, ColumnSet};
use crate::trigger::{TriggerRequest, trigger_jobs};
use crate::{Error, Result, storage};

/// Load the stored document the way the reading commands see it:
/// buildname filter applied, bugs without occurrences dropped.
fn read_bugs(config: &Config, input: &Path) -> Result<RawBugs> {
    let filter = config.buildname_filter()?;
    storage::load_bugs(input, Some(&filter), false)
}

fn find_bug<'a>(raw_bugs: &'a RawBugs, bugid: &str) -> Result<&'a BugRecord> {
    raw_bugs
        .get(bugid)
        .ok_or_else(|| Error::BugNotFound(bugid.to_string()))
}

/// `fw update`: fetch from the tracker and store a fresh snapshot.
///
/// The previous snapshot, when present and compatible, feeds the
/// finder's up-to-date reuse; it is loaded unfiltered and with empty
/// bugs kept so their `last_change_time` stays available.
pub fn update(output: &Path, days_ago: i64) -> Result<()> {
    let previous = match storage::load_bugs(output, None, true) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::debug!("no previous snapshot reused: {e}");
            None
        }
    };

    let finder = BugFinder::new(previous.as_ref());
    let mut reporter = ConsoleReporter::default();
    let bugs = finder.find(days_ago, None, &mut reporter)?;

    storage::save_bugs(&bugs, output)?;
    tracing::info!("stored {} bugs in {}", bugs.len(), output.display());
    Ok(())
}

/// `fw list`: the filtered, sorted bug listing.
pub fn list(config: &Config, input: &Path, sort_by: &str, limit: usize) -> Result<String> {
    let raw_bugs = read_bugs(config, input)?;
    let total = raw_bugs.len();

    let mut table = bug_table(&raw_bugs);
    table.retain(|row| {
        let product = row[&BugColumn::Product].as_str().unwrap_or_default();
        if config.filter_products.contains(product) {
            return false;
        }
        if !config.show_assigned_to
            && row[&BugColumn::AssignedTo].as_str() != Some(UNASSIGNED)
        {
            return false;
        }
        if !config.show_resolved && row[&BugColumn::Status].as_str() == Some("RESOLVED") {
            return false;
        }
        row[&BugColumn::Occurrences].as_int().unwrap_or(0) >= i64::from(config.min_intermittents)
    });
    table.sort_by_spec(sort_by)?;
    table.truncate(limit);

    let columns = visible_columns(config)?;
    let mut out = table.render(&columns);
    out.push('\n');
    out.push_str(&format!(
        "Listing {}/{total} intermittent bugs.\n",
        table.len()
    ));
    Ok(out)
}

fn visible_columns(config: &Config) -> Result<Vec<BugColumn>> {
    config
        .visible_columns
        .iter()
        .map(|name| {
            BugColumn::from_name(name).ok_or_else(|| Error::UnknownColumn(name.clone()))
        })
        .collect()
}

/// `fw list-columns`: describe the bug listing columns.
pub fn list_columns() -> String {
    columns_table().render(MetaColumn::ALL)
}

/// `fw show`: oldest occurrence plus the per-build summary (or the
/// full occurrence listing).
pub fn show(config: &Config, input: &Path, bugid: &str, full: bool) -> Result<String> {
    let raw_bugs = read_bugs(config, input)?;
    let bug = find_bug(&raw_bugs, bugid)?;
    let oldest = bug
        .oldest()
        .ok_or_else(|| Error::BugNotFound(bugid.to_string()))?;

    let mut out = format!(
        "Oldest intermittent on {} ({})\n\n",
        Cell::from(oldest.timestamp).plain(),
        oldest.revision
    );
    if full {
        out.push_str("List of intermittents:\n");
        out.push_str(&occurrences_table(bug).render(OccurrenceColumn::ALL));
    } else {
        out.push_str("Intermittent occurrences per build:\n");
        out.push_str(&builds_table(bug).render(report::BuildColumn::ALL));
    }
    Ok(out)
}

/// `fw trigger`: re-trigger builds for the oldest occurrence.
pub fn trigger(
    config: &Config,
    input: &Path,
    bugid: &str,
    back_revisions: i64,
    times: u32,
    buildname: Option<&str>,
    dry_run: bool,
) -> Result<String> {
    let raw_bugs = read_bugs(config, input)?;
    let bug = find_bug(&raw_bugs, bugid)?;
    let oldest = bug
        .oldest()
        .ok_or_else(|| Error::BugNotFound(bugid.to_string()))?;

    let url = trigger_jobs(&TriggerRequest {
        buildname: buildname.unwrap_or(&oldest.buildname),
        revision: &oldest.revision,
        back_revisions: back_revisions.unsigned_abs(),
        times,
        dry_run,
    })?;

    Ok(format!(
        "Use the following treeherder url to keep track of the builds:\n\
         \n{url}\n\n\
         Note that the builds on treeherder will appear in a few minutes.\n"
    ))
}

/// `fw generate-conf`: write the default configuration template.
pub fn generate_conf(path: &Path) -> Result<String> {
    config::generate_conf(path)?;
    Ok(format!("Configuration file written to {}\n", path.display()))
}
