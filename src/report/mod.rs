//! Tabular projections of the raw-bugs document.
//!
//! Each view gets its own closed column set: the bug listing
//! ([`BugColumn`]), the column self-description ([`MetaColumn`]), the
//! per-bug occurrences-by-build summary ([`BuildColumn`]) and the full
//! occurrence listing ([`OccurrenceColumn`]).

use std::collections::HashMap;

use crate::models::{BugRecord, RawBugs};
use crate::table::{Cell, ColumnSet, Row, Table, count_by};

/// Tracker value meaning a bug has no assignee.
pub const UNASSIGNED: &str = "nobody@mozilla.org";

/// Columns of the bug listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BugColumn {
    Id,
    Occurrences,
    Date,
    Revision,
    Status,
    AssignedTo,
    Product,
    PerDay,
}

impl ColumnSet for BugColumn {
    const ALL: &'static [Self] = &[
        BugColumn::Id,
        BugColumn::Occurrences,
        BugColumn::Date,
        BugColumn::Revision,
        BugColumn::Status,
        BugColumn::AssignedTo,
        BugColumn::Product,
        BugColumn::PerDay,
    ];

    fn name(self) -> &'static str {
        match self {
            BugColumn::Id => "id",
            BugColumn::Occurrences => "nb",
            BugColumn::Date => "date",
            BugColumn::Revision => "rev",
            BugColumn::Status => "status",
            BugColumn::AssignedTo => "assigned_to",
            BugColumn::Product => "product",
            BugColumn::PerDay => "per_day",
        }
    }

    fn description(self) -> &'static str {
        match self {
            BugColumn::Id => "bug id in the tracker",
            BugColumn::Occurrences => "number of recorded intermittent occurrences",
            BugColumn::Date => "date of the oldest recorded occurrence",
            BugColumn::Revision => "revision of the oldest recorded occurrence",
            BugColumn::Status => "current bug status",
            BugColumn::AssignedTo => "who the bug is assigned to",
            BugColumn::Product => "product the bug is filed against",
            BugColumn::PerDay => "average occurrences per day since the oldest one",
        }
    }

    fn render(self, value: &Cell) -> String {
        match (self, value) {
            (BugColumn::PerDay, Cell::Float(v)) => format!("{v:.2}"),
            _ => value.plain(),
        }
    }
}

/// Build one listing row per bug, with the derived fields.
///
/// `per_day` divides the occurrence count by the whole days between the
/// oldest and newest occurrence dates, floored at one day so a bug
/// whose occurrences all share one day never divides by zero.
pub fn bug_table(raw_bugs: &RawBugs) -> Table<BugColumn> {
    let mut table = Table::new();
    for (bug_id, record) in &raw_bugs.bugs {
        if let Some(row) = bug_row(bug_id, record) {
            table.add_row(row);
        }
    }
    table
}

fn bug_row(bug_id: &str, record: &BugRecord) -> Option<Row<BugColumn>> {
    let occurrences = record.occurrences_by_time();
    let earliest = *occurrences.first()?;
    let latest = *occurrences.last()?;

    let count = occurrences.len();
    let span_days = (latest.timestamp.date() - earliest.timestamp.date())
        .num_days()
        .max(1);
    let per_day = count as f64 / span_days as f64;

    Some(HashMap::from([
        (BugColumn::Id, Cell::from(bug_id)),
        (BugColumn::Occurrences, Cell::from(count)),
        (BugColumn::Date, Cell::from(earliest.timestamp)),
        (BugColumn::Revision, Cell::from(earliest.revision.as_str())),
        (BugColumn::Status, Cell::from(record.status.as_str())),
        (BugColumn::AssignedTo, Cell::from(record.assigned_to.as_str())),
        (BugColumn::Product, Cell::from(record.product.as_str())),
        (BugColumn::PerDay, Cell::from(per_day)),
    ]))
}

/// Columns of the `list-columns` view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaColumn {
    Name,
    Description,
}

impl ColumnSet for MetaColumn {
    const ALL: &'static [Self] = &[MetaColumn::Name, MetaColumn::Description];

    fn name(self) -> &'static str {
        match self {
            MetaColumn::Name => "name",
            MetaColumn::Description => "description",
        }
    }

    fn description(self) -> &'static str {
        match self {
            MetaColumn::Name => "column name",
            MetaColumn::Description => "what the column shows",
        }
    }
}

/// The bug-listing column metadata as a table, sorted by column name.
pub fn columns_table() -> Table<MetaColumn> {
    let mut table = Table::new();
    for column in BugColumn::ALL {
        table.add_row(HashMap::from([
            (MetaColumn::Name, Cell::from(column.name())),
            (MetaColumn::Description, Cell::from(column.description())),
        ]));
    }
    table.sort(&[crate::table::SortKey {
        column: MetaColumn::Name,
        descending: false,
    }]);
    table
}

/// Columns of the per-bug occurrences-by-build summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildColumn {
    Buildname,
    Occurrences,
}

impl ColumnSet for BuildColumn {
    const ALL: &'static [Self] = &[BuildColumn::Buildname, BuildColumn::Occurrences];

    fn name(self) -> &'static str {
        match self {
            BuildColumn::Buildname => "buildname",
            BuildColumn::Occurrences => "occurrences",
        }
    }

    fn description(self) -> &'static str {
        match self {
            BuildColumn::Buildname => "build configuration name",
            BuildColumn::Occurrences => "occurrences recorded for this build",
        }
    }
}

/// Summarize a bug's occurrences per build name, most frequent first.
pub fn builds_table(record: &BugRecord) -> Table<BuildColumn> {
    let counts = count_by(&record.intermittents, |o| o.buildname.clone());
    let mut table = Table::new();
    for (buildname, occurrences) in counts {
        table.add_row(HashMap::from([
            (BuildColumn::Buildname, Cell::from(buildname)),
            (BuildColumn::Occurrences, Cell::from(occurrences)),
        ]));
    }
    table
}

/// Columns of the full occurrence listing (`show --full`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccurrenceColumn {
    Date,
    Revision,
    Buildname,
}

impl ColumnSet for OccurrenceColumn {
    const ALL: &'static [Self] = &[
        OccurrenceColumn::Date,
        OccurrenceColumn::Revision,
        OccurrenceColumn::Buildname,
    ];

    fn name(self) -> &'static str {
        match self {
            OccurrenceColumn::Date => "date",
            OccurrenceColumn::Revision => "revision",
            OccurrenceColumn::Buildname => "buildname",
        }
    }

    fn description(self) -> &'static str {
        match self {
            OccurrenceColumn::Date => "when the occurrence was recorded",
            OccurrenceColumn::Revision => "revision the failing build ran against",
            OccurrenceColumn::Buildname => "build configuration name",
        }
    }
}

/// Every occurrence of a bug, oldest first.
pub fn occurrences_table(record: &BugRecord) -> Table<OccurrenceColumn> {
    let mut table = Table::new();
    for occurrence in record.occurrences_by_time() {
        table.add_row(HashMap::from([
            (OccurrenceColumn::Date, Cell::from(occurrence.timestamp)),
            (
                OccurrenceColumn::Revision,
                Cell::from(occurrence.revision.as_str()),
            ),
            (
                OccurrenceColumn::Buildname,
                Cell::from(occurrence.buildname.as_str()),
            ),
        ]));
    }
    table
}
