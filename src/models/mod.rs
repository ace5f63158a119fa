//! Data model for the stored intermittent-bug snapshot.
//!
//! The snapshot is a versioned JSON document: a `metadata` block
//! carrying the schema version and a map from bug id to bug record.
//! It is created by the bug finder, persisted by the storage layer,
//! reloaded per command invocation, and discarded at process exit.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Schema version of the persisted document. Loading rejects any other
/// version; there is no migration.
pub const DATA_VERSION: &str = "1.0";

/// Fixed wire format for occurrence timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Serde adapter for [`TIMESTAMP_FORMAT`] timestamps.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).map_err(de::Error::custom)
    }
}

/// The versioned raw-bugs document.
///
/// Bug ids map sorted (`BTreeMap`) so dumps are byte-stable across
/// runs with identical content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBugs {
    pub metadata: Metadata,
    pub bugs: BTreeMap<String, BugRecord>,
}

impl RawBugs {
    /// An empty document at the current schema version.
    pub fn new() -> Self {
        Self {
            metadata: Metadata {
                version: DATA_VERSION.to_string(),
            },
            bugs: BTreeMap::new(),
        }
    }

    pub fn get(&self, bug_id: &str) -> Option<&BugRecord> {
        self.bugs.get(bug_id)
    }

    pub fn len(&self) -> usize {
        self.bugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bugs.is_empty()
    }
}

impl Default for RawBugs {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: String,
}

/// One tracker-side bug aggregating its recorded occurrences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugRecord {
    pub status: String,
    pub assigned_to: String,
    pub product: String,
    /// Opaque tracker timestamp, compared by literal string equality
    /// to decide whether a previous record can be reused on update.
    pub last_change_time: String,
    pub intermittents: Vec<Occurrence>,
}

impl BugRecord {
    /// Occurrences sorted by timestamp ascending (stable, so equal
    /// timestamps keep their recorded order).
    pub fn occurrences_by_time(&self) -> Vec<&Occurrence> {
        let mut sorted: Vec<&Occurrence> = self.intermittents.iter().collect();
        sorted.sort_by_key(|o| o.timestamp);
        sorted
    }

    /// The oldest recorded occurrence, if any.
    pub fn oldest(&self) -> Option<&Occurrence> {
        self.intermittents.iter().min_by_key(|o| o.timestamp)
    }
}

/// One recorded instance of a test failing intermittently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub revision: String,
    pub buildname: String,
}
