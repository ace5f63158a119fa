//! Persistence of the raw-bugs document.
//!
//! One flat JSON file, fully read and fully rewritten. Writes go to a
//! temporary file in the destination directory and replace the target
//! atomically, so an interrupted `fw update` leaves the previous
//! snapshot intact. The schema version is checked on every load and
//! anything else is rejected; there is no migration.

use std::fs;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::config::BuildnameFilter;
use crate::models::{DATA_VERSION, RawBugs};
use crate::{Error, Result};

/// Load the document from `path`.
///
/// When a `filter` is given, occurrences whose buildname it rejects
/// are dropped while loading. Bugs left without any occurrence are
/// dropped as well unless `keep_empty` is set - `fw update` keeps them
/// so their `last_change_time` can short-circuit the next fetch.
pub fn load_bugs(
    path: &Path,
    filter: Option<&BuildnameFilter>,
    keep_empty: bool,
) -> Result<RawBugs> {
    let text = fs::read_to_string(path).map_err(|source| Error::Load {
        path: path.to_path_buf(),
        source,
    })?;
    let mut doc: RawBugs = serde_json::from_str(&text)?;

    if doc.metadata.version != DATA_VERSION {
        return Err(Error::IncompatibleData {
            found: doc.metadata.version,
            expected: DATA_VERSION.to_string(),
        });
    }

    if let Some(filter) = filter {
        for record in doc.bugs.values_mut() {
            record
                .intermittents
                .retain(|o| filter.is_match(&o.buildname));
        }
    }
    if !keep_empty {
        doc.bugs.retain(|_, record| !record.intermittents.is_empty());
    }
    Ok(doc)
}

/// Write the document to `path`, replacing any previous snapshot.
pub fn save_bugs(doc: &RawBugs, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&file, doc)?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
