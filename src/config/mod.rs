//! Configuration for Flakewatch.
//!
//! A single TOML file (default `flakewatch.toml`) holds the listing
//! and filtering options; `fw generate-conf` writes a commented
//! template. Every recognized option is a typed field with an explicit
//! default, and unknown keys are rejected at parse time.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default commented configuration, written by `fw generate-conf`.
///
/// The values spelled out here match [`Config::default`]; a test keeps
/// them in sync.
pub const DEFAULT_CONF: &str = r#"# Flakewatch configuration.

# Minimum number of recorded occurrences required to list a bug.
min_intermittents = 10

# Also list bugs whose status is RESOLVED.
show_resolved = false

# Also list bugs that are assigned to someone.
show_assigned_to = false

# Products to exclude from the listing.
filter_products = []

# Columns of the list output, in display order.
# Run `fw list-columns` for the available columns.
visible_columns = ["id", "nb", "date", "product"]

# One regular expression per line; occurrences whose buildname matches
# any of them are kept when loading stored data. Leave empty to keep
# every occurrence.
intermittents_filter_buildname = """
"""
"#;

/// Recognized configuration options, one typed field each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Minimum occurrence count for a bug to be listed.
    pub min_intermittents: u32,

    /// List RESOLVED bugs too.
    pub show_resolved: bool,

    /// List assigned bugs too.
    pub show_assigned_to: bool,

    /// Products excluded from the listing.
    pub filter_products: BTreeSet<String>,

    /// Columns shown by `fw list`, in order.
    pub visible_columns: Vec<String>,

    /// Multiline list of buildname regexes applied when loading stored
    /// data; empty keeps everything.
    pub intermittents_filter_buildname: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_intermittents: 10,
            show_resolved: false,
            show_assigned_to: false,
            filter_products: BTreeSet::new(),
            visible_columns: vec![
                "id".to_string(),
                "nb".to_string(),
                "date".to_string(),
                "product".to_string(),
            ],
            intermittents_filter_buildname: String::new(),
        }
    }
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.visible_columns.is_empty() {
            return Err(Error::Config(
                "visible_columns must name at least one column".to_string(),
            ));
        }
        Ok(())
    }

    /// Compile the buildname filter from the multiline regex list.
    pub fn buildname_filter(&self) -> Result<BuildnameFilter> {
        BuildnameFilter::parse(&self.intermittents_filter_buildname)
    }
}

/// Compiled buildname filter: one regex per non-empty line.
///
/// An empty pattern list keeps every occurrence; otherwise an
/// occurrence is kept when its buildname matches any pattern.
#[derive(Debug, Default)]
pub struct BuildnameFilter {
    patterns: Vec<Regex>,
}

impl BuildnameFilter {
    pub fn parse(lines: &str) -> Result<Self> {
        let mut patterns = Vec::new();
        for line in lines.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let pattern = Regex::new(line).map_err(|e| {
                Error::Config(format!("invalid buildname pattern {line:?}: {e}"))
            })?;
            patterns.push(pattern);
        }
        Ok(Self { patterns })
    }

    pub fn is_match(&self, buildname: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(buildname))
    }
}

/// Write the default configuration template to `path`.
///
/// Refuses to overwrite an existing file.
pub fn generate_conf(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::InvalidInput(format!(
            "{} already exists, not overwriting it",
            path.display()
        )));
    }
    fs::write(path, DEFAULT_CONF)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_matches_default_config() {
        let parsed: Config = toml::from_str(DEFAULT_CONF).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = toml::from_str::<Config>("min_intermitents = 3\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str("min_intermittents = 1\n").unwrap();
        assert_eq!(config.min_intermittents, 1);
        assert!(!config.show_resolved);
        assert_eq!(config.visible_columns, Config::default().visible_columns);
    }

    #[test]
    fn test_buildname_filter_empty_keeps_everything() {
        let filter = BuildnameFilter::parse("\n  \n").unwrap();
        assert!(filter.is_match("anything at all"));
    }

    #[test]
    fn test_buildname_filter_keeps_matching_lines() {
        let filter = BuildnameFilter::parse("mochitest\n^Windows .* debug$\n").unwrap();
        assert!(filter.is_match("Ubuntu VM 12.04 opt test mochitest-1"));
        assert!(filter.is_match("Windows 7 32-bit debug"));
        assert!(!filter.is_match("Ubuntu VM 12.04 opt test reftest"));
    }

    #[test]
    fn test_buildname_filter_invalid_pattern() {
        let err = BuildnameFilter::parse("[unclosed\n").unwrap_err();
        assert!(err.to_string().contains("invalid buildname pattern"));
    }

    #[test]
    fn test_generate_conf_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flakewatch.toml");

        generate_conf(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONF);

        let err = generate_conf(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_empty_visible_columns_rejected() {
        let config: Config = toml::from_str("visible_columns = []\n").unwrap();
        assert!(config.validate().is_err());
    }
}
