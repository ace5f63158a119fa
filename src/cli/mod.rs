//! CLI argument definitions for Flakewatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default path of the stored intermittent bugs data.
pub const DEFAULT_DATA_FILE: &str = "intermittents.json";

/// Default path of the configuration file.
pub const DEFAULT_CONF_FILE: &str = "flakewatch.toml";

/// Flakewatch - triage intermittent test failures and re-trigger builds.
#[derive(Parser, Debug)]
#[command(name = "fw")]
#[command(author, version, about = "Triage intermittent test failures and re-trigger builds", long_about = None)]
pub struct Cli {
    /// Path of the configuration file.
    /// Can also be set via the FW_CONF_FILE environment variable.
    #[arg(
        long = "conf-file",
        global = true,
        env = "FW_CONF_FILE",
        default_value = DEFAULT_CONF_FILE
    )]
    pub conf_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find intermittent bugs in the tracker and store them locally
    ///
    /// Queries the bug tracker for intermittent-failure bugs and stores
    /// the result in a local file so the data can be reused by the
    /// other commands. Bugs unchanged since the previous run are reused
    /// without re-fetching their comments.
    Update {
        /// File to store the intermittent bugs data
        #[arg(short, long, default_value = DEFAULT_DATA_FILE)]
        output: PathBuf,

        /// Number of days from now to search bugs for
        #[arg(short = 'd', long, default_value_t = 27)]
        days_ago: i64,
    },

    /// List stored bugs
    ///
    /// Orders and filters the stored intermittent bugs to surface the
    /// most important ones. Filtering (minimum occurrences, products,
    /// assignment, resolution) comes from the configuration file.
    List {
        /// File path where bugs data is stored
        #[arg(short, long, default_value = DEFAULT_DATA_FILE)]
        input: PathBuf,

        /// Sort criteria: comma-separated column names, each optionally
        /// prefixed with '-' for descending order (see `fw list-columns`)
        #[arg(short, long, default_value = "-nb,id", allow_hyphen_values = true)]
        sort_by: String,

        /// Limit the number of bugs shown (0 means no limit)
        #[arg(short, long, default_value_t = 0)]
        limit: usize,
    },

    /// Describe the columns available to `list`
    ListColumns,

    /// Show details of one stored bug
    ///
    /// Prints the oldest recorded occurrence and a summary of the
    /// bug's occurrences per build name.
    Show {
        /// File path where bugs data is stored
        #[arg(short, long, default_value = DEFAULT_DATA_FILE)]
        input: PathBuf,

        /// List every occurrence instead of the per-build summary
        #[arg(short, long)]
        full: bool,

        /// Bug id to show
        bugid: String,
    },

    /// Trigger builds for the oldest occurrence of a bug
    ///
    /// Example: `fw trigger --times 20 12345 15` triggers 20 builds of
    /// the 15th revision before the oldest one recorded in bug 12345.
    Trigger {
        /// File path where bugs data is stored
        #[arg(short, long, default_value = DEFAULT_DATA_FILE)]
        input: PathBuf,

        /// Number of builds to trigger for the revision
        #[arg(short, long, default_value_t = 30)]
        times: u32,

        /// Build name to trigger instead of the recorded one
        #[arg(short, long)]
        buildname: Option<String>,

        /// Resolve everything but push no actual trigger request
        #[arg(long)]
        dry_run: bool,

        /// Bug id to trigger builds for
        bugid: String,

        /// Number of revisions to go back from the oldest occurrence
        #[arg(allow_negative_numbers = true)]
        back_revisions: i64,
    },

    /// Write a default configuration file
    GenerateConf {
        /// Where to write the configuration file
        #[arg(default_value = DEFAULT_CONF_FILE)]
        path: PathBuf,
    },
}
