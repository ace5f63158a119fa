//! Flakewatch - intermittent test failure triage for humans.
//!
//! This library provides the core functionality for the `fw` CLI tool:
//! a local snapshot of intermittent-failure bugs pulled from the bug
//! tracker, tabular views over it, and build re-triggering for the
//! oldest recorded occurrence.

pub mod bugzilla;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod report;
pub mod storage;
pub mod table;
pub mod trigger;

use std::path::PathBuf;

/// Library-level error type for Flakewatch operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unable to load bug data from {path}: {source}")]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "stored bug data has version {found} but {expected} is required - \
         run `fw update` to regenerate it"
    )]
    IncompatibleData { found: String, expected: String },

    #[error("bad sort key: unknown column {0:?}")]
    UnknownColumn(String),

    #[error("unable to find bug {0}")]
    BugNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Flakewatch operations.
pub type Result<T> = std::result::Result<T, Error>;
