//! Error types for rule persistence, sorting and settings.

use std::path::PathBuf;
use thiserror::Error;

use crate::rule::RuleId;

/// Errors raised by [`RuleStore`](crate::RuleStore) mutations and writes.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A rule with this destination already exists; nothing was changed.
    #[error("A rule for {path} already exists")]
    DuplicatePath { path: PathBuf },

    /// The destination is not valid UTF-8 and cannot be stored in the rules file.
    #[error("{path} is not a valid UTF-8 path")]
    NonUtf8Path { path: PathBuf },

    /// The rule id does not resolve to a live rule.
    #[error("No rule with id {0}")]
    UnknownRule(RuleId),

    #[error("Failed to serialize rules: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing, backing up or replacing the rules file failed.
    #[error("Failed to write rules file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for rule store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the sorter.
#[derive(Error, Debug)]
pub enum SortError {
    /// There are no folder rules to match against.
    #[error("No folder rules configured; add at least one folder with allowed extensions first")]
    NoRules,

    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} has no file name")]
    NoFileName(PathBuf),
}

/// Result type for sorter operations.
pub type SortResult<T> = Result<T, SortError>;

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested settings file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    Invalid {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// No platform data directory could be determined for the rules file.
    #[error("Could not determine a data directory for the rules file")]
    NoDataDir,
}
