//! file-sorter - move files into folders chosen by extension rules
//!
//! This library keeps an ordered, persisted list of folder rules (each a
//! destination folder plus the file extensions routed to it) and sorts
//! files by moving each one into the folder of the first rule that claims
//! its extension.

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod rule;
pub mod rule_store;
pub mod sorter;

pub use config::Settings;
pub use error::{ConfigError, SortError, StoreError};
pub use rule::{FolderRule, RuleId, normalize_extension, parse_extensions};
pub use rule_store::{LoadSource, RuleStore};
pub use sorter::{
    MoveOutcome, PlannedMove, SortProgress, SortSummary, Sorter, resolve_name_collision,
};

pub use cli::{Command, run_cli};
