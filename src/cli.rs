//! Command-line front end.
//!
//! This module handles everything between parsed arguments and the core:
//! - Loading the rule store and reporting degraded loads
//! - Rule management (add, edit, remove, list)
//! - Sorting files and directories, with a progress bar and summary
//! - Dry runs

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::error::{SortError, StoreError};
use crate::output::OutputFormatter;
use crate::rule::{RuleId, parse_extensions};
use crate::rule_store::{LoadSource, RuleStore};
use crate::sorter::Sorter;

/// A command to execute against the rules file.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List folder rules in match order
    List,

    /// Add a destination folder
    Add {
        /// Destination folder (created on demand when sorting)
        folder: PathBuf,

        /// Allowed extensions, comma-separated (e.g. "jpg, png, pdf")
        #[arg(short, long, default_value = "")]
        exts: String,
    },

    /// Replace the allowed extensions of a rule
    Edit {
        /// Rule number from 'list', or its destination folder
        rule: String,

        /// New extensions, comma-separated; empty clears them
        exts: String,
    },

    /// Remove a rule
    Remove {
        /// Rule number from 'list', or its destination folder
        rule: String,
    },

    /// Sort files and/or the files directly inside directories
    Sort {
        /// Files and directories to sort
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Show what would be moved without moving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the location of the rules file
    Path,
}

/// Runs `command` against the rules file at `rules_path`.
///
/// The store is loaded first; a recovery from the backup, or a fall back to
/// an empty store while rule files exist, is reported as a warning.
///
/// # Arguments
///
/// * `command` - The parsed subcommand
/// * `rules_path` - Location of the JSON rules file
///
/// # Errors
///
/// Fails when a rule reference does not resolve, when persisting a change
/// fails, or when a sorted directory cannot be read. Sorting without rules
/// and adding a folder twice only print a warning.
///
/// # Examples
///
/// ```no_run
/// use file_sorter::cli::{Command, run_cli};
/// use std::path::Path;
///
/// run_cli(Command::List, Path::new("/tmp/folder_rules.json")).unwrap();
/// ```
pub fn run_cli(command: Command, rules_path: &Path) -> Result<()> {
    let mut store = open_store(rules_path);

    match command {
        Command::List => {
            OutputFormatter::rule_list(store.rules());
            Ok(())
        }
        Command::Add { folder, exts } => add_rule(&mut store, &folder, &exts),
        Command::Edit { rule, exts } => {
            let id = resolve_rule(&store, &rule)?;
            store
                .edit(id, &exts)
                .with_context(|| format!("Failed to edit rule {}", rule))?;
            if let Some(edited) = store.get(id) {
                OutputFormatter::success(&format!("Updated {}", edited.label()));
            }
            Ok(())
        }
        Command::Remove { rule } => {
            let id = resolve_rule(&store, &rule)?;
            let removed = store
                .remove(id)
                .with_context(|| format!("Failed to remove rule {}", rule))?;
            OutputFormatter::success(&format!("Removed {}", removed.name));
            Ok(())
        }
        Command::Sort { paths, dry_run } => {
            if dry_run {
                sort_dry_run(&store, &paths)
            } else {
                sort(&store, &paths)
            }
        }
        Command::Path => {
            println!("{}", store.path().display());
            Ok(())
        }
    }
}

fn open_store(rules_path: &Path) -> RuleStore {
    let mut store = RuleStore::new(rules_path);
    match store.load() {
        LoadSource::Main => {}
        LoadSource::Backup => OutputFormatter::warning(&format!(
            "{} could not be read; rules were recovered from the backup.",
            rules_path.display()
        )),
        LoadSource::Empty => {
            if rules_path.exists() || store.backup_path().exists() {
                OutputFormatter::warning(&format!(
                    "{} and its backup could not be read; starting with no rules.",
                    rules_path.display()
                ));
            }
        }
    }
    store
}

fn add_rule(store: &mut RuleStore, folder: &Path, exts: &str) -> Result<()> {
    let folder = std::path::absolute(folder)
        .with_context(|| format!("Invalid folder {}", folder.display()))?;

    match store.add(folder, parse_extensions(exts)) {
        Ok(rule) => {
            OutputFormatter::success(&format!("Added {}", rule.label()));
            if rule.exts.is_empty() {
                OutputFormatter::warning(
                    "No extensions given; nothing will be sorted into this folder yet.",
                );
            }
            Ok(())
        }
        Err(StoreError::DuplicatePath { path }) => {
            OutputFormatter::warning(&format!("{} is already configured.", path.display()));
            Ok(())
        }
        Err(e) => Err(e).context("Failed to save folder rules"),
    }
}

/// Resolves a rule reference to an id at the moment of use.
///
/// # Arguments
///
/// * `store` - The loaded rule store
/// * `reference` - A 1-based position as shown by `list`, or a destination
///   folder (as stored, or relative to the current directory)
///
/// # Example
///
/// ```no_run
/// use file_sorter::RuleStore;
/// use file_sorter::cli::resolve_rule;
///
/// let store = RuleStore::open("/tmp/folder_rules.json");
/// let first = resolve_rule(&store, "1").unwrap();
/// let images = resolve_rule(&store, "/home/user/Images").unwrap();
/// ```
pub fn resolve_rule(store: &RuleStore, reference: &str) -> Result<RuleId> {
    if let Ok(number) = reference.parse::<usize>() {
        return match number.checked_sub(1).and_then(|i| store.rules().get(i)) {
            Some(rule) => Ok(rule.id()),
            None => bail!(
                "No rule number {} ({} rules configured)",
                number,
                store.len()
            ),
        };
    }

    let path = Path::new(reference);
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    store
        .find_by_path(path)
        .or_else(|| store.find_by_path(&absolute))
        .with_context(|| format!("No rule for folder {}", reference))
}

fn sort(store: &RuleStore, paths: &[PathBuf]) -> Result<()> {
    let pb = OutputFormatter::create_progress_bar(0);
    let result = Sorter::new(store).sort_paths_with(paths, |progress| {
        pb.set_length(progress.total as u64);
        if let Some(name) = progress.path.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        pb.set_position(progress.done as u64);
    });
    pb.finish_and_clear();

    match result {
        Ok(summary) => {
            OutputFormatter::summary_table(&summary);
            if summary.errored > 0 {
                OutputFormatter::error(
                    "Some files could not be moved. Run with --verbose for details.",
                );
            }
            Ok(())
        }
        Err(SortError::NoRules) => {
            no_rules_notice();
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn sort_dry_run(store: &RuleStore, paths: &[PathBuf]) -> Result<()> {
    match Sorter::new(store).plan(paths) {
        Ok(plan) => {
            OutputFormatter::plan(&plan);
            Ok(())
        }
        Err(SortError::NoRules) => {
            no_rules_notice();
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn no_rules_notice() {
    OutputFormatter::warning(
        "No rules: add at least one folder with allowed extensions first ('file-sorter add <folder> --exts jpg,png').",
    );
}
