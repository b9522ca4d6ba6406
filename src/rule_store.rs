//! Persistent, ordered store of folder rules.
//!
//! Rules are kept in insertion order (the first matching rule wins) and are
//! written to a JSON file after every mutation. Writes go to a `.tmp`
//! sibling first; the previous file is copied to a `.bak` sibling and the
//! temporary file then replaces the main file with a single rename.
//!
//! # File format
//!
//! ```json
//! [
//!   { "name": "Images", "path": "/abs/path/Images", "exts": [".jpg", ".png"] }
//! ]
//! ```
//!
//! Loading tries the main file, then the backup, then settles for an empty
//! store. It never fails; degraded loads are reported through `tracing`
//! and the returned [`LoadSource`].

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::rule::{FolderRule, RuleId, display_name, normalize_extension, parse_extensions};

/// On-disk shape of a single rule.
#[derive(Debug, Serialize)]
struct RuleRecord {
    name: String,
    path: PathBuf,
    exts: BTreeSet<String>,
}

impl RuleRecord {
    /// Decodes one rule object field by field.
    ///
    /// Missing fields, and fields of the wrong type, fall back to empty
    /// values; non-string items of `exts` are dropped. Unknown fields are
    /// ignored.
    fn from_object(object: &Map<String, Value>) -> Self {
        let text = |key: &str| object.get(key).and_then(Value::as_str).unwrap_or_default();
        let exts = object
            .get("exts")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default();

        Self {
            name: text("name").to_owned(),
            path: PathBuf::from(text("path")),
            exts,
        }
    }
}

/// Which file a [`RuleStore::load`] ended up reading from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The main rules file was read.
    Main,
    /// The main file was unusable; rules were recovered from the backup.
    Backup,
    /// Neither file was usable; the store starts empty.
    Empty,
}

/// Why a rules file could not be used.
#[derive(Error, Debug)]
enum ReadFailure {
    #[error("file does not exist")]
    Missing,
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("file is empty")]
    Empty,
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a list of rules, found {0}")]
    NotAList(&'static str),
}

/// Ordered collection of [`FolderRule`]s backed by a JSON file.
///
/// The store is the only owner of the rule sequence. Other components get
/// read-only access through [`RuleStore::rules`]; all mutation goes through
/// [`add`](RuleStore::add), [`edit`](RuleStore::edit) and
/// [`remove`](RuleStore::remove), each of which persists immediately.
#[derive(Debug)]
pub struct RuleStore {
    path: PathBuf,
    rules: Vec<FolderRule>,
    loaded: bool,
    last_id: u64,
}

impl RuleStore {
    /// Creates an empty, not yet loaded store for the given rules file.
    ///
    /// Saving is refused until [`load`](Self::load) has run, so an empty
    /// store can never overwrite rules that are already on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rules: Vec::new(),
            loaded: false,
            last_id: 0,
        }
    }

    /// Creates a store and loads it from `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(path);
        store.load();
        store
    }

    /// Path of the main rules file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the backup holding the previous successful write.
    pub fn backup_path(&self) -> PathBuf {
        sibling(&self.path, "bak")
    }

    /// Path of the transient file used while saving.
    pub fn temp_path(&self) -> PathBuf {
        sibling(&self.path, "tmp")
    }

    /// Whether [`load`](Self::load) has completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The live rule sequence, in match order.
    pub fn rules(&self) -> &[FolderRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Looks up a rule by id.
    pub fn get(&self, id: RuleId) -> Option<&FolderRule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Resolves a rule id to its current position in the sequence.
    pub fn position(&self, id: RuleId) -> Option<usize> {
        self.rules.iter().position(|rule| rule.id == id)
    }

    /// Finds the rule whose destination is exactly `path`.
    pub fn find_by_path(&self, path: &Path) -> Option<RuleId> {
        self.rules
            .iter()
            .find(|rule| rule.path == path)
            .map(FolderRule::id)
    }

    /// Appends a rule for `path` and persists the store.
    ///
    /// The display name is derived from the last path segment. Extensions
    /// are normalized again on the way in.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicatePath`] without touching the sequence if
    /// a rule for `path` already exists, and [`StoreError::NonUtf8Path`] if
    /// `path` cannot be written to the rules file. Returns a write error if
    /// persisting fails; the rule then stays in memory.
    pub fn add(
        &mut self,
        path: impl Into<PathBuf>,
        exts: BTreeSet<String>,
    ) -> StoreResult<FolderRule> {
        let path = path.into();
        if path.to_str().is_none() {
            return Err(StoreError::NonUtf8Path { path });
        }
        if self.find_by_path(&path).is_some() {
            return Err(StoreError::DuplicatePath { path });
        }

        let exts = exts
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| !ext.is_empty())
            .collect();
        let id = self.allocate_id();
        let rule = FolderRule::new(id, display_name(&path), path, exts);
        info!(rule = %rule.name, path = %rule.path.display(), "Added folder rule");
        self.rules.push(rule.clone());

        self.save()?;
        Ok(rule)
    }

    /// Replaces the extensions of a rule with those parsed from `text`.
    ///
    /// The resulting set may be empty.
    pub fn edit(&mut self, id: RuleId, text: &str) -> StoreResult<()> {
        let index = self.position(id).ok_or(StoreError::UnknownRule(id))?;
        let rule = &mut self.rules[index];
        rule.exts = parse_extensions(text);
        info!(rule = %rule.name, exts = ?rule.exts, "Edited folder rule");

        self.save()
    }

    /// Removes a rule and persists the store, returning the removed rule.
    pub fn remove(&mut self, id: RuleId) -> StoreResult<FolderRule> {
        let index = self.position(id).ok_or(StoreError::UnknownRule(id))?;
        let rule = self.rules.remove(index);
        info!(rule = %rule.name, path = %rule.path.display(), "Removed folder rule");

        self.save()?;
        Ok(rule)
    }

    /// Writes the rules to disk.
    ///
    /// Sequence: write the `.tmp` sibling, copy the current main file (if
    /// any) over the `.bak` sibling, then rename the temporary file onto the
    /// main file. A failure at any step leaves the previously committed main
    /// file as it was.
    ///
    /// Does nothing (apart from a warning) before the store has been loaded.
    pub fn save(&self) -> StoreResult<()> {
        if !self.loaded {
            warn!(path = %self.path.display(), "Skipping save: rules not loaded yet");
            return Ok(());
        }

        let records: Vec<RuleRecord> = self
            .rules
            .iter()
            .map(|rule| RuleRecord {
                name: rule.name.clone(),
                path: rule.path.clone(),
                exts: rule.exts.clone(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&records)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp_path = self.temp_path();
        if let Err(source) = write_synced(&temp_path, json.as_bytes()) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Write {
                path: temp_path,
                source,
            });
        }

        if self.path.exists() {
            let backup_path = self.backup_path();
            if let Err(source) = fs::copy(&self.path, &backup_path) {
                let _ = fs::remove_file(&temp_path);
                return Err(StoreError::Write {
                    path: backup_path,
                    source,
                });
            }
        }

        if let Err(source) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Write {
                path: self.path.clone(),
                source,
            });
        }

        debug!(path = %self.path.display(), rules = self.rules.len(), "Saved folder rules");
        Ok(())
    }

    /// Loads rules from disk, replacing the in-memory sequence.
    ///
    /// Tries the main file, then the backup. A file counts as unusable when
    /// it is missing, empty, not valid JSON or not a JSON list. Entries that
    /// are not objects are skipped; within an object, missing or mistyped
    /// fields become empty. When both files are unusable the store becomes
    /// empty.
    pub fn load(&mut self) -> LoadSource {
        let backup_path = self.backup_path();

        let (source, records) = match read_rules_file(&self.path) {
            Ok(records) => (LoadSource::Main, records),
            Err(main_failure) => {
                report_failure(&self.path, &main_failure);
                match read_rules_file(&backup_path) {
                    Ok(records) => {
                        warn!(
                            path = %backup_path.display(),
                            "Recovered folder rules from backup"
                        );
                        (LoadSource::Backup, records)
                    }
                    Err(backup_failure) => {
                        report_failure(&backup_path, &backup_failure);
                        (LoadSource::Empty, Vec::new())
                    }
                }
            }
        };

        self.rules.clear();
        for record in records {
            let exts = record
                .exts
                .iter()
                .map(|ext| normalize_extension(ext))
                .filter(|ext| !ext.is_empty())
                .collect();
            let id = self.allocate_id();
            self.rules
                .push(FolderRule::new(id, record.name, record.path, exts));
        }
        self.loaded = true;

        info!(
            path = %self.path.display(),
            rules = self.rules.len(),
            source = ?source,
            "Loaded folder rules"
        );
        source
    }

    fn allocate_id(&mut self) -> RuleId {
        self.last_id += 1;
        RuleId(self.last_id)
    }
}

/// Appends `.suffix` to the full file name, e.g. `rules.json` -> `rules.json.bak`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn report_failure(path: &Path, failure: &ReadFailure) {
    match failure {
        ReadFailure::Missing => debug!(path = %path.display(), "No rules file"),
        other => warn!(path = %path.display(), error = %other, "Failed to load rules"),
    }
}

fn read_rules_file(path: &Path) -> Result<Vec<RuleRecord>, ReadFailure> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ReadFailure::Missing),
        Err(e) => return Err(e.into()),
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(ReadFailure::Empty);
    }

    let items = match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => items,
        Value::Object(_) => return Err(ReadFailure::NotAList("an object")),
        Value::String(_) => return Err(ReadFailure::NotAList("a string")),
        Value::Number(_) => return Err(ReadFailure::NotAList("a number")),
        Value::Bool(_) => return Err(ReadFailure::NotAList("a boolean")),
        Value::Null => return Err(ReadFailure::NotAList("null")),
    };

    let records = items
        .iter()
        .filter_map(|item| match item.as_object() {
            Some(object) => Some(RuleRecord::from_object(object)),
            None => {
                warn!(path = %path.display(), "Skipping rule entry that is not an object");
                None
            }
        })
        .collect();

    Ok(records)
}
