//! Sorting engine that moves files into the folders of matching rules.
//!
//! A file is matched by its extension against the rules of a [`RuleStore`],
//! in store order; the first rule whose extension set contains it wins.
//! The file is then moved into that rule's destination, which is created on
//! demand, under a name that does not clobber anything already there.
//!
//! Batches never abort on a single failure: every file ends up counted as
//! moved, skipped (no rule matched) or errored, and the details of errors
//! go to the log.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{SortError, SortResult};
use crate::rule::{FolderRule, normalize_extension};
use crate::rule_store::RuleStore;

/// Outcome counts of one sort invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSummary {
    /// Files moved into a rule's destination.
    pub moved: usize,
    /// Files whose extension matched no rule.
    pub skipped: usize,
    /// Files that matched a rule but could not be moved.
    pub errored: usize,
}

impl SortSummary {
    /// Total number of files processed.
    pub fn total(&self) -> usize {
        self.moved + self.skipped + self.errored
    }

    fn record(&mut self, outcome: &MoveOutcome) {
        match outcome {
            MoveOutcome::Moved(_) => self.moved += 1,
            MoveOutcome::Skipped => self.skipped += 1,
            MoveOutcome::Errored => self.errored += 1,
        }
    }
}

impl AddAssign for SortSummary {
    fn add_assign(&mut self, other: Self) {
        self.moved += other.moved;
        self.skipped += other.skipped;
        self.errored += other.errored;
    }
}

impl fmt::Display for SortSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sorted: {}, No extension matched: {}, Errors: {}",
            self.moved, self.skipped, self.errored
        )
    }
}

/// What happened to a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The file now lives at the contained path.
    Moved(PathBuf),
    /// No rule matched the file's extension.
    Skipped,
    /// A rule matched but creating the destination or moving failed.
    Errored,
}

/// Progress report handed to a sort observer after each file.
#[derive(Debug, Clone, Copy)]
pub struct SortProgress<'p> {
    /// The file that was just processed.
    pub path: &'p Path,
    pub outcome: &'p MoveOutcome,
    /// Files processed so far, this one included.
    pub done: usize,
    /// Files in the batch.
    pub total: usize,
}

/// A move that a sort would perform, computed without touching any file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    /// Name of the matching rule, if any.
    pub rule: Option<String>,
    /// Collision-free destination, if a rule matched.
    pub destination: Option<PathBuf>,
}

/// Matches files against folder rules and moves them.
///
/// The sorter only reads the rules; it borrows them from the store for its
/// whole lifetime, so the store cannot change under a running sort.
pub struct Sorter<'a> {
    rules: &'a [FolderRule],
}

impl<'a> Sorter<'a> {
    /// Creates a sorter over the rules of `store`.
    pub fn new(store: &'a RuleStore) -> Self {
        Self::from_rules(store.rules())
    }

    /// Creates a sorter over an explicit rule sequence.
    pub fn from_rules(rules: &'a [FolderRule]) -> Self {
        Self { rules }
    }

    /// Returns the first rule, in order, that routes `ext`.
    ///
    /// `ext` is normalized first, so `"JPG"`, `".jpg"` and `"jpg"` are all
    /// equivalent. An empty extension never matches.
    pub fn find_rule_for_extension(&self, ext: &str) -> Option<&'a FolderRule> {
        let ext = normalize_extension(ext);
        if ext.is_empty() {
            return None;
        }
        self.rules.iter().find(|rule| rule.matches(&ext))
    }

    /// Returns the rule matching the extension of `path`.
    pub fn rule_for_file(&self, path: &Path) -> Option<&'a FolderRule> {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy())
            .unwrap_or_default();
        self.find_rule_for_extension(&ext)
    }

    /// Moves one file into the destination of its matching rule.
    pub fn move_one_file(&self, path: &Path) -> MoveOutcome {
        let Some(rule) = self.rule_for_file(path) else {
            debug!(path = %path.display(), "No rule matches file");
            return MoveOutcome::Skipped;
        };

        match move_into(path, &rule.path) {
            Ok(destination) => {
                info!(
                    from = %path.display(),
                    to = %destination.display(),
                    rule = %rule.name,
                    "Moved file"
                );
                MoveOutcome::Moved(destination)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to sort file");
                MoveOutcome::Errored
            }
        }
    }

    /// Sorts the regular files directly inside `dir`.
    ///
    /// Subdirectories are ignored, not descended into.
    ///
    /// # Errors
    ///
    /// [`SortError::NoRules`] if there are no rules (nothing is read or
    /// moved), [`SortError::ReadDir`] if `dir` cannot be listed.
    pub fn sort_directory(&self, dir: &Path) -> SortResult<SortSummary> {
        self.sort_directory_with(dir, |_| {})
    }

    /// Like [`sort_directory`](Self::sort_directory), calling `observer`
    /// after each file.
    pub fn sort_directory_with<F>(&self, dir: &Path, observer: F) -> SortResult<SortSummary>
    where
        F: FnMut(&SortProgress<'_>),
    {
        self.ensure_rules()?;
        let files = directory_files(dir)?;
        info!(dir = %dir.display(), files = files.len(), "Sorting directory");
        Ok(self.run_batch(&files, observer))
    }

    /// Sorts the given files.
    ///
    /// Paths that do not exist or are not regular files are dropped
    /// silently and do not count towards the summary.
    ///
    /// # Errors
    ///
    /// [`SortError::NoRules`] if there are no rules; nothing is moved.
    pub fn sort_files(&self, files: &[PathBuf]) -> SortResult<SortSummary> {
        self.sort_files_with(files, |_| {})
    }

    /// Like [`sort_files`](Self::sort_files), calling `observer` after each file.
    pub fn sort_files_with<F>(&self, files: &[PathBuf], observer: F) -> SortResult<SortSummary>
    where
        F: FnMut(&SortProgress<'_>),
    {
        self.ensure_rules()?;
        let files: Vec<PathBuf> = files.iter().filter(|p| p.is_file()).cloned().collect();
        Ok(self.run_batch(&files, observer))
    }

    /// Sorts a mix of files and directories.
    ///
    /// Regular files are sorted first, then the contents of each directory
    /// in the order given. See [`collect_files`].
    pub fn sort_paths(&self, paths: &[PathBuf]) -> SortResult<SortSummary> {
        self.sort_paths_with(paths, |_| {})
    }

    /// Like [`sort_paths`](Self::sort_paths), calling `observer` after each file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use file_sorter::{RuleStore, Sorter};
    /// use std::path::PathBuf;
    ///
    /// let store = RuleStore::open("/tmp/folder_rules.json");
    /// let summary = Sorter::new(&store)
    ///     .sort_paths_with(&[PathBuf::from("/tmp/inbox")], |progress| {
    ///         println!("{}/{} {}", progress.done, progress.total, progress.path.display());
    ///     })
    ///     .unwrap();
    /// println!("{summary}");
    /// ```
    pub fn sort_paths_with<F>(&self, paths: &[PathBuf], observer: F) -> SortResult<SortSummary>
    where
        F: FnMut(&SortProgress<'_>),
    {
        self.ensure_rules()?;
        let files = collect_files(paths);
        Ok(self.run_batch(&files, observer))
    }

    /// Computes what sorting `paths` would do, without moving anything.
    ///
    /// Destinations account for files already present and for earlier
    /// entries of the same plan.
    pub fn plan(&self, paths: &[PathBuf]) -> SortResult<Vec<PlannedMove>> {
        self.ensure_rules()?;

        let mut reserved: HashSet<PathBuf> = HashSet::new();
        let plan = collect_files(paths)
            .into_iter()
            .map(|source| {
                let rule = self.rule_for_file(&source);
                let destination = match (rule, source.file_name()) {
                    (Some(rule), Some(name)) => {
                        let destination = next_free_name(&rule.path, name, |candidate| {
                            occupied(candidate) || reserved.contains(candidate)
                        });
                        reserved.insert(destination.clone());
                        Some(destination)
                    }
                    _ => None,
                };
                PlannedMove {
                    rule: rule.map(|rule| rule.name.clone()),
                    destination,
                    source,
                }
            })
            .collect();

        Ok(plan)
    }

    fn ensure_rules(&self) -> SortResult<()> {
        if self.rules.is_empty() {
            warn!("Sort requested with no folder rules configured");
            return Err(SortError::NoRules);
        }
        Ok(())
    }

    fn run_batch<F>(&self, files: &[PathBuf], mut observer: F) -> SortSummary
    where
        F: FnMut(&SortProgress<'_>),
    {
        let mut summary = SortSummary::default();
        for (index, file) in files.iter().enumerate() {
            let outcome = self.move_one_file(file);
            summary.record(&outcome);
            observer(&SortProgress {
                path: file,
                outcome: &outcome,
                done: index + 1,
                total: files.len(),
            });
        }
        info!(
            moved = summary.moved,
            skipped = summary.skipped,
            errored = summary.errored,
            "Sort complete"
        );
        summary
    }
}

/// Lists the regular files directly inside `dir`, sorted by path.
pub fn directory_files(dir: &Path) -> SortResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| SortError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Expands mixed input into the files a sort would process.
///
/// Regular files come first, in input order, followed by the files of each
/// directory. Anything else is dropped; unreadable directories are logged
/// and skipped.
pub fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = paths.iter().filter(|p| p.is_file()).cloned().collect();

    for dir in paths.iter().filter(|p| p.is_dir()) {
        match directory_files(dir) {
            Ok(dir_files) => files.extend(dir_files),
            Err(e) => warn!(error = %e, "Skipping directory"),
        }
    }
    files
}

/// Returns a path in `dest_dir` for `filename` that is not taken yet.
///
/// `file.txt` is returned unchanged if free, otherwise `file (1).txt`,
/// `file (2).txt` and so on. Only the last extension counts as suffix, so
/// `a.tar.gz` becomes `a.tar (1).gz`.
///
/// The check and the later move are not atomic; a concurrent writer in the
/// same directory can still win the race.
///
/// # Examples
///
/// ```
/// use file_sorter::resolve_name_collision;
///
/// let dir = tempfile::tempdir().unwrap();
/// assert_eq!(resolve_name_collision(dir.path(), "file.txt"), dir.path().join("file.txt"));
///
/// std::fs::write(dir.path().join("file.txt"), "").unwrap();
/// assert_eq!(resolve_name_collision(dir.path(), "file.txt"), dir.path().join("file (1).txt"));
/// ```
pub fn resolve_name_collision(dest_dir: &Path, filename: impl AsRef<OsStr>) -> PathBuf {
    next_free_name(dest_dir, filename.as_ref(), occupied)
}

fn next_free_name<F>(dest_dir: &Path, filename: &OsStr, taken: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let candidate = dest_dir.join(filename);
    if !taken(&candidate) {
        return candidate;
    }

    let name = Path::new(filename);
    let stem = name.file_stem().unwrap_or(filename);
    let ext = name.extension();

    (1u64..)
        .map(|i| {
            let mut numbered = OsString::from(stem);
            numbered.push(format!(" ({i})"));
            if let Some(ext) = ext {
                numbered.push(".");
                numbered.push(ext);
            }
            dest_dir.join(numbered)
        })
        .find(|candidate| !taken(candidate))
        .unwrap_or(candidate)
}

/// True if anything, including a dangling symlink, sits at `path`.
fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

fn move_into(path: &Path, dest_dir: &Path) -> SortResult<PathBuf> {
    fs::create_dir_all(dest_dir).map_err(|source| SortError::CreateDir {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let file_name = path
        .file_name()
        .ok_or_else(|| SortError::NoFileName(path.to_path_buf()))?;
    let destination = resolve_name_collision(dest_dir, file_name);

    move_file(path, &destination).map_err(|source| SortError::Move {
        from: path.to_path_buf(),
        to: destination.clone(),
        source,
    })?;
    Ok(destination)
}

/// Renames `from` to `to`, copying and deleting when they are on different
/// filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), to = %to.display(), "Rename crosses devices, copying");
            copy_then_remove(from, to)
        }
        Err(e) => Err(e),
    }
}

/// Copies `from` to `to` and deletes `from`. A failed copy removes whatever
/// part of `to` was written.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    if let Err(e) = fs::copy(from, to) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    fs::remove_file(from)
}
