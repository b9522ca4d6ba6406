//! Integration tests for file-sorter
//!
//! These tests drive the library the way a front end does: configure rules,
//! persist them, reopen the store and sort real files in a temporary tree.
//!
//! Test categories:
//! 1. Sorting workflows
//! 2. Rule persistence and recovery
//! 3. Command-line commands

use file_sorter::cli::{Command, run_cli};
use file_sorter::{
    LoadSource, RuleStore, SortError, SortSummary, Sorter, StoreError, parse_extensions,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary tree with an `inbox` to sort from, a rules file and room for
/// destination folders.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("inbox")).expect("Failed to create inbox");
        TestFixture { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn inbox(&self) -> PathBuf {
        self.path().join("inbox")
    }

    fn rules_path(&self) -> PathBuf {
        self.path().join("config").join("folder_rules.json")
    }

    fn dest(&self, name: &str) -> PathBuf {
        self.path().join("sorted").join(name)
    }

    fn open_store(&self) -> RuleStore {
        RuleStore::open(self.rules_path())
    }

    /// Create a file with content in the inbox.
    fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let file_path = self.inbox().join(name);
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content.as_bytes())
            .expect("Failed to write file content");
        file_path
    }

    fn create_files(&self, names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|name| self.create_file(name, name)).collect()
    }

    fn assert_file_exists(&self, path: &Path) {
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_file_not_exists(&self, path: &Path) {
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    /// Count regular files directly inside `dir`.
    fn count_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|entry| entry.path().is_file())
                    .count()
            })
            .unwrap_or(0)
    }
}

// ============================================================================
// Test Suite 1: Sorting Workflows
// ============================================================================

#[test]
fn test_sort_directory_by_extension() {
    let fixture = TestFixture::new();
    let mut store = fixture.open_store();
    store
        .add(fixture.dest("D"), parse_extensions(".jpg"))
        .expect("Failed to add rule");
    fixture.create_files(&["a.jpg", "b.unknown", "c.jpg"]);

    let summary = Sorter::new(&store)
        .sort_directory(&fixture.inbox())
        .expect("Sort failed");

    assert_eq!(
        summary,
        SortSummary {
            moved: 2,
            skipped: 1,
            errored: 0
        }
    );
    fixture.assert_file_exists(&fixture.dest("D").join("a.jpg"));
    fixture.assert_file_exists(&fixture.dest("D").join("c.jpg"));
    fixture.assert_file_exists(&fixture.inbox().join("b.unknown"));
}

#[test]
fn test_sort_routes_to_multiple_folders() {
    let fixture = TestFixture::new();
    let mut store = fixture.open_store();
    store
        .add(fixture.dest("Images"), parse_extensions("jpg, PNG, gif"))
        .expect("Failed to add rule");
    store
        .add(fixture.dest("Documents"), parse_extensions("pdf, txt"))
        .expect("Failed to add rule");
    store
        .add(fixture.dest("Music"), parse_extensions("mp3"))
        .expect("Failed to add rule");
    fixture.create_files(&[
        "holiday.JPG",
        "logo.png",
        "thesis.pdf",
        "notes.txt",
        "song.mp3",
        "setup.exe",
        "README",
    ]);

    let summary = Sorter::new(&store)
        .sort_directory(&fixture.inbox())
        .expect("Sort failed");

    assert_eq!(summary.moved, 5);
    assert_eq!(summary.skipped, 2);
    assert_eq!(TestFixture::count_files(&fixture.dest("Images")), 2);
    assert_eq!(TestFixture::count_files(&fixture.dest("Documents")), 2);
    assert_eq!(TestFixture::count_files(&fixture.dest("Music")), 1);
    assert_eq!(TestFixture::count_files(&fixture.inbox()), 2);
}

#[test]
fn test_first_matching_rule_wins() {
    let fixture = TestFixture::new();
    let mut store = fixture.open_store();
    store
        .add(fixture.dest("First"), parse_extensions("jpg"))
        .expect("Failed to add rule");
    store
        .add(fixture.dest("Second"), parse_extensions("jpg, png"))
        .expect("Failed to add rule");
    fixture.create_files(&["a.jpg", "b.png"]);

    Sorter::new(&store)
        .sort_directory(&fixture.inbox())
        .expect("Sort failed");

    fixture.assert_file_exists(&fixture.dest("First").join("a.jpg"));
    fixture.assert_file_exists(&fixture.dest("Second").join("b.png"));
    fixture.assert_file_not_exists(&fixture.dest("Second").join("a.jpg"));
}

#[test]
fn test_repeated_sorts_never_overwrite() {
    let fixture = TestFixture::new();
    let mut store = fixture.open_store();
    store
        .add(fixture.dest("Docs"), parse_extensions("txt"))
        .expect("Failed to add rule");

    for round in 0..3 {
        fixture.create_file("file.txt", &format!("round {round}"));
        Sorter::new(&store)
            .sort_directory(&fixture.inbox())
            .expect("Sort failed");
    }

    let docs = fixture.dest("Docs");
    assert_eq!(fs::read_to_string(docs.join("file.txt")).unwrap(), "round 0");
    assert_eq!(fs::read_to_string(docs.join("file (1).txt")).unwrap(), "round 1");
    assert_eq!(fs::read_to_string(docs.join("file (2).txt")).unwrap(), "round 2");
}

#[test]
fn test_sort_files_ignores_missing_inputs() {
    let fixture = TestFixture::new();
    let mut store = fixture.open_store();
    store
        .add(fixture.dest("Images"), parse_extensions("jpg"))
        .expect("Failed to add rule");
    let mut files = fixture.create_files(&["a.jpg"]);
    files.push(fixture.inbox().join("never-existed.jpg"));
    files.push(fixture.inbox());

    let summary = Sorter::new(&store).sort_files(&files).expect("Sort failed");

    assert_eq!(summary.total(), 1);
    assert_eq!(summary.moved, 1);
}

#[test]
fn test_sort_with_no_rules_moves_nothing() {
    let fixture = TestFixture::new();
    let store = fixture.open_store();
    let files = fixture.create_files(&["a.jpg", "b.pdf"]);

    let sorter = Sorter::new(&store);
    assert!(matches!(
        sorter.sort_directory(&fixture.inbox()),
        Err(SortError::NoRules)
    ));
    assert!(matches!(sorter.sort_files(&files), Err(SortError::NoRules)));

    for file in &files {
        fixture.assert_file_exists(file);
    }
}

#[test]
fn test_rule_with_cleared_extensions_matches_nothing() {
    let fixture = TestFixture::new();
    let mut store = fixture.open_store();
    let id = store
        .add(fixture.dest("Images"), parse_extensions("jpg"))
        .expect("Failed to add rule")
        .id();
    store.edit(id, "").expect("Failed to edit rule");
    fixture.create_files(&["a.jpg"]);

    let summary = Sorter::new(&store)
        .sort_directory(&fixture.inbox())
        .expect("Sort failed");

    assert_eq!(summary.skipped, 1);
    fixture.assert_file_not_exists(&fixture.dest("Images"));
}

// ============================================================================
// Test Suite 2: Rule Persistence and Recovery
// ============================================================================

#[test]
fn test_rules_survive_restart() {
    let fixture = TestFixture::new();
    {
        let mut store = fixture.open_store();
        store
            .add(fixture.dest("Images"), parse_extensions("png, jpg"))
            .expect("Failed to add rule");
        store
            .add(fixture.dest("Docs"), parse_extensions("pdf"))
            .expect("Failed to add rule");
    }

    let mut store = RuleStore::new(fixture.rules_path());
    assert_eq!(store.load(), LoadSource::Main);
    let labels: Vec<String> = store.rules().iter().map(|r| r.label()).collect();
    assert_eq!(labels, vec!["Images  [ .jpg, .png ]", "Docs  [ .pdf ]"]);
}

#[test]
fn test_persisted_file_format() {
    let fixture = TestFixture::new();
    let mut store = fixture.open_store();
    store
        .add(fixture.dest("Images"), parse_extensions("png, jpg"))
        .expect("Failed to add rule");

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fixture.rules_path()).unwrap()).unwrap();
    assert_eq!(
        raw,
        serde_json::json!([{
            "name": "Images",
            "path": fixture.dest("Images"),
            "exts": [".jpg", ".png"],
        }])
    );
    assert!(!store.temp_path().exists());
}

#[test]
fn test_corrupt_rules_recovered_from_backup() {
    let fixture = TestFixture::new();
    let mut store = fixture.open_store();
    store
        .add(fixture.dest("Images"), parse_extensions("jpg"))
        .expect("Failed to add rule");
    store
        .add(fixture.dest("Docs"), parse_extensions("pdf"))
        .expect("Failed to add rule");

    // Simulate a crash that truncated the main file.
    fs::write(fixture.rules_path(), "[{\"name\": \"Ima").expect("Failed to corrupt");

    let mut recovered = RuleStore::new(fixture.rules_path());
    assert_eq!(recovered.load(), LoadSource::Backup);
    // The backup holds the state before the last write.
    assert_eq!(recovered.len(), 1);
    assert_eq!(recovered.rules()[0].name, "Images");

    // Saving again repairs the main file.
    recovered
        .add(fixture.dest("Music"), parse_extensions("mp3"))
        .expect("Failed to add rule");
    let mut reopened = RuleStore::new(fixture.rules_path());
    assert_eq!(reopened.load(), LoadSource::Main);
    assert_eq!(reopened.len(), 2);
}

#[test]
fn test_duplicate_destination_rejected() {
    let fixture = TestFixture::new();
    let mut store = fixture.open_store();
    store
        .add(fixture.dest("Images"), parse_extensions("jpg"))
        .expect("Failed to add rule");

    let result = store.add(fixture.dest("Images"), parse_extensions("png"));
    assert!(matches!(result, Err(StoreError::DuplicatePath { .. })));

    let reopened = fixture.open_store();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.rules()[0].exts, parse_extensions("jpg"));
}

#[test]
fn test_remove_then_edit_targets_the_right_rule() {
    let fixture = TestFixture::new();
    let mut store = fixture.open_store();
    let ids: Vec<_> = ["A", "B", "C"]
        .iter()
        .map(|name| {
            store
                .add(fixture.dest(name), parse_extensions(name))
                .expect("Failed to add rule")
                .id()
        })
        .collect();

    store.remove(ids[0]).expect("Failed to remove rule");
    store.edit(ids[2], "zip").expect("Failed to edit rule");

    let reopened = fixture.open_store();
    let rules: Vec<_> = reopened
        .rules()
        .iter()
        .map(|r| (r.name.clone(), r.extensions_text()))
        .collect();
    assert_eq!(
        rules,
        vec![
            ("B".to_string(), "b".to_string()),
            ("C".to_string(), "zip".to_string())
        ]
    );
}

// ============================================================================
// Test Suite 3: Command-Line Commands
// ============================================================================

#[test]
fn test_cli_add_edit_remove_cycle() {
    let fixture = TestFixture::new();
    let rules_path = fixture.rules_path();
    let images = fixture.dest("Images");

    run_cli(
        Command::Add {
            folder: images.clone(),
            exts: "jpg, png".to_string(),
        },
        &rules_path,
    )
    .expect("Add failed");
    run_cli(
        Command::Edit {
            rule: "1".to_string(),
            exts: "gif".to_string(),
        },
        &rules_path,
    )
    .expect("Edit failed");

    let store = fixture.open_store();
    assert_eq!(store.rules()[0].exts, parse_extensions("gif"));

    run_cli(
        Command::Remove {
            rule: images.to_string_lossy().into_owned(),
        },
        &rules_path,
    )
    .expect("Remove failed");
    assert!(fixture.open_store().is_empty());
}

#[test]
fn test_cli_remove_unknown_rule_fails() {
    let fixture = TestFixture::new();
    let result = run_cli(
        Command::Remove {
            rule: "4".to_string(),
        },
        &fixture.rules_path(),
    );
    assert!(result.is_err());
}

#[test]
fn test_cli_sort_and_dry_run() {
    let fixture = TestFixture::new();
    let rules_path = fixture.rules_path();
    run_cli(
        Command::Add {
            folder: fixture.dest("Images"),
            exts: "jpg".to_string(),
        },
        &rules_path,
    )
    .expect("Add failed");
    let loose = fixture.path().join("loose.jpg");
    fs::write(&loose, "x").expect("Failed to write file");
    fixture.create_files(&["a.jpg", "b.txt"]);

    run_cli(
        Command::Sort {
            paths: vec![fixture.inbox(), loose.clone()],
            dry_run: true,
        },
        &rules_path,
    )
    .expect("Dry run failed");
    fixture.assert_file_exists(&fixture.inbox().join("a.jpg"));
    fixture.assert_file_exists(&loose);

    run_cli(
        Command::Sort {
            paths: vec![fixture.inbox(), loose.clone()],
            dry_run: false,
        },
        &rules_path,
    )
    .expect("Sort failed");
    fixture.assert_file_exists(&fixture.dest("Images").join("a.jpg"));
    fixture.assert_file_exists(&fixture.dest("Images").join("loose.jpg"));
    fixture.assert_file_exists(&fixture.inbox().join("b.txt"));
}

#[test]
fn test_cli_sort_without_rules_is_not_an_error() {
    let fixture = TestFixture::new();
    let files = fixture.create_files(&["a.jpg"]);

    run_cli(
        Command::Sort {
            paths: files.clone(),
            dry_run: false,
        },
        &fixture.rules_path(),
    )
    .expect("Sort without rules should report, not fail");
    fixture.assert_file_exists(&files[0]);
}
