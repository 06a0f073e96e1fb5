use std::fs;

use pagewatch_core::{fingerprint, PersistedSnapshot, ResourceStateStore, SubscriptionBook};
use pagewatch_engine::{AtomicFileWriter, PersistError, SnapshotFile};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn sample_snapshot() -> PersistedSnapshot {
    let mut book = SubscriptionBook::new();
    book.subscribe("1", "http://a").unwrap();
    let mut resources = ResourceStateStore::new();
    resources.update("http://a", fingerprint("hello"), "hello".into());
    PersistedSnapshot::capture(&book, &resources)
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("doc.json", "hello").unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    let second = writer.write("doc.json", "world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("doc.json", "data").is_err());
    assert!(!file_path.with_file_name("doc.json").exists());
}

#[test]
fn snapshot_round_trips() {
    let temp = TempDir::new().unwrap();
    let file = SnapshotFile::new(temp.path().join("state.json"));

    let snapshot = sample_snapshot();
    file.save(&snapshot).unwrap();
    let loaded = file.load().unwrap();
    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.subscribers["1"], vec!["http://a".to_string()]);
    assert!(loaded.paused.is_empty());
    assert_eq!(loaded.resources["http://a"].content, "hello");
}

#[test]
fn missing_snapshot_loads_empty() {
    let temp = TempDir::new().unwrap();
    let file = SnapshotFile::new(temp.path().join("absent.json"));
    assert!(file.load().unwrap().is_empty());
}

#[test]
fn empty_snapshot_loads_empty() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.json");
    fs::write(&path, "").unwrap();
    assert!(SnapshotFile::new(&path).load().unwrap().is_empty());

    fs::write(&path, "  \n").unwrap();
    assert!(SnapshotFile::new(&path).load().unwrap().is_empty());
}

#[test]
fn load_existing_tells_missing_apart_from_saved() {
    let temp = TempDir::new().unwrap();
    let file = SnapshotFile::new(temp.path().join("state.json"));
    assert_eq!(file.load_existing().unwrap(), None);

    fs::write(file.path(), "\n").unwrap();
    assert_eq!(file.load_existing().unwrap(), None);

    file.save(&sample_snapshot()).unwrap();
    assert_eq!(file.load_existing().unwrap(), Some(sample_snapshot()));
}

#[test]
fn invalid_snapshot_is_corrupt() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.json");
    fs::write(&path, "{ not json").unwrap();

    let err = SnapshotFile::new(&path).load().unwrap_err();
    assert!(matches!(err, PersistError::Corrupt { .. }), "got {err:?}");
}

#[test]
fn save_rotates_previous_file_into_backup() {
    let temp = TempDir::new().unwrap();
    let file = SnapshotFile::new(temp.path().join("state.json"));

    // First save has nothing to back up.
    let first = sample_snapshot();
    file.save(&first).unwrap();
    assert!(!file.backup_path().exists());

    let second = PersistedSnapshot::default();
    file.save(&second).unwrap();

    assert_eq!(file.load().unwrap(), second);
    assert_eq!(file.load_backup().unwrap(), first);
}

#[test]
fn save_creates_missing_parent_directory() {
    let temp = TempDir::new().unwrap();
    let file = SnapshotFile::new(temp.path().join("nested/dir/state.json"));
    file.save(&sample_snapshot()).unwrap();
    assert!(file.path().is_file());
}
