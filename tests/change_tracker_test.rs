//! Change tracking against real files, hashed and persisted through the filesystem adapters.

use std::fs;

use archflow::adapters::fs::fingerprint::Sha256Fingerprinter;
use archflow::adapters::fs::state_store::JsonStateStore;
use archflow::domain::ports::StateStore;
use archflow::domain::state::KbState;
use archflow::domain::tracker::StateTracker;
use tempfile::TempDir;

fn codebase() -> (TempDir, Vec<String>) {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src/Core")).unwrap();
    fs::write(dir.path().join("src/Core/Order.cs"), "class Order {}").unwrap();
    fs::write(dir.path().join("src/Core/Customer.cs"), "class Customer {}").unwrap();
    let files = vec!["src/Core/Order.cs".to_string(), "src/Core/Customer.cs".to_string()];
    (dir, files)
}

#[test]
fn test_persisted_state_round_trip_has_no_changes() {
    let (dir, files) = codebase();
    let fingerprinter = Sha256Fingerprinter::new();
    let tracker = StateTracker::new(dir.path(), &fingerprinter);
    let store = JsonStateStore::new(dir.path().join(".kb/.kb-state.json"));

    let mut state = KbState::new();
    assert_eq!(tracker.update_file_states(&mut state, &files), 2);
    store.save(&state).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded, state);
    let changes = tracker.compute_changes(&files, &reloaded);
    assert!(!changes.has_changes());
}

#[test]
fn test_one_byte_edit_is_modified() {
    let (dir, files) = codebase();
    let fingerprinter = Sha256Fingerprinter::new();
    let tracker = StateTracker::new(dir.path(), &fingerprinter);

    let mut state = KbState::new();
    tracker.update_file_states(&mut state, &files);

    fs::write(dir.path().join("src/Core/Order.cs"), "class Order {}!").unwrap();
    let changes = tracker.compute_changes(&files, &state);
    assert_eq!(changes.modified, vec!["src/Core/Order.cs"]);
    assert!(changes.added.is_empty());
    assert!(changes.deleted.is_empty());
}

#[test]
fn test_added_and_deleted_files() {
    let (dir, files) = codebase();
    let fingerprinter = Sha256Fingerprinter::new();
    let tracker = StateTracker::new(dir.path(), &fingerprinter);

    let mut state = KbState::new();
    tracker.update_file_states(&mut state, &files);

    fs::write(dir.path().join("src/Core/Invoice.cs"), "class Invoice {}").unwrap();
    let current = vec!["src/Core/Order.cs".to_string(), "src/Core/Invoice.cs".to_string()];
    let changes = tracker.compute_changes(&current, &state);

    assert_eq!(changes.added, vec!["src/Core/Invoice.cs"]);
    assert_eq!(changes.deleted, vec!["src/Core/Customer.cs"]);
    assert!(changes.modified.is_empty());
    assert_eq!(changes.all_changed(), vec!["src/Core/Invoice.cs"]);
}

#[test]
fn test_provenance_lookup_after_reload() {
    let (dir, files) = codebase();
    let fingerprinter = Sha256Fingerprinter::new();
    let tracker = StateTracker::new(dir.path(), &fingerprinter);
    let store = JsonStateStore::new(dir.path().join("state.json"));

    let mut state = KbState::new();
    tracker.update_file_states(&mut state, &files);
    tracker.mark_output(&mut state, "flows/create-order.md", vec!["src\\Core\\Order.cs".to_string()]);
    tracker.mark_output(&mut state, "SUMMARY.md", files.clone());
    store.save(&state).unwrap();

    let reloaded = store.load().unwrap();
    let affected = tracker.affected_outputs(&reloaded, &["src/Core/Order.cs".to_string()]);
    assert_eq!(
        affected.into_iter().collect::<Vec<_>>(),
        vec!["SUMMARY.md", "flows/create-order.md"]
    );

    let affected = tracker.affected_outputs(&reloaded, &["src/Core/Customer.cs".to_string()]);
    assert_eq!(affected.into_iter().collect::<Vec<_>>(), vec!["SUMMARY.md"]);
}

#[test]
fn test_corrupt_state_is_treated_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(JsonStateStore::new(&path).load().is_none());
}
