use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clipstash_core::{HistoryStore, InsertOutcome, Result};

fn texts(store: &HistoryStore) -> Vec<String> {
    store.list().into_iter().map(|e| e.text).collect()
}

fn open(path: &Path, max_size: usize) -> HistoryStore {
    HistoryStore::open(path.to_path_buf(), max_size).unwrap()
}

#[test]
fn bounded_size_keeps_most_recent_values() -> Result<()> {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = open(&temp_dir.path().join("history.json"), 5);

    for i in 0..12 {
        store.insert_or_promote(&format!("value {}", i))?;
    }

    let expected: Vec<String> = (7..12).rev().map(|i| format!("value {}", i)).collect();
    assert_eq!(texts(&store), expected);
    Ok(())
}

#[test]
fn order_follows_observation_and_promotion() -> Result<()> {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = open(&temp_dir.path().join("history.json"), 10);

    store.insert_or_promote("A")?;
    store.insert_or_promote("B")?;
    store.insert_or_promote("C")?;
    assert_eq!(texts(&store), vec!["C", "B", "A"]);

    let before = store.list()[2].timestamp;
    assert!(matches!(store.insert_or_promote("A")?, InsertOutcome::Promoted { .. }));
    assert_eq!(texts(&store), vec!["A", "C", "B"]);
    assert!(store.list()[0].timestamp >= before);
    Ok(())
}

#[test]
fn blank_values_never_change_length() -> Result<()> {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = open(&temp_dir.path().join("history.json"), 10);
    store.insert_or_promote("kept")?;

    for blank in ["", " ", "\n\n", "\t \r\n"] {
        assert_eq!(store.insert_or_promote(blank)?, InsertOutcome::Ignored);
    }
    assert_eq!(store.len(), 1);
    Ok(())
}

#[test]
fn reload_after_drop_yields_identical_list() -> Result<()> {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("history.json");

    let listed = {
        let store = open(&path, 10);
        store.insert_or_promote("one")?;
        store.insert_or_promote("two\nlines")?;
        store.insert_or_promote("one")?;
        store.list()
    };

    assert_eq!(open(&path, 10).list(), listed);
    Ok(())
}

#[test]
fn interrupted_write_loads_as_empty_history() -> Result<()> {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("history.json");

    {
        let store = open(&path, 10);
        store.insert_or_promote("alpha")?;
        store.insert_or_promote("beta")?;
    }

    let full = std::fs::read(&path).unwrap();
    for cut in [1, full.len() / 3, full.len() / 2, full.len() - 2] {
        std::fs::write(&path, &full[..cut]).unwrap();
        let store = open(&path, 10);
        assert!(store.is_empty(), "cut at {} should load empty", cut);
    }
    Ok(())
}

#[test]
fn stray_temp_file_does_not_affect_load() -> Result<()> {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("history.json");
    open(&path, 10).insert_or_promote("committed")?;

    // A crash between writing the temp file and renaming it
    std::fs::write(temp_dir.path().join("history.json.tmp"), b"{\"version\": 1, \"entr").unwrap();
    assert_eq!(texts(&open(&path, 10)), vec!["committed"]);
    Ok(())
}

#[test]
fn concurrent_list_never_sees_torn_state() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open(&temp_dir.path().join("history.json"), 1000));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let store = store.clone();
        let done = done.clone();
        thread::spawn(move || {
            for i in 0..200 {
                store.insert_or_promote(&i.to_string()).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    // Every snapshot must be exactly [k-1, ..., 1, 0] for some k
    while !done.load(Ordering::SeqCst) {
        let snapshot = texts(&store);
        let k = snapshot.len();
        let expected: Vec<String> = (0..k).rev().map(|i| i.to_string()).collect();
        assert_eq!(snapshot, expected);
    }

    writer.join().unwrap();
    assert_eq!(store.len(), 200);
}

#[test]
fn writers_in_separate_handles_do_not_lose_entries() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("history.json");

    // Separate store handles behave like separate processes sharing the file
    let handles: Vec<_> = (0..3)
        .map(|w| {
            let store = open(&path, 1000);
            thread::spawn(move || {
                for i in 0..20 {
                    store.insert_or_promote(&format!("w{}-{}", w, i)).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stored: HashSet<String> = texts(&open(&path, 1000)).into_iter().collect();
    assert_eq!(stored.len(), 60);
}
