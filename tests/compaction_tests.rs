//! Tests for compaction
//!
//! These tests verify:
//! - Compaction preserves the live key→value mapping and size() exactly
//! - Tombstoned slots are reclaimed and files renumbered from zero
//! - Fully-emptied containers end with no data files
//! - Stores reopen cleanly after compaction
//! - Leftover temporaries are swept at open

use std::collections::HashMap;
use std::path::Path;

use tempfile::TempDir;
use utxostore::types::make_outpoint;
use utxostore::version::{slot_stride, HEADER_SIZE};
use utxostore::{Config, Outpoint, UtxoStore};

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(dir: &Path, slots_per_file: u64) -> Config {
    let slot_sizes = vec![44u32, 128, 512, 10240];
    let limits: Vec<u64> = slot_sizes
        .iter()
        .map(|&s| HEADER_SIZE + slots_per_file * slot_stride(s))
        .collect();
    Config::builder()
        .data_dir(dir)
        .slot_sizes(slot_sizes)
        .file_size_limits(limits)
        .build()
}

fn op(n: u64) -> Outpoint {
    let mut txid = [0u8; 32];
    txid[..8].copy_from_slice(&n.to_be_bytes());
    make_outpoint(&txid, 0)
}

fn snapshot(store: &UtxoStore) -> HashMap<Outpoint, (u32, Vec<u8>)> {
    let mut entries = HashMap::new();
    store
        .for_each_entry(|key, height, payload| {
            entries.insert(*key, (height, payload.to_vec()));
        })
        .unwrap();
    entries
}

fn data_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("data_"))
        .collect();
    names.sort();
    names
}

// =============================================================================
// Integrity
// =============================================================================

#[test]
fn test_compaction_preserves_live_set() {
    let temp = TempDir::new().unwrap();
    let mut store = UtxoStore::open(test_config(temp.path(), 4)).unwrap();

    // 5 rotations in container 0, plus two entries left active
    for n in 0..22 {
        store
            .insert(&op(n), format!("value{}", n).as_bytes(), n as u32)
            .unwrap();
    }

    // Interleaved deletions: some sealed (deferred), then processed
    for &n in &[1u64, 4, 7, 10, 13, 16] {
        assert!(!store.erase(&op(n)));
    }
    let outcome = store.process_pending_deletions(100).unwrap();
    assert_eq!(outcome.deleted, 6);

    let before_entries = snapshot(&store);
    let before_size = store.size();
    assert_eq!(before_size, 16);

    store.compact_all().unwrap();

    assert_eq!(store.size(), before_size);
    assert_eq!(snapshot(&store), before_entries);
    for n in 0..22u64 {
        let found = store.find(&op(n)).unwrap();
        if [1u64, 4, 7, 10, 13, 16].contains(&n) {
            assert_eq!(found, None);
        } else {
            assert_eq!(found, Some(format!("value{}", n).into_bytes()));
        }
    }
}

#[test]
fn test_compaction_shrinks_and_renumbers_files() {
    let temp = TempDir::new().unwrap();
    let mut store = UtxoStore::open(test_config(temp.path(), 4)).unwrap();

    // 4 sealed versions of 4 slots each
    for n in 0..16 {
        store.insert(&op(n), b"v", 1).unwrap();
    }
    assert_eq!(
        store.get_sizing_report().unwrap().containers[0].sealed_versions,
        4
    );

    // Tombstone half the slots
    for n in (0..16).step_by(2) {
        store.erase(&op(n));
    }
    store.process_pending_deletions(100).unwrap();

    store.compact_all().unwrap();

    // 8 survivors fit in 2 files, numbered from zero
    let report = store.get_sizing_report().unwrap();
    assert_eq!(report.containers[0].sealed_versions, 2);
    assert_eq!(report.containers[0].live_entries, 8);
    assert_eq!(
        data_files(temp.path()),
        vec!["data_0_00000.dat", "data_0_00001.dat"]
    );
}

#[test]
fn test_compaction_of_fully_erased_container() {
    let temp = TempDir::new().unwrap();
    let mut store = UtxoStore::open(test_config(temp.path(), 3)).unwrap();

    for n in 0..3 {
        store.insert(&op(n), b"v", 1).unwrap();
    }
    for n in 0..3 {
        store.erase(&op(n));
    }
    store.process_pending_deletions(100).unwrap();
    assert_eq!(store.size(), 0);

    store.compact_all().unwrap();

    assert_eq!(store.size(), 0);
    assert!(data_files(temp.path()).is_empty());
    assert_eq!(store.find(&op(0)).unwrap(), None);
}

#[test]
fn test_compaction_on_empty_store() {
    let temp = TempDir::new().unwrap();
    let mut store = UtxoStore::open(test_config(temp.path(), 4)).unwrap();

    store.compact_all().unwrap();
    assert_eq!(store.size(), 0);
}

#[test]
fn test_active_store_untouched_by_compaction() {
    let temp = TempDir::new().unwrap();
    let mut store = UtxoStore::open(test_config(temp.path(), 4)).unwrap();

    for n in 0..10 {
        store.insert(&op(n), b"v", 1).unwrap();
    }
    // 8 sealed, 2 active
    store.compact_all().unwrap();

    let report = store.get_sizing_report().unwrap();
    assert_eq!(report.containers[0].active_entries, 2);
    assert_eq!(store.size(), 10);
    assert_eq!(store.find(&op(9)).unwrap(), Some(b"v".to_vec()));
}

// =============================================================================
// Persistence After Compaction
// =============================================================================

#[test]
fn test_reopen_after_compaction() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 4);

    {
        let mut store = UtxoStore::open(config.clone()).unwrap();
        for n in 0..12 {
            store
                .insert(&op(n), format!("value{}", n).as_bytes(), 1)
                .unwrap();
        }
        for &n in &[0u64, 3, 6] {
            store.erase(&op(n));
        }
        store.process_pending_deletions(100).unwrap();
        store.compact_all().unwrap();
        store.close().unwrap();
    }

    let store = UtxoStore::open(config).unwrap();
    assert_eq!(store.size(), 9);
    for n in 0..12u64 {
        let found = store.find(&op(n)).unwrap();
        if [0u64, 3, 6].contains(&n) {
            assert_eq!(found, None);
        } else {
            assert_eq!(found, Some(format!("value{}", n).into_bytes()));
        }
    }
}

#[test]
fn test_pruning_still_works_after_compaction() {
    let temp = TempDir::new().unwrap();
    let mut store = UtxoStore::open(test_config(temp.path(), 4)).unwrap();

    for n in 0..12 {
        store.insert(&op(n), b"v", 1).unwrap();
    }
    for n in 4..8 {
        store.erase(&op(n));
    }
    store.process_pending_deletions(100).unwrap();
    store.compact_all().unwrap();

    // Metadata was regenerated from the new files; lookups still resolve
    store.reset_scan_counters();
    assert_eq!(store.find(&op(2)).unwrap(), Some(b"v".to_vec()));
    assert!(store.sealed_files_scanned() <= 1);
    assert_eq!(store.find(&op(5)).unwrap(), None);
}

// =============================================================================
// Temporary File Handling
// =============================================================================

#[test]
fn test_leftover_temporaries_swept_at_open() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path(), 4);

    {
        let mut store = UtxoStore::open(config.clone()).unwrap();
        store.insert(&op(1), b"v", 1).unwrap();
        store.close().unwrap();
    }

    // Simulate an interrupted compaction
    let stray = temp.path().join("data_0_00007.dat.tmp");
    std::fs::write(&stray, b"partial").unwrap();

    let store = UtxoStore::open(config).unwrap();
    assert!(!stray.exists());
    assert_eq!(store.size(), 1);
}
