//! Tests for the version file format
//!
//! These tests verify:
//! - Seal-then-read round trips
//! - Tombstoning in place
//! - Live-slot iteration
//! - The 88-byte metadata record and its side-file recovery path
//! - Manifest CRC framing

use std::path::PathBuf;

use tempfile::TempDir;
use utxostore::types::{make_outpoint, Outpoint};
use utxostore::version::{
    ContainerManifest, VersionFile, VersionMetadata, VersionWriter, METADATA_SIZE,
};
use utxostore::StoreError;

const SLOT_SIZE: u32 = 44; // 39-byte payload capacity

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data_0_00000.dat");
    (temp_dir, path)
}

fn key(n: u8) -> Outpoint {
    make_outpoint(&[n; 32], n as u32)
}

/// Seal `count` keyed entries with distinct payloads and heights
fn write_version(path: &PathBuf, count: u8) -> VersionMetadata {
    let mut writer = VersionWriter::new(path, SLOT_SIZE).unwrap();
    for n in 0..count {
        writer.add(&key(n), 100 + n as u32, &[n; 8]).unwrap();
    }
    writer.finish().unwrap()
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_writer_creates_file() {
    let (_temp, path) = setup();

    let meta = write_version(&path, 5);

    assert!(path.exists());
    assert_eq!(meta.entry_count, 5);
    assert_eq!(meta.min_key, key(0));
    assert_eq!(meta.max_key, key(4));
    assert_eq!(meta.min_height, 100);
    assert_eq!(meta.max_height, 104);
}

#[test]
fn test_writer_rejects_oversized_payload() {
    let (_temp, path) = setup();

    let mut writer = VersionWriter::new(&path, SLOT_SIZE).unwrap();
    let result = writer.add(&key(1), 1, &[0u8; 40]); // capacity is 39

    assert!(matches!(result, Err(StoreError::ValueTooLarge { .. })));
}

#[test]
fn test_writer_accepts_payload_at_capacity() {
    let (_temp, path) = setup();

    let payload = [0xAB; 39];
    let mut writer = VersionWriter::new(&path, SLOT_SIZE).unwrap();
    writer.add(&key(1), 7, &payload).unwrap();
    writer.finish().unwrap();

    let mut file = VersionFile::open(&path, SLOT_SIZE, false).unwrap();
    let hit = file.find(&key(1)).unwrap().unwrap();
    assert_eq!(hit.payload, payload);
    assert_eq!(hit.height, 7);
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_find_existing_and_absent() {
    let (_temp, path) = setup();
    write_version(&path, 10);

    let mut file = VersionFile::open(&path, SLOT_SIZE, false).unwrap();
    assert_eq!(file.slot_count(), 10);

    let hit = file.find(&key(3)).unwrap().unwrap();
    assert_eq!(hit.payload, vec![3u8; 8]);
    assert_eq!(hit.height, 103);

    assert!(file.find(&key(99)).unwrap().is_none());
}

#[test]
fn test_empty_payload_round_trip() {
    let (_temp, path) = setup();

    let mut writer = VersionWriter::new(&path, SLOT_SIZE).unwrap();
    writer.add(&key(1), 1, &[]).unwrap();
    writer.finish().unwrap();

    let mut file = VersionFile::open(&path, SLOT_SIZE, false).unwrap();
    let hit = file.find(&key(1)).unwrap().unwrap();
    assert!(hit.payload.is_empty());
}

#[test]
fn test_open_invalid_magic() {
    let (_temp, path) = setup();
    std::fs::write(&path, b"GARBAGE_DATA_NOT_A_VERSION_FILE").unwrap();

    let result = VersionFile::open(&path, SLOT_SIZE, false);
    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

#[test]
fn test_open_slot_size_mismatch() {
    let (_temp, path) = setup();
    write_version(&path, 3);

    let result = VersionFile::open(&path, 128, false);
    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

// =============================================================================
// Tombstone Tests
// =============================================================================

#[test]
fn test_tombstone_hides_slot() {
    let (_temp, path) = setup();
    write_version(&path, 5);

    let mut file = VersionFile::open(&path, SLOT_SIZE, true).unwrap();
    let hit = file.find(&key(2)).unwrap().unwrap();
    file.tombstone(hit.slot).unwrap();
    file.sync().unwrap();

    assert!(file.find(&key(2)).unwrap().is_none());
    // Neighbors are unaffected
    assert!(file.find(&key(1)).unwrap().is_some());
    assert!(file.find(&key(3)).unwrap().is_some());
}

#[test]
fn test_iter_skips_tombstones() {
    let (_temp, path) = setup();
    write_version(&path, 4);

    let mut file = VersionFile::open(&path, SLOT_SIZE, true).unwrap();
    let hit = file.find(&key(1)).unwrap().unwrap();
    file.tombstone(hit.slot).unwrap();

    let entries: Vec<_> = file.iter().unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|(k, _, _)| *k != key(1)));
}

#[test]
fn test_find_slots_batch() {
    let (_temp, path) = setup();
    write_version(&path, 8);

    let mut file = VersionFile::open(&path, SLOT_SIZE, true).unwrap();
    let wanted = vec![key(2), key(5), key(42)];
    let hits = file.find_slots(&wanted).unwrap();

    let found: Vec<Outpoint> = hits.iter().map(|(_, k)| *k).collect();
    assert_eq!(hits.len(), 2);
    assert!(found.contains(&key(2)));
    assert!(found.contains(&key(5)));
}

// =============================================================================
// Metadata Tests
// =============================================================================

#[test]
fn test_metadata_record_is_88_bytes() {
    let meta = VersionMetadata::default();
    assert_eq!(meta.encode().len(), METADATA_SIZE);
    assert_eq!(METADATA_SIZE, 88);
}

#[test]
fn test_metadata_encode_decode() {
    let mut meta = VersionMetadata::default();
    meta.update_on_insert(&key(10), 500);
    meta.update_on_insert(&key(3), 200);
    meta.update_on_insert(&key(7), 900);

    let decoded = VersionMetadata::decode(&meta.encode());
    assert_eq!(decoded, meta);
    assert_eq!(decoded.min_key, key(3));
    assert_eq!(decoded.max_key, key(10));
    assert_eq!(decoded.min_height, 200);
    assert_eq!(decoded.max_height, 900);
    assert_eq!(decoded.entry_count, 3);
}

#[test]
fn test_metadata_range_pruning() {
    let mut meta = VersionMetadata::default();

    // Empty version matches nothing
    assert!(!meta.key_in_range(&key(5)));

    meta.update_on_insert(&key(4), 1);
    meta.update_on_insert(&key(8), 1);

    assert!(meta.key_in_range(&key(4)));
    assert!(meta.key_in_range(&key(6))); // inside the range, maybe absent
    assert!(meta.key_in_range(&key(8)));
    assert!(!meta.key_in_range(&key(3)));
    assert!(!meta.key_in_range(&key(9)));
}

#[test]
fn test_metadata_save_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("meta_0_00000.dat");

    let mut meta = VersionMetadata::default();
    meta.update_on_insert(&key(1), 42);
    meta.save(&path).unwrap();

    let loaded = VersionMetadata::load(&path).unwrap();
    assert_eq!(loaded, meta);
}

#[test]
fn test_metadata_load_rejects_wrong_size() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("meta_0_00000.dat");
    std::fs::write(&path, b"short").unwrap();

    assert!(matches!(
        VersionMetadata::load(&path),
        Err(StoreError::Corrupt(_))
    ));
}

#[test]
fn test_rebuild_metadata_matches_sealed_record() {
    let (_temp, path) = setup();
    let sealed = write_version(&path, 6);

    let mut file = VersionFile::open(&path, SLOT_SIZE, true).unwrap();
    assert_eq!(file.rebuild_metadata().unwrap(), sealed);

    // After a tombstone the rebuilt count drops
    let hit = file.find(&key(0)).unwrap().unwrap();
    file.tombstone(hit.slot).unwrap();
    let rebuilt = file.rebuild_metadata().unwrap();
    assert_eq!(rebuilt.entry_count, 5);
    assert_eq!(rebuilt.min_key, key(1));
}

// =============================================================================
// Manifest Tests
// =============================================================================

#[test]
fn test_manifest_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("manifest_0.dat");

    let manifest = ContainerManifest {
        slot_size: 128,
        next_version: 7,
        live_entries: 1234,
    };
    manifest.save(&path).unwrap();

    assert_eq!(ContainerManifest::load(&path).unwrap(), Some(manifest));
}

#[test]
fn test_manifest_missing_is_none() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("manifest_0.dat");

    assert_eq!(ContainerManifest::load(&path).unwrap(), None);
}

#[test]
fn test_manifest_corruption_is_detected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("manifest_0.dat");

    let manifest = ContainerManifest {
        slot_size: 44,
        next_version: 3,
        live_entries: 10,
    };
    manifest.save(&path).unwrap();

    // Flip a payload byte; the CRC must catch it
    let mut raw = std::fs::read(&path).unwrap();
    raw[5] ^= 0xFF;
    std::fs::write(&path, &raw).unwrap();

    assert_eq!(ContainerManifest::load(&path).unwrap(), None);
}
