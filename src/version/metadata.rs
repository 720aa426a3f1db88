//! Version Metadata
//!
//! An 88-byte per-version summary (key range, height range, live entry
//! count) persisted next to each sealed data file. Used to prune candidate
//! files during deferred find/erase: ranges are conservative, so a version
//! that contains a key always reports a range covering it, while a range
//! covering a key does not prove presence.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::types::{Outpoint, OUTPOINT_SIZE};

/// Size of the on-disk metadata record:
/// min key (36) + max key (36) + min height (4) + max height (4) + count (8)
pub const METADATA_SIZE: usize = 88;

/// Per-version range summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMetadata {
    pub min_key: Outpoint,
    pub max_key: Outpoint,
    pub min_height: u32,
    pub max_height: u32,
    /// Live (non-tombstoned) entries in the version file
    pub entry_count: u64,
}

impl Default for VersionMetadata {
    fn default() -> Self {
        Self {
            min_key: [0xFF; OUTPOINT_SIZE],
            max_key: [0x00; OUTPOINT_SIZE],
            min_height: u32::MAX,
            max_height: 0,
            entry_count: 0,
        }
    }
}

impl VersionMetadata {
    /// Whether `key` could be present in this version. An empty version
    /// matches nothing.
    pub fn key_in_range(&self, key: &Outpoint) -> bool {
        self.entry_count > 0 && *key >= self.min_key && *key <= self.max_key
    }

    /// Widen the ranges for a newly sealed entry
    pub fn update_on_insert(&mut self, key: &Outpoint, height: u32) {
        if self.entry_count == 0 {
            self.min_key = *key;
            self.max_key = *key;
            self.min_height = height;
            self.max_height = height;
        } else {
            if *key < self.min_key {
                self.min_key = *key;
            }
            if *key > self.max_key {
                self.max_key = *key;
            }
            self.min_height = self.min_height.min(height);
            self.max_height = self.max_height.max(height);
        }
        self.entry_count += 1;
    }

    /// Account for a tombstoned slot. Ranges stay as-is (conservative).
    pub fn update_on_delete(&mut self) {
        if self.entry_count > 0 {
            self.entry_count -= 1;
        }
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    pub fn encode(&self) -> [u8; METADATA_SIZE] {
        let mut buf = [0u8; METADATA_SIZE];
        buf[0..36].copy_from_slice(&self.min_key);
        buf[36..72].copy_from_slice(&self.max_key);
        buf[72..76].copy_from_slice(&self.min_height.to_le_bytes());
        buf[76..80].copy_from_slice(&self.max_height.to_le_bytes());
        buf[80..88].copy_from_slice(&self.entry_count.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; METADATA_SIZE]) -> Self {
        let mut min_key = [0u8; OUTPOINT_SIZE];
        let mut max_key = [0u8; OUTPOINT_SIZE];
        min_key.copy_from_slice(&buf[0..36]);
        max_key.copy_from_slice(&buf[36..72]);
        Self {
            min_key,
            max_key,
            min_height: u32::from_le_bytes(buf[72..76].try_into().unwrap()),
            max_height: u32::from_le_bytes(buf[76..80].try_into().unwrap()),
            entry_count: u64::from_le_bytes(buf[80..88].try_into().unwrap()),
        }
    }

    // =========================================================================
    // Side-file I/O
    // =========================================================================

    /// Write the record to its side-file
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(&self.encode())?;
        file.sync_all()?;
        Ok(())
    }

    /// Read a record from a side-file. A short or oversized file is corrupt.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len != METADATA_SIZE as u64 {
            return Err(StoreError::Corrupt(format!(
                "metadata file {} has {} bytes, expected {}",
                path.display(),
                len,
                METADATA_SIZE
            )));
        }
        let mut buf = [0u8; METADATA_SIZE];
        file.read_exact(&mut buf)?;
        Ok(Self::decode(&buf))
    }
}
