//! Container Manifest
//!
//! A small per-container summary written at close() and read at open():
//! capacity class, the next version id to assign, and the live-entry count
//! as of the last clean close. Framed with a CRC32 so corruption is
//! detected; a corrupt or missing manifest degrades to directory-scan
//! recovery rather than misconfiguring the container.
//!
//! ## File Format
//! ```text
//! [PayloadLen: u32][Payload: bincode][CRC32(payload): u32]
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-container manifest record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerManifest {
    /// Capacity class (slot size in bytes)
    pub slot_size: u32,
    /// Next version id this container will assign
    pub next_version: u64,
    /// Live entries at the last clean close (recomputed on open, never
    /// trusted as-is)
    pub live_entries: u64,
}

impl ContainerManifest {
    /// Write the manifest: length-prefixed bincode payload plus CRC32
    pub fn save(&self, path: &Path) -> Result<()> {
        let payload = bincode::serialize(self)
            .map_err(|e| crate::StoreError::Corrupt(format!("manifest encode: {}", e)))?;
        let crc = crc32fast::hash(&payload);

        let mut file = File::create(path)?;
        file.write_all(&(payload.len() as u32).to_le_bytes())?;
        file.write_all(&payload)?;
        file.write_all(&crc.to_le_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Read a manifest. Returns `None` when the file is missing, truncated,
    /// fails its CRC, or does not decode — callers fall back to scanning the
    /// data directory.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;
        if raw.len() < 8 {
            tracing::warn!("manifest {} truncated, ignoring", path.display());
            return Ok(None);
        }

        let payload_len = u32::from_le_bytes(raw[0..4].try_into().unwrap()) as usize;
        if raw.len() != 4 + payload_len + 4 {
            tracing::warn!("manifest {} has inconsistent length, ignoring", path.display());
            return Ok(None);
        }

        let payload = &raw[4..4 + payload_len];
        let stored_crc = u32::from_le_bytes(raw[4 + payload_len..].try_into().unwrap());
        if crc32fast::hash(payload) != stored_crc {
            tracing::warn!("manifest {} failed CRC check, ignoring", path.display());
            return Ok(None);
        }

        match bincode::deserialize(payload) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                tracing::warn!("manifest {} did not decode ({}), ignoring", path.display(), e);
                Ok(None)
            }
        }
    }
}
