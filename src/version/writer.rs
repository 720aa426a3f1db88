//! Version Writer
//!
//! Seals a batch of entries into a new version file. Entries are written
//! once, in the order given; `finish()` flushes, fsyncs, and returns the
//! metadata record computed along the way.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::types::Outpoint;

use super::{data_capacity, len_field_width, VersionMetadata, FORMAT_VERSION, MAGIC};

/// Writer for creating new sealed version files
pub struct VersionWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    slot_size: u32,
    capacity: usize,
    len_width: usize,
    meta: VersionMetadata,
}

impl VersionWriter {
    /// Create a new version file, truncating any stale file at `path`.
    ///
    /// Writes the header immediately; call `add()` per entry, then
    /// `finish()` to make the file durable.
    pub fn new(path: &Path, slot_size: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&slot_size.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            slot_size,
            capacity: data_capacity(slot_size),
            len_width: len_field_width(slot_size),
            meta: VersionMetadata::default(),
        })
    }

    /// Append one live slot
    pub fn add(&mut self, key: &Outpoint, height: u32, payload: &[u8]) -> Result<()> {
        if payload.len() > self.capacity {
            return Err(StoreError::ValueTooLarge {
                size: payload.len(),
                max: self.capacity,
            });
        }

        self.writer.write_all(key)?;
        self.writer.write_all(&height.to_le_bytes())?;
        match self.len_width {
            1 => self.writer.write_all(&[payload.len() as u8])?,
            _ => self.writer.write_all(&(payload.len() as u16).to_le_bytes())?,
        }
        self.writer.write_all(payload)?;

        // Zero padding up to the slot's payload capacity
        let padding = self.capacity - payload.len();
        if padding > 0 {
            self.writer.write_all(&vec![0u8; padding])?;
        }

        self.meta.update_on_insert(key, height);
        Ok(())
    }

    /// Number of slots written so far
    pub fn entry_count(&self) -> u64 {
        self.meta.entry_count
    }

    /// Configured slot size
    pub fn slot_size(&self) -> u32 {
        self.slot_size
    }

    /// Flush, fsync, and return the metadata record for the sealed file
    pub fn finish(self) -> Result<VersionMetadata> {
        let file = self.writer.into_inner().map_err(|e| {
            StoreError::Corrupt(format!(
                "failed to flush version file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        file.sync_all()?;
        Ok(self.meta)
    }
}
