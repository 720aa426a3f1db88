//! Version Reader
//!
//! Opens sealed version files for key scans, live-slot iteration, and
//! in-place tombstoning during deferred deletion.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::types::{Outpoint, OUTPOINT_SIZE};

use super::{
    data_capacity, len_field_width, slot_stride, VersionMetadata, FORMAT_VERSION, HEADER_SIZE,
    MAGIC,
};

/// A live slot located by a key scan
#[derive(Debug, Clone)]
pub struct SlotHit {
    /// Slot index within the file
    pub slot: u64,
    pub height: u32,
    pub payload: Vec<u8>,
}

/// Handle to one sealed version file
pub struct VersionFile {
    file: File,
    path: PathBuf,
    slot_size: u32,
    len_width: usize,
    capacity: usize,
    stride: u64,
    slot_count: u64,
}

impl VersionFile {
    /// Open a version file and validate its header against the container's
    /// slot size. `writable` is required for `tombstone()`.
    pub fn open(path: &Path, slot_size: u32, writable: bool) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(writable).open(path)?;
        let file_size = file.metadata()?.len();

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(StoreError::Corrupt(format!(
                "invalid version file magic in {}: {:?}",
                path.display(),
                &header[0..4]
            )));
        }
        let format = u16::from_le_bytes(header[4..6].try_into().unwrap());
        if format != FORMAT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported version file format {} in {}",
                format,
                path.display()
            )));
        }
        let header_slot_size = u32::from_le_bytes(header[6..10].try_into().unwrap());
        if header_slot_size != slot_size {
            return Err(StoreError::Corrupt(format!(
                "version file {} has slot size {}, container expects {}",
                path.display(),
                header_slot_size,
                slot_size
            )));
        }

        let stride = slot_stride(slot_size);
        let body = file_size - HEADER_SIZE;
        if body % stride != 0 {
            tracing::warn!(
                "version file {} has {} trailing bytes, ignoring",
                path.display(),
                body % stride
            );
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            slot_size,
            len_width: len_field_width(slot_size),
            capacity: data_capacity(slot_size),
            stride,
            slot_count: body / stride,
        })
    }

    /// Number of slots in the file, tombstoned ones included
    pub fn slot_count(&self) -> u64 {
        self.slot_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Key Scans
    // =========================================================================

    /// Scan for a single key. Tombstoned slots never match.
    pub fn find(&mut self, key: &Outpoint) -> Result<Option<SlotHit>> {
        let len_width = self.len_width;
        let capacity = self.capacity;
        let slot_count = self.slot_count;
        let stride = self.stride as usize;

        self.file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut reader = BufReader::new(&self.file);
        let mut buf = vec![0u8; stride];

        for slot in 0..slot_count {
            reader.read_exact(&mut buf)?;
            if buf[..OUTPOINT_SIZE] != key[..] {
                continue;
            }
            let Some(len) = parse_len(&buf, len_width, capacity, &self.path)? else {
                continue; // tombstoned
            };
            let height = u32::from_le_bytes(
                buf[OUTPOINT_SIZE..OUTPOINT_SIZE + 4].try_into().unwrap(),
            );
            let start = OUTPOINT_SIZE + 4 + len_width;
            return Ok(Some(SlotHit {
                slot,
                height,
                payload: buf[start..start + len].to_vec(),
            }));
        }
        Ok(None)
    }

    /// Scan for any of `keys`, returning (slot, key) for every live match.
    /// Used by batched deferred deletion: one pass per file.
    pub fn find_slots(&mut self, keys: &[Outpoint]) -> Result<Vec<(u64, Outpoint)>> {
        let len_width = self.len_width;
        let capacity = self.capacity;
        let slot_count = self.slot_count;
        let stride = self.stride as usize;

        self.file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut reader = BufReader::new(&self.file);
        let mut buf = vec![0u8; stride];
        let mut hits = Vec::new();

        for slot in 0..slot_count {
            reader.read_exact(&mut buf)?;
            let slot_key = &buf[..OUTPOINT_SIZE];
            if !keys.iter().any(|k| k[..] == *slot_key) {
                continue;
            }
            if parse_len(&buf, len_width, capacity, &self.path)?.is_none() {
                continue;
            }
            let mut key = [0u8; OUTPOINT_SIZE];
            key.copy_from_slice(slot_key);
            hits.push((slot, key));
        }
        Ok(hits)
    }

    // =========================================================================
    // Tombstoning
    // =========================================================================

    /// Mark a slot deleted by overwriting its length field with the sentinel.
    /// The slot's key and payload bytes are left in place; compaction
    /// reclaims the space.
    pub fn tombstone(&mut self, slot: u64) -> Result<()> {
        debug_assert!(slot < self.slot_count);
        let offset = HEADER_SIZE + slot * self.stride + (OUTPOINT_SIZE + 4) as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        match self.len_width {
            1 => self.file.write_all(&[u8::MAX])?,
            _ => self.file.write_all(&u16::MAX.to_le_bytes())?,
        }
        Ok(())
    }

    /// Flush tombstone writes to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    // =========================================================================
    // Iteration & Recovery
    // =========================================================================

    /// Iterate over all live slots
    pub fn iter(&mut self) -> Result<VersionIter<'_>> {
        self.file.seek(SeekFrom::Start(HEADER_SIZE))?;
        Ok(VersionIter {
            reader: BufReader::new(&self.file),
            path: self.path.clone(),
            len_width: self.len_width,
            capacity: self.capacity,
            buf: vec![0u8; self.stride as usize],
            remaining: self.slot_count,
        })
    }

    /// Recompute the metadata record by scanning live slots. Used when a
    /// metadata side-file is missing or unreadable: the rebuilt record can
    /// never falsely exclude a present key.
    pub fn rebuild_metadata(&mut self) -> Result<VersionMetadata> {
        let mut meta = VersionMetadata::default();
        for entry in self.iter()? {
            let (key, height, _) = entry?;
            meta.update_on_insert(&key, height);
        }
        Ok(meta)
    }
}

/// Iterator over live slots in a version file
pub struct VersionIter<'a> {
    reader: BufReader<&'a File>,
    path: PathBuf,
    len_width: usize,
    capacity: usize,
    buf: Vec<u8>,
    remaining: u64,
}

impl Iterator for VersionIter<'_> {
    /// (key, height, payload) for each live slot
    type Item = Result<(Outpoint, u32, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            self.remaining -= 1;
            if let Err(e) = self.reader.read_exact(&mut self.buf) {
                return Some(Err(StoreError::Io(e)));
            }
            let len = match parse_len(&self.buf, self.len_width, self.capacity, &self.path) {
                Ok(Some(len)) => len,
                Ok(None) => continue, // tombstoned
                Err(e) => return Some(Err(e)),
            };
            let mut key = [0u8; OUTPOINT_SIZE];
            key.copy_from_slice(&self.buf[..OUTPOINT_SIZE]);
            let height = u32::from_le_bytes(
                self.buf[OUTPOINT_SIZE..OUTPOINT_SIZE + 4].try_into().unwrap(),
            );
            let start = OUTPOINT_SIZE + 4 + self.len_width;
            return Some(Ok((key, height, self.buf[start..start + len].to_vec())));
        }
        None
    }
}

/// Decode a slot's length field. `None` means tombstoned.
fn parse_len(buf: &[u8], len_width: usize, capacity: usize, path: &Path) -> Result<Option<usize>> {
    let at = OUTPOINT_SIZE + 4;
    let len = match len_width {
        1 => {
            let v = buf[at];
            if v == u8::MAX {
                return Ok(None);
            }
            v as usize
        }
        _ => {
            let v = u16::from_le_bytes(buf[at..at + 2].try_into().unwrap());
            if v == u16::MAX {
                return Ok(None);
            }
            v as usize
        }
    };
    if len > capacity {
        return Err(StoreError::Corrupt(format!(
            "slot length {} exceeds capacity {} in {}",
            len,
            capacity,
            path.display()
        )));
    }
    Ok(Some(len))
}
