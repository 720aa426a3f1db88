//! Compactor
//!
//! Rewrites a container's sealed versions to drop tombstoned slots and
//! shrink the file count. Surviving entries are packed into new files
//! bounded by the container's per-file slot limit and renumbered
//! contiguously from zero.
//!
//! Ordering is write-new-then-delete-old: every new data file and metadata
//! record is fully written and fsynced under a temporary name before any old
//! file is removed, so an interruption leaves the pre-compaction state
//! intact. Leftover temporaries are swept the next time the store opens.
//!
//! Compaction is a blocking maintenance operation requiring exclusive use of
//! the container: callers must not interleave insert/find/erase with it.

use std::fs;
use std::path::PathBuf;

use crate::container::Container;
use crate::error::Result;
use crate::types::Outpoint;
use crate::version::{VersionFile, VersionMetadata, VersionWriter};

/// Suffix for files written by an in-progress compaction
pub(crate) const TMP_SUFFIX: &str = ".tmp";

/// What one container compaction did
#[derive(Debug, Default)]
pub struct CompactionSummary {
    pub files_before: usize,
    pub files_after: usize,
    pub live_entries: u64,
    pub tombstones_dropped: u64,
}

fn tmp_path(path: PathBuf) -> PathBuf {
    let mut name = path.into_os_string();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

/// Compact one container's sealed versions. The active store is untouched.
pub(crate) fn compact(container: &mut Container) -> Result<CompactionSummary> {
    let files_before = container.sealed.len();
    if files_before == 0 {
        return Ok(CompactionSummary::default());
    }

    // Gather every surviving entry, oldest version first
    let mut live: Vec<(Outpoint, u32, Vec<u8>)> = Vec::new();
    let mut total_slots = 0u64;
    for v in 0..container.sealed.len() {
        let path = container.data_path(v as u64);
        if !path.exists() {
            continue;
        }
        let mut file = VersionFile::open(&path, container.slot_size, false)?;
        total_slots += file.slot_count();
        for entry in file.iter()? {
            let (key, height, payload) = entry?;
            live.push((key, height, payload));
        }
    }
    let live_count = live.len() as u64;
    let tombstones_dropped = total_slots - live_count;

    // Phase 1: write the replacement files and their metadata, fsynced,
    // under temporary names
    let mut new_meta: Vec<VersionMetadata> = Vec::new();
    for (i, chunk) in live.chunks(container.slots_per_file as usize).enumerate() {
        let mut writer = VersionWriter::new(
            &tmp_path(container.data_path(i as u64)),
            container.slot_size,
        )?;
        for (key, height, payload) in chunk {
            writer.add(key, *height, payload)?;
        }
        let meta = writer.finish()?;
        meta.save(&tmp_path(container.meta_path(i as u64)))?;
        new_meta.push(meta);
    }

    // Phase 2: remove the superseded files
    for v in 0..container.sealed.len() {
        for path in [container.data_path(v as u64), container.meta_path(v as u64)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    // Phase 3: move the replacements into place, numbered from zero
    for i in 0..new_meta.len() {
        fs::rename(
            tmp_path(container.data_path(i as u64)),
            container.data_path(i as u64),
        )?;
        fs::rename(
            tmp_path(container.meta_path(i as u64)),
            container.meta_path(i as u64),
        )?;
    }

    container.next_version = new_meta.len() as u64;
    let files_after = new_meta.len();
    container.sealed = new_meta;

    Ok(CompactionSummary {
        files_before,
        files_after,
        live_entries: live_count,
        tombstones_dropped,
    })
}
