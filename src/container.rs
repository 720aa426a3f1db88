//! Container
//!
//! One size class of the store: an active in-memory map of recent inserts
//! plus the ordered list of sealed version files and their metadata records.
//! The active map serves hits in O(1); misses fall through to the sealed
//! versions, scanned newest to oldest with metadata-range pruning.
//!
//! Rotation seals the active map into the next version file once it reaches
//! the per-file slot limit. Sealed slots never move except through
//! compaction.

use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::types::{outpoint_hex, Outpoint};
use crate::version::{
    self, ContainerManifest, VersionFile, VersionMetadata, VersionWriter, HEADER_SIZE,
};

/// One entry in a container's active store
#[derive(Debug, Clone)]
pub(crate) struct ActiveEntry {
    pub height: u32,
    pub payload: Vec<u8>,
}

/// A size-class partition of the store
pub struct Container {
    /// Position within the store's ascending size classes
    pub(crate) index: usize,
    pub(crate) slot_size: u32,
    /// Slots per sealed file, derived from the configured file size limit
    pub(crate) slots_per_file: u64,
    pub(crate) dir: PathBuf,

    /// Active in-memory store; emptied by rotation
    pub(crate) active: HashMap<Outpoint, ActiveEntry>,

    /// Metadata per sealed version; the vec index is the version id
    pub(crate) sealed: Vec<VersionMetadata>,

    /// Next version id to assign
    pub(crate) next_version: u64,

    /// Sealed files opened for scanning since the last reset. Pruning
    /// instrumentation: a perfectly pruned lookup touches at most the
    /// file(s) whose range covers the key.
    files_scanned: Cell<u64>,
}

impl Container {
    /// Create or reopen the container for one size class.
    ///
    /// Sealed versions are discovered by listing the data directory — not
    /// by trusting the manifest alone — so files sealed by rotation survive
    /// a crash that skipped close(). Each version's metadata record is
    /// loaded from its side-file, or rebuilt by scanning the data file when
    /// the side-file is missing or unreadable.
    pub fn open(index: usize, slot_size: u32, file_size_limit: u64, dir: &Path) -> Result<Self> {
        let slots_per_file =
            ((file_size_limit.saturating_sub(HEADER_SIZE)) / version::slot_stride(slot_size)).max(1);

        let manifest = ContainerManifest::load(&dir.join(version::manifest_file_name(index)))?;
        if let Some(ref m) = manifest {
            if m.slot_size != slot_size {
                return Err(StoreError::Config(format!(
                    "container {} on disk has slot size {}, configuration says {}",
                    index, m.slot_size, slot_size
                )));
            }
        }

        // Discover sealed versions from the directory listing
        let mut max_version: Option<u64> = None;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some((c, v)) = version::parse_data_file_name(name) {
                if c == index {
                    max_version = Some(max_version.map_or(v, |m: u64| m.max(v)));
                }
            }
        }

        let next_version = {
            let from_files = max_version.map_or(0, |m| m + 1);
            let from_manifest = manifest.as_ref().map_or(0, |m| m.next_version);
            from_files.max(from_manifest)
        };

        let mut container = Self {
            index,
            slot_size,
            slots_per_file,
            dir: dir.to_path_buf(),
            active: HashMap::new(),
            sealed: Vec::with_capacity(next_version as usize),
            next_version,
            files_scanned: Cell::new(0),
        };

        for v in 0..next_version {
            let meta = container.load_or_rebuild_metadata(v)?;
            container.sealed.push(meta);
        }

        tracing::debug!(
            "container {} opened: slot size {}, {} sealed versions, {} live entries",
            index,
            slot_size,
            next_version,
            container.live_entries()
        );
        Ok(container)
    }

    fn load_or_rebuild_metadata(&self, v: u64) -> Result<VersionMetadata> {
        let data_path = self.data_path(v);
        if !data_path.exists() {
            // A gap left by an interrupted cleanup: nothing to scan, nothing
            // to prune into.
            return Ok(VersionMetadata::default());
        }
        match VersionMetadata::load(&self.meta_path(v)) {
            Ok(meta) => Ok(meta),
            Err(e) => {
                tracing::warn!(
                    "metadata for container {} version {} unavailable ({}), rebuilding from data file",
                    self.index,
                    v,
                    e
                );
                let mut file = VersionFile::open(&data_path, self.slot_size, false)?;
                let meta = file.rebuild_metadata()?;
                meta.save(&self.meta_path(v))?;
                Ok(meta)
            }
        }
    }

    // =========================================================================
    // Active Store Operations
    // =========================================================================

    /// Insert into the active store, rotating when the per-file slot limit
    /// is reached. The caller has already routed the value here and checked
    /// for duplicates.
    pub(crate) fn insert(&mut self, key: &Outpoint, height: u32, payload: Vec<u8>) -> Result<()> {
        self.active.insert(*key, ActiveEntry { height, payload });
        if self.active.len() as u64 >= self.slots_per_file {
            self.rotate()?;
        }
        Ok(())
    }

    pub(crate) fn find_active(&self, key: &Outpoint) -> Option<&ActiveEntry> {
        self.active.get(key)
    }

    /// Remove from the active store. Sealed versions are untouched.
    pub(crate) fn erase_active(&mut self, key: &Outpoint) -> bool {
        self.active.remove(key).is_some()
    }

    pub(crate) fn contains_active(&self, key: &Outpoint) -> bool {
        self.active.contains_key(key)
    }

    // =========================================================================
    // Rotation
    // =========================================================================

    /// Seal the active store into a new version file and reset it.
    /// No-op when the active store is empty.
    pub(crate) fn rotate(&mut self) -> Result<()> {
        if self.active.is_empty() {
            return Ok(());
        }

        let v = self.next_version;
        let mut entries: Vec<(&Outpoint, &ActiveEntry)> = self.active.iter().collect();
        entries.sort_unstable_by_key(|(key, _)| **key);

        let mut writer = VersionWriter::new(&self.data_path(v), self.slot_size)?;
        for (key, entry) in &entries {
            writer.add(key, entry.height, &entry.payload)?;
        }
        let meta = writer.finish()?;
        meta.save(&self.meta_path(v))?;

        tracing::debug!(
            "container {} rotated to version {} ({} entries sealed)",
            self.index,
            v,
            meta.entry_count
        );

        self.sealed.push(meta);
        self.next_version += 1;
        self.active.clear();
        Ok(())
    }

    // =========================================================================
    // Deferred Operations (sealed versions)
    // =========================================================================

    /// Resolve a find against sealed versions: newest to oldest, opening
    /// only files whose metadata range could contain the key. First match
    /// wins; exhausting all candidates means the key is not here.
    pub(crate) fn find_sealed(&self, key: &Outpoint) -> Result<Option<Vec<u8>>> {
        for v in (0..self.sealed.len()).rev() {
            if !self.sealed[v].key_in_range(key) {
                continue;
            }
            let mut file = VersionFile::open(&self.data_path(v as u64), self.slot_size, false)?;
            self.files_scanned.set(self.files_scanned.get() + 1);
            if let Some(hit) = file.find(key)? {
                return Ok(Some(hit.payload));
            }
        }
        Ok(None)
    }

    /// Resolve a batch of pending deletions against sealed versions. Each
    /// candidate file is scanned once for all still-unresolved keys; matches
    /// are tombstoned in place and their version's entry count updated and
    /// persisted. Resolved keys are removed from `remaining`; the return
    /// value is the number of tombstoned entries.
    pub(crate) fn process_deletions(&mut self, remaining: &mut Vec<Outpoint>) -> Result<usize> {
        let mut deleted = 0;

        for v in (0..self.sealed.len()).rev() {
            if remaining.is_empty() {
                break;
            }
            let candidates: Vec<Outpoint> = remaining
                .iter()
                .filter(|key| self.sealed[v].key_in_range(key))
                .copied()
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let mut file = VersionFile::open(&self.data_path(v as u64), self.slot_size, true)?;
            self.files_scanned.set(self.files_scanned.get() + 1);

            let hits = file.find_slots(&candidates)?;
            if hits.is_empty() {
                continue;
            }
            for (slot, key) in &hits {
                file.tombstone(*slot)?;
                self.sealed[v].update_on_delete();
                remaining.retain(|k| k != key);
                tracing::trace!(
                    "tombstoned {} in container {} version {}",
                    outpoint_hex(key),
                    self.index,
                    v
                );
            }
            file.sync()?;
            self.sealed[v].save(&self.meta_path(v as u64))?;
            deleted += hits.len();
        }

        Ok(deleted)
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Visit every live entry: active store first, then each sealed file's
    /// live slots.
    pub(crate) fn for_each_entry(
        &self,
        f: &mut dyn FnMut(&Outpoint, u32, &[u8]),
    ) -> Result<()> {
        for (key, entry) in &self.active {
            f(key, entry.height, &entry.payload);
        }
        for v in 0..self.sealed.len() {
            if self.sealed[v].entry_count == 0 {
                continue;
            }
            let mut file = VersionFile::open(&self.data_path(v as u64), self.slot_size, false)?;
            for entry in file.iter()? {
                let (key, height, payload) = entry?;
                f(&key, height, &payload);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Seal any remaining active entries and write the manifest
    pub(crate) fn close(&mut self) -> Result<()> {
        self.rotate()?;
        let manifest = ContainerManifest {
            slot_size: self.slot_size,
            next_version: self.next_version,
            live_entries: self.live_entries(),
        };
        manifest.save(&self.dir.join(version::manifest_file_name(self.index)))?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Live entries: active store plus sealed metadata counts
    pub(crate) fn live_entries(&self) -> u64 {
        self.active.len() as u64 + self.sealed.iter().map(|m| m.entry_count).sum::<u64>()
    }

    pub(crate) fn active_len(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn sealed_versions(&self) -> usize {
        self.sealed.len()
    }

    /// Sealed files opened for scanning since the last counter reset
    pub(crate) fn files_scanned(&self) -> u64 {
        self.files_scanned.get()
    }

    pub(crate) fn reset_files_scanned(&self) {
        self.files_scanned.set(0);
    }

    /// Bytes on disk across this container's data and metadata files
    pub(crate) fn disk_bytes(&self) -> Result<u64> {
        let mut total = 0;
        for v in 0..self.sealed.len() {
            for path in [self.data_path(v as u64), self.meta_path(v as u64)] {
                match fs::metadata(&path) {
                    Ok(m) => total += m.len(),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(total)
    }

    pub(crate) fn data_path(&self, v: u64) -> PathBuf {
        self.dir.join(version::data_file_name(self.index, v))
    }

    pub(crate) fn meta_path(&self, v: u64) -> PathBuf {
        self.dir.join(version::meta_file_name(self.index, v))
    }
}
