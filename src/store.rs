//! Store Module
//!
//! The top-level UTXO store coordinating all components: value routing,
//! size-class containers, the pending-deletion queue, and the open/close
//! persistence lifecycle.
//!
//! ## Execution Model: Single-Threaded, Synchronous
//!
//! - All operations run on the calling thread; disk writes for rotation and
//!   close() are synchronous flushes. Nothing retries automatically.
//! - Mutating operations take `&mut self`; there is no internal locking.
//! - `compact_all()` requires exclusive use of the store. This is a
//!   precondition on the caller, which `&mut self` already expresses —
//!   do not interleave other operations with an in-progress compaction.
//! - Durability is a close() property: entries still in an active store are
//!   lost if the process dies before close() returns.

use std::fs;
use std::path::Path;

use crate::compactor::{self, TMP_SUFFIX};
use crate::config::Config;
use crate::container::Container;
use crate::deferred::{PendingDeletions, PendingOutcome};
use crate::error::{Result, StoreError};
use crate::report::{ContainerSizing, SizingReport};
use crate::router::ValueRouter;
use crate::types::{outpoint_hex, Outpoint};
use crate::version::data_capacity;

/// An embedded, disk-backed UTXO store partitioned into size-class
/// containers with rotation, deferred deletion, and compaction.
pub struct UtxoStore {
    config: Config,
    router: ValueRouter,
    containers: Vec<Container>,
    pending: PendingDeletions,
    /// Cached live-entry count, scoped to this instance. Recomputed from
    /// on-disk metadata at open(), never carried over.
    entries: u64,
}

impl UtxoStore {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open or create a store with the given config.
    ///
    /// On startup:
    /// 1. Validate container geometry
    /// 2. Sweep temporaries left by an interrupted compaction
    /// 3. Reopen each container: discover sealed versions, load or rebuild
    ///    their metadata, start an empty active store
    /// 4. Recompute the live-entry count from metadata entry counts
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        if config.remove_existing && config.data_dir.exists() {
            fs::remove_dir_all(&config.data_dir)?;
        }
        fs::create_dir_all(&config.data_dir)?;
        sweep_temporaries(&config.data_dir)?;

        let router = ValueRouter::new(&config.slot_sizes);
        let mut containers = Vec::with_capacity(config.slot_sizes.len());
        for (i, &slot_size) in config.slot_sizes.iter().enumerate() {
            containers.push(Container::open(
                i,
                slot_size,
                config.file_size_limits[i],
                &config.data_dir,
            )?);
        }

        let entries = containers.iter().map(|c| c.live_entries()).sum();
        tracing::info!(
            "store opened at {} with {} containers, {} live entries",
            config.data_dir.display(),
            containers.len(),
            entries
        );

        Ok(Self {
            config,
            router,
            containers,
            pending: PendingDeletions::new(),
            entries,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses the default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.data_dir = path.to_path_buf();
        Self::open(config)
    }

    /// Close the store: seal every non-empty active store into a version
    /// file (even below the rotation threshold), persist metadata, and write
    /// each container's manifest. The store cannot be used afterwards.
    pub fn close(mut self) -> Result<()> {
        for container in &mut self.containers {
            container.close()?;
        }
        tracing::info!(
            "store closed at {} with {} live entries",
            self.config.data_dir.display(),
            self.entries
        );
        Ok(())
    }

    // =========================================================================
    // Core Operations
    // =========================================================================

    /// Insert a UTXO created at `height`.
    ///
    /// The value is routed to the smallest container whose effective
    /// capacity holds it. Fails with `DuplicateKey` when the key is live
    /// anywhere — an active store or a sealed, non-tombstoned slot. A key
    /// queued for deferred deletion is still live until the queue is
    /// processed.
    pub fn insert(&mut self, key: &Outpoint, value: &[u8], height: u32) -> Result<()> {
        let index = self.router.route(value.len())?;

        if self.is_live(key)? {
            tracing::warn!("insert: duplicate key {}", outpoint_hex(key));
            return Err(StoreError::DuplicateKey);
        }

        self.containers[index].insert(key, height, value.to_vec())?;
        self.entries += 1;
        Ok(())
    }

    /// Find a UTXO by key.
    ///
    /// Active stores are checked first (O(1)); on a miss the sealed versions
    /// of each container are scanned newest to oldest, pruned by their
    /// metadata ranges. `Ok(None)` is a normal outcome.
    pub fn find(&self, key: &Outpoint) -> Result<Option<Vec<u8>>> {
        for container in &self.containers {
            if let Some(entry) = container.find_active(key) {
                return Ok(Some(entry.payload.clone()));
            }
        }
        for container in &self.containers {
            if let Some(payload) = container.find_sealed(key)? {
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    /// Erase a UTXO by key.
    ///
    /// A key in an active store is removed immediately (returns true).
    /// Otherwise the key is queued for deferred deletion and false is
    /// returned — the hot path never scans sealed files. Queued keys are
    /// resolved only by `process_pending_deletions`; a key that matches no
    /// sealed slot surfaces there as a not-found outcome.
    pub fn erase(&mut self, key: &Outpoint) -> bool {
        for container in &mut self.containers {
            if container.erase_active(key) {
                self.entries -= 1;
                return true;
            }
        }
        self.pending.enqueue(key);
        false
    }

    // =========================================================================
    // Deferred Deletions
    // =========================================================================

    /// Number of queued pending deletions
    pub fn pending_deletions(&self) -> usize {
        self.pending.len()
    }

    /// Process up to `batch_size` pending deletions against the sealed
    /// versions. Candidate files are selected by metadata pruning and each
    /// is scanned once for the whole batch; matches are tombstoned in place.
    /// Keys matching no sealed slot are returned in
    /// [`PendingOutcome::not_found`].
    pub fn process_pending_deletions(&mut self, batch_size: usize) -> Result<PendingOutcome> {
        let mut remaining = self.pending.pop_batch(batch_size);
        if remaining.is_empty() {
            return Ok(PendingOutcome::default());
        }
        tracing::debug!("processing {} pending deletions", remaining.len());

        let mut deleted = 0;
        for container in &mut self.containers {
            if remaining.is_empty() {
                break;
            }
            deleted += container.process_deletions(&mut remaining)?;
        }

        self.entries -= deleted as u64;
        tracing::debug!(
            "pending deletions processed: {} deleted, {} not found",
            deleted,
            remaining.len()
        );
        Ok(PendingOutcome {
            deleted,
            not_found: remaining,
        })
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Compact every container: drop tombstoned slots, rewrite survivors
    /// into a minimal set of version files renumbered from zero, and
    /// regenerate their metadata. Blocking; requires exclusive use of the
    /// store. The live-entry count and key→value mapping are unchanged.
    pub fn compact_all(&mut self) -> Result<()> {
        tracing::info!("starting full store compaction");
        for (i, container) in self.containers.iter_mut().enumerate() {
            let summary = compactor::compact(container)?;
            tracing::debug!(
                "container {} compacted: {} -> {} version files, {} live entries, {} tombstones dropped",
                i,
                summary.files_before,
                summary.files_after,
                summary.live_entries,
                summary.tombstones_dropped
            );
        }
        tracing::info!("full store compaction complete");
        Ok(())
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Visit every live key, container by container
    pub fn for_each_key(&self, mut f: impl FnMut(&Outpoint)) -> Result<()> {
        self.for_each_entry(|key, _, _| f(key))
    }

    /// Visit every live entry as (key, height, payload). Entries queued for
    /// deletion but not yet processed are still visited.
    pub fn for_each_entry(&self, mut f: impl FnMut(&Outpoint, u32, &[u8])) -> Result<()> {
        for container in &self.containers {
            container.for_each_entry(&mut f)?;
        }
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Total live entries across all containers
    pub fn size(&self) -> u64 {
        self.entries
    }

    /// Build a sizing report over all containers
    pub fn get_sizing_report(&self) -> Result<SizingReport> {
        let mut containers = Vec::with_capacity(self.containers.len());
        for c in &self.containers {
            containers.push(ContainerSizing {
                index: c.index,
                slot_size: c.slot_size,
                effective_capacity: data_capacity(c.slot_size),
                slots_per_file: c.slots_per_file,
                active_entries: c.active_len(),
                sealed_versions: c.sealed_versions(),
                live_entries: c.live_entries(),
                disk_bytes: c.disk_bytes()?,
            });
        }
        Ok(SizingReport {
            containers,
            total_live_entries: self.entries,
            pending_deletions: self.pending.len(),
        })
    }

    /// Sealed files opened for scanning since the last reset, summed across
    /// containers. Instruments metadata pruning: lookups should touch only
    /// files whose range covers the key.
    pub fn sealed_files_scanned(&self) -> u64 {
        self.containers.iter().map(|c| c.files_scanned()).sum()
    }

    /// Reset the sealed-file scan counters
    pub fn reset_scan_counters(&self) {
        for container in &self.containers {
            container.reset_files_scanned();
        }
    }

    /// The store's data directory
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// The store's configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Whether `key` is live anywhere: an active store, or a sealed
    /// non-tombstoned slot of any container.
    fn is_live(&self, key: &Outpoint) -> Result<bool> {
        for container in &self.containers {
            if container.contains_active(key) {
                return Ok(true);
            }
        }
        for container in &self.containers {
            if container.find_sealed(key)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Remove files left behind by an interrupted compaction
fn sweep_temporaries(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(TMP_SUFFIX))
        {
            tracing::warn!("removing leftover temporary {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
