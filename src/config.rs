//! Configuration for utxostore
//!
//! Centralized configuration with sensible defaults.
//!
//! Each container holds values of one size class. `slot_sizes[i]` is the
//! fixed per-entry byte count of container `i` (block height + length field
//! + payload); `file_size_limits[i]` bounds the size of each sealed version
//! file and thereby the number of slots per file.

use std::path::PathBuf;

use crate::error::{Result, StoreError};
use crate::version;

/// Per-container slot sizes used in production (bytes)
pub const DEFAULT_SLOT_SIZES: [u32; 4] = [44, 128, 512, 10240];

/// Per-container version file size limits used in production (bytes)
pub const DEFAULT_FILE_SIZES: [u64; 4] = [
    2 * 1024 * 1024 * 1024, // 2 GiB
    2 * 1024 * 1024 * 1024, // 2 GiB
    100 * 1024 * 1024,      // 100 MiB
    50 * 1024 * 1024,       // 50 MiB
];

/// Version file size limit used by the testing preset (bytes)
pub const TEST_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MiB

/// Main configuration for a store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files.
    /// Internal structure (per container `c`, version `v`):
    ///   {data_dir}/
    ///     ├── data_{c}_{v:05}.dat    (sealed version file)
    ///     ├── meta_{c}_{v:05}.dat    (88-byte metadata record)
    ///     └── manifest_{c}.dat       (per-container manifest)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Container Configuration
    // -------------------------------------------------------------------------
    /// Slot size per container, ascending. One container per entry.
    pub slot_sizes: Vec<u32>,

    /// Version file size limit per container (same length as `slot_sizes`)
    pub file_size_limits: Vec<u64>,

    /// Remove any existing store files under `data_dir` before opening
    pub remove_existing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./utxostore_data"),
            slot_sizes: DEFAULT_SLOT_SIZES.to_vec(),
            file_size_limits: DEFAULT_FILE_SIZES.to_vec(),
            remove_existing: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Testing preset: production size classes, small (10 MiB) version files
    /// so rotation and compaction are exercised with modest data volumes.
    pub fn for_testing(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_size_limits: vec![TEST_FILE_SIZE; DEFAULT_SLOT_SIZES.len()],
            ..Self::default()
        }
    }

    /// Validate container geometry before opening a store
    pub fn validate(&self) -> Result<()> {
        if self.slot_sizes.is_empty() {
            return Err(StoreError::Config("at least one container required".into()));
        }
        if self.slot_sizes.len() != self.file_size_limits.len() {
            return Err(StoreError::Config(format!(
                "{} slot sizes but {} file size limits",
                self.slot_sizes.len(),
                self.file_size_limits.len()
            )));
        }
        for window in self.slot_sizes.windows(2) {
            if window[0] >= window[1] {
                return Err(StoreError::Config(format!(
                    "slot sizes must be strictly ascending ({} then {})",
                    window[0], window[1]
                )));
            }
        }
        for (i, &slot_size) in self.slot_sizes.iter().enumerate() {
            let overhead = version::slot_overhead(slot_size) as u32;
            if slot_size <= overhead {
                return Err(StoreError::Config(format!(
                    "slot size {} leaves no payload capacity (overhead {})",
                    slot_size, overhead
                )));
            }
            let stride = version::slot_stride(slot_size);
            if self.file_size_limits[i] < version::HEADER_SIZE + stride {
                return Err(StoreError::Config(format!(
                    "file size limit {} cannot hold a single {}-byte slot",
                    self.file_size_limits[i], stride
                )));
            }
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the per-container slot sizes (ascending)
    pub fn slot_sizes(mut self, sizes: impl Into<Vec<u32>>) -> Self {
        self.config.slot_sizes = sizes.into();
        self
    }

    /// Set the per-container version file size limits
    pub fn file_size_limits(mut self, limits: impl Into<Vec<u64>>) -> Self {
        self.config.file_size_limits = limits.into();
        self
    }

    /// Remove existing store files before opening
    pub fn remove_existing(mut self, remove: bool) -> Self {
        self.config.remove_existing = remove;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
