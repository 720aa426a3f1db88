//! Version File Module
//!
//! A version file is one immutable, sealed chunk of a container's data,
//! created by rotation (or by the close-time flush) and destroyed only by
//! compaction. Slots are fixed-size, so the file is a flat array.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (10 bytes)                                            │
//! │   Magic: "UTXV" (4) | Format: u16 (2) | SlotSize: u32 (4)    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Slot 0 (36 + SlotSize bytes)                                 │
//! │   [Key: 36][Height: u32][Len: u8|u16][Payload, zero-padded]  │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Slot 1 ...                                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The length field is one byte when `SlotSize <= 255`, two bytes otherwise;
//! an all-ones length marks a tombstoned (deleted) slot. Effective payload
//! capacity is therefore `SlotSize - 4 - len_width`.

mod manifest;
mod metadata;
mod reader;
mod writer;

pub use manifest::ContainerManifest;
pub use metadata::{VersionMetadata, METADATA_SIZE};
pub use reader::{SlotHit, VersionFile, VersionIter};
pub use writer::VersionWriter;

use crate::types::OUTPOINT_SIZE;

// =============================================================================
// Shared Constants (used by writer, reader, container)
// =============================================================================

/// Magic bytes identifying a utxostore version file
pub(crate) const MAGIC: &[u8; 4] = b"UTXV";

/// Current version file format number
pub(crate) const FORMAT_VERSION: u16 = 1;

/// Header size: Magic (4) + Format (2) + SlotSize (4) = 10 bytes
pub const HEADER_SIZE: u64 = 10;

// =============================================================================
// Slot Geometry
// =============================================================================

/// Width in bytes of the payload length field for a slot size
pub fn len_field_width(slot_size: u32) -> usize {
    if slot_size <= 255 {
        1
    } else {
        2
    }
}

/// Fixed per-slot overhead: block height (4) + length field (1 or 2)
pub fn slot_overhead(slot_size: u32) -> usize {
    4 + len_field_width(slot_size)
}

/// Effective payload capacity of a slot
pub fn data_capacity(slot_size: u32) -> usize {
    slot_size as usize - slot_overhead(slot_size)
}

/// On-disk bytes per slot: key + slot body
pub fn slot_stride(slot_size: u32) -> u64 {
    (OUTPOINT_SIZE + slot_size as usize) as u64
}

// =============================================================================
// File Naming
// =============================================================================

/// Data file name for (container, version): `data_{c}_{v:05}.dat`
pub(crate) fn data_file_name(container: usize, version: u64) -> String {
    format!("data_{}_{:05}.dat", container, version)
}

/// Metadata side-file name for (container, version): `meta_{c}_{v:05}.dat`
pub(crate) fn meta_file_name(container: usize, version: u64) -> String {
    format!("meta_{}_{:05}.dat", container, version)
}

/// Manifest file name for a container: `manifest_{c}.dat`
pub(crate) fn manifest_file_name(container: usize) -> String {
    format!("manifest_{}.dat", container)
}

/// Parse a data file name back into (container, version)
pub(crate) fn parse_data_file_name(name: &str) -> Option<(usize, u64)> {
    let rest = name.strip_prefix("data_")?.strip_suffix(".dat")?;
    let (container, version) = rest.split_once('_')?;
    Some((container.parse().ok()?, version.parse().ok()?))
}
