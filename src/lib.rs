//! # utxostore
//!
//! An embedded, disk-backed UTXO store with:
//! - Size-class routing of values into capacity-bounded containers
//! - Rotation of each container's active store into immutable version files
//! - Deferred (batched) deletion against sealed versions
//! - Metadata-based range pruning to skip irrelevant files
//! - Compaction to reclaim tombstoned space
//!
//! ## Architecture Overview
//!
//! ```text
//! insert(key, value, height)          find(key) / erase(key)
//!        │                                    │
//! ┌──────▼──────┐                             │
//! │ Value Router│ (payload length →           │
//! │             │  size class)                │
//! └──────┬──────┘                             │
//!        │              ┌─────────────────────┘
//! ┌──────▼──────────────▼──────────────────────────────┐
//! │ Container (one per size class)                     │
//! │   ┌─────────────┐     ┌──────────────────────────┐ │
//! │   │ Active Store│ ──► │ Sealed Version Files     │ │
//! │   │ (in memory) │ seal│ + 88-byte Metadata Index │ │
//! │   └─────────────┘     └──────────────────────────┘ │
//! │          erase miss ──► Pending Deletions queue    │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups that miss the active stores consult the metadata indexes, newest
//! version first, and open only files whose key range could contain the
//! target. Erasures that miss the active stores are queued and resolved in
//! batches by an explicit `process_pending_deletions` call.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod types;
pub mod router;
pub mod version;
pub mod container;
pub mod deferred;
pub mod report;
pub mod store;

mod compactor;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use deferred::PendingOutcome;
pub use error::{Result, StoreError};
pub use report::SizingReport;
pub use store::UtxoStore;
pub use types::{make_outpoint, Outpoint, OUTPOINT_SIZE, TXID_SIZE};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of utxostore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
