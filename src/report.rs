//! Sizing Report
//!
//! A point-in-time summary of how the store's containers are filled: entry
//! counts, version counts, and bytes on disk per size class. `Display`
//! renders the human-readable table.

use std::fmt;

/// Sizing summary for one container
#[derive(Debug, Clone)]
pub struct ContainerSizing {
    pub index: usize,
    /// Configured slot size (bytes)
    pub slot_size: u32,
    /// Largest payload the slot holds
    pub effective_capacity: usize,
    /// Slots per sealed version file
    pub slots_per_file: u64,
    /// Entries currently in the active store
    pub active_entries: usize,
    /// Sealed version files
    pub sealed_versions: usize,
    /// Live entries, active plus sealed
    pub live_entries: u64,
    /// Bytes on disk across data and metadata files
    pub disk_bytes: u64,
}

/// Store-wide sizing report
#[derive(Debug, Clone)]
pub struct SizingReport {
    pub containers: Vec<ContainerSizing>,
    pub total_live_entries: u64,
    pub pending_deletions: usize,
}

impl fmt::Display for SizingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== UTXO Store Sizing ===")?;
        writeln!(f, "Total live entries: {}", self.total_live_entries)?;
        writeln!(f, "Pending deletions:  {}", self.pending_deletions)?;
        for c in &self.containers {
            writeln!(
                f,
                "Container {} (slot {} B, payload <= {} B):",
                c.index, c.slot_size, c.effective_capacity
            )?;
            writeln!(f, "  Active entries:  {}", c.active_entries)?;
            writeln!(f, "  Sealed versions: {}", c.sealed_versions)?;
            writeln!(f, "  Live entries:    {}", c.live_entries)?;
            writeln!(
                f,
                "  On disk:         {:.2} MB",
                c.disk_bytes as f64 / (1024.0 * 1024.0)
            )?;
        }
        Ok(())
    }
}
