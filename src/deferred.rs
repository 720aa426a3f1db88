//! Pending Deletions
//!
//! Erasures that miss the active stores are queued here instead of scanning
//! sealed files inline. The queue is drained only by an explicit
//! `process_pending_deletions` call — deletions against sealed data are
//! never resolved implicitly, keeping behavior deterministic.

use std::collections::{HashSet, VecDeque};

use crate::types::Outpoint;

/// FIFO queue of keys awaiting deletion from sealed versions.
///
/// Enqueueing is idempotent: a key already queued is not queued twice.
#[derive(Debug, Default)]
pub struct PendingDeletions {
    queue: VecDeque<Outpoint>,
    queued: HashSet<Outpoint>,
}

impl PendingDeletions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a key for deferred deletion. Returns false if already queued.
    pub fn enqueue(&mut self, key: &Outpoint) -> bool {
        if !self.queued.insert(*key) {
            return false;
        }
        self.queue.push_back(*key);
        true
    }

    /// Pop up to `batch_size` keys, oldest first
    pub fn pop_batch(&mut self, batch_size: usize) -> Vec<Outpoint> {
        let take = batch_size.min(self.queue.len());
        let batch: Vec<Outpoint> = self.queue.drain(..take).collect();
        for key in &batch {
            self.queued.remove(key);
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Result of one `process_pending_deletions` call
#[derive(Debug, Default)]
pub struct PendingOutcome {
    /// Keys found in a sealed version and tombstoned
    pub deleted: usize,
    /// Popped keys that matched no sealed slot — a normal outcome, reported
    /// back to the caller rather than raised as an error
    pub not_found: Vec<Outpoint>,
}
