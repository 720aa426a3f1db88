//! Core types for the UTXO store
//!
//! An outpoint identifies one transaction output: the 32-byte id of the
//! transaction that created it plus the output's index within that
//! transaction. The store is agnostic to the exact encoding as long as the
//! same bytes are used consistently across operations.

use std::fmt::Write as _;

/// Size of a transaction id in bytes
pub const TXID_SIZE: usize = 32;

/// Size of an outpoint in bytes (txid + 4-byte output index)
pub const OUTPOINT_SIZE: usize = 36;

/// Raw outpoint key: `[txid: 32 bytes][output_index: u32 LE]`
///
/// Ordered by raw byte comparison (the array's `Ord`).
pub type Outpoint = [u8; OUTPOINT_SIZE];

/// Build an outpoint from a txid and an output index (little-endian)
pub fn make_outpoint(txid: &[u8; TXID_SIZE], index: u32) -> Outpoint {
    let mut out = [0u8; OUTPOINT_SIZE];
    out[..TXID_SIZE].copy_from_slice(txid);
    out[TXID_SIZE..].copy_from_slice(&index.to_le_bytes());
    out
}

/// Extract the txid portion of an outpoint
pub fn txid(outpoint: &Outpoint) -> &[u8] {
    &outpoint[..TXID_SIZE]
}

/// Extract the output index of an outpoint
pub fn output_index(outpoint: &Outpoint) -> u32 {
    u32::from_le_bytes(outpoint[TXID_SIZE..].try_into().unwrap())
}

/// Short hex rendering for log lines: first 8 txid bytes plus the index
pub fn outpoint_hex(outpoint: &Outpoint) -> String {
    let mut s = String::with_capacity(20);
    for b in &outpoint[..8] {
        let _ = write!(s, "{:02x}", b);
    }
    let _ = write!(s, "..:{}", output_index(outpoint));
    s
}
