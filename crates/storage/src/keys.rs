// Path: crates/storage/src/keys.rs
//! Prefix-encoded keys. Every integer is big-endian so byte order is numeric order.

use oraclegate_api::storage::be64;
use oraclegate_types::app::{Address, QueryId, Timestamp};
use oraclegate_types::error::StoreError;

/// `[query_id][submitted_at][nonce][sequence]`: byte order is listing order.
pub fn k_submission(id: &QueryId, submitted_at: Timestamp, nonce: u64, sequence: u64) -> Vec<u8> {
    [
        id.0.as_slice(),
        be64(submitted_at).as_slice(),
        be64(nonce).as_slice(),
        be64(sequence).as_slice(),
    ]
    .concat()
}

/// `[query_id][nonce]`, the prefix of every nonce-index entry for that nonce.
pub fn k_nonce_prefix(id: &QueryId, nonce: u64) -> Vec<u8> {
    [id.0.as_slice(), be64(nonce).as_slice()].concat()
}

/// `[query_id][nonce][sequence]`.
pub fn k_nonce_index(id: &QueryId, nonce: u64, sequence: u64) -> Vec<u8> {
    [id.0.as_slice(), be64(nonce).as_slice(), be64(sequence).as_slice()].concat()
}

/// `[query_id][reporter]`.
pub fn k_last_nonce(id: &QueryId, reporter: &Address) -> Vec<u8> {
    [id.0.as_slice(), reporter.0.as_slice()].concat()
}

pub const K_SEQUENCE: &[u8] = b"next";

pub fn parse_u64(bytes: &[u8]) -> Result<u64, StoreError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("expected 8-byte integer, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}
