// Path: crates/types/src/codec.rs

//! The canonical, deterministic binary codec for persisted records.
//!
//! Submissions, markers and other records written by the durable store are
//! serialized with `parity-scale-codec` (SCALE). Centralizing the calls here keeps
//! every backend on the exact same on-disk representation.
//!
//! This codec is for storage only. Query payloads and value bytes exchanged with
//! the reporting network use the word-aligned tuple codec in `oraclegate-api`.

use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a record into its canonical SCALE byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Result<Vec<u8>, String> {
    Ok(v.encode())
}

/// Decodes a record from its canonical SCALE byte representation.
///
/// Fails on any decoding error, including trailing bytes, so that a corrupted
/// record is surfaced instead of being partially read.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, String> {
    T::decode_all(&mut &*b).map_err(|e| format!("canonical decode failed: {}", e))
}
