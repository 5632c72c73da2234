// Path: crates/crypto/src/algorithms/hash/mod.rs
//! Identifier hash functions.
//!
//! The identifier width is a compatibility constant shared out-of-band by
//! reporters and consumers, so every implementation here produces exactly 32 bytes.

use sha3::{Digest, Keccak256};

/// A fixed-width, collision-resistant hash used to derive query identifiers.
pub trait HashFunction: Send + Sync {
    /// Hash a message and return the 32-byte digest.
    fn digest(&self, message: &[u8]) -> [u8; 32];

    /// Get the name of the hash function.
    fn name(&self) -> &str;
}

/// Keccak-256 (the pre-standard SHA-3 padding used by the reporting network).
#[derive(Default, Clone, Copy, Debug)]
pub struct Keccak256Hash;

impl HashFunction for Keccak256Hash {
    fn digest(&self, message: &[u8]) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(message);
        hasher.finalize().into()
    }

    fn name(&self) -> &str {
        "Keccak-256"
    }
}

/// Keccak-256 of any byte-like value.
pub fn keccak256<T: AsRef<[u8]>>(data: T) -> [u8; 32] {
    Keccak256Hash.digest(data.as_ref())
}
