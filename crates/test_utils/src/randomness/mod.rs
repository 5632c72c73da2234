// Path: crates/test_utils/src/randomness/mod.rs
//! Deterministic randomness for reproducible tests

use oraclegate_types::app::{Address, QueryId, U256};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Deterministic random number generator for tests
pub struct TestRng {
    rng: StdRng,
}

impl TestRng {
    /// Create a new test RNG with the specified seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fill a buffer with random bytes
    pub fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    pub fn address(&mut self) -> Address {
        Address(self.rng.gen())
    }

    pub fn query_id(&mut self) -> QueryId {
        QueryId(self.rng.gen())
    }

    pub fn u256(&mut self) -> U256 {
        U256(self.rng.gen())
    }

    /// A value of `len` random bytes.
    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        let mut v = vec![0u8; len];
        self.rng.fill_bytes(&mut v);
        v
    }
}

impl Default for TestRng {
    fn default() -> Self {
        Self::new(12345)
    }
}
