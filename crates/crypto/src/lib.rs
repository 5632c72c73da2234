// Path: crates/crypto/src/lib.rs
//! # oraclegate Crypto Crate Lints
//!
//! Panics are disallowed in non-test code.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # oraclegate Cryptography
//!
//! The one-way function that turns a canonical query payload into its identifier.

pub mod algorithms;

pub use algorithms::hash::{keccak256, HashFunction, Keccak256Hash};
