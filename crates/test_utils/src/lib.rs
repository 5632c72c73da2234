// Path: crates/test_utils/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # oraclegate Test Utilities
//!
//! Seeded stores, deterministic identities and a recording escrow for tests
//! across the workspace.

pub mod assertions;
pub mod fixtures;
pub mod randomness;
