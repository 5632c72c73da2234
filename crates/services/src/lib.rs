// Path: crates/services/src/lib.rs
#![forbid(unsafe_code)]
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

//! Services built on the value store: latest-valid retrieval, the reporting
//! ingress, and conditional consumers that act at most once per query.

pub mod consumer;
pub mod crowdfund;
pub mod reporting;
pub mod retrieval;
