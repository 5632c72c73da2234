// Path: crates/api/src/lib.rs

//! # oraclegate API Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
//! # oraclegate API
//!
//! The query codec and the storage contracts shared by every oraclegate
//! component. Reporters use it to build payloads and values; consumers use it
//! to derive identifiers and interpret what was reported.

/// The strict tuple codec.
pub mod abi;
/// Query payloads, identifiers and typed values.
pub mod query;
/// Traits for the value store and the consumer's marker store.
pub mod storage;
/// Injectable clocks.
pub mod time;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::abi::{AbiType, AbiValue};
    pub use crate::query::{
        build_payload, decode_payload, decode_value, derive_identifier, encode_value, query_id,
        DecodedValue, QueryParameters, QueryPayload, ValueShape,
    };
    pub use crate::storage::{ActedMarkerStore, SubmissionSnapshot, ValueStore};
    pub use crate::time::{Clock, ManualClock, SystemClock};
}
