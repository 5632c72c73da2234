// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # oraclegate Types
//!
//! This crate is the foundational library for oraclegate, containing the shared
//! data model of the query/response contract, the error taxonomy, and the
//! configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `oraclegate-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. This prevents circular
//! dependencies and provides a single canonical definition for shared types like
//! `QueryId`, `Address`, and `Submission`.

/// The maximum size in bytes of a single submitted value.
pub const MAX_VALUE_BYTES: usize = 64 * 1024; // 64 KiB
/// The width in bytes of a query identifier. Reporters and consumers must agree on it.
pub const QUERY_ID_LEN: usize = 32;

/// Identity and record types: `Address`, `QueryId`, `Submission`, `RetrievedValue`.
pub mod app;
/// The canonical, deterministic binary codec for persisted records.
pub mod codec;
/// Configuration structures loaded from TOML.
pub mod config;
/// The unified error taxonomy.
pub mod error;
/// Well-known query kinds.
pub mod keys;
