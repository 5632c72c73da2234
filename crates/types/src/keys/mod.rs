// Path: crates/types/src/keys/mod.rs
//! Well-known query kinds.
//!
//! A query kind is the string tag that, together with the encoded parameter tuple,
//! forms the canonical payload. Reporters and consumers must use byte-identical
//! tags or they will derive different identifiers.

/// "Has album X of crowdfund contract Y been released?" Parameters are
/// `(address contract, uint256 albumId)`, the value is `(bool released, address beneficiary)`.
pub const ALBUM_DROP_KIND: &str = "albumDrop";

/// Table holding every submission, keyed by `[query_id][submitted_at][nonce][sequence]`.
pub const SUBMISSIONS_TABLE: &str = "SUBMISSIONS";
/// Table mapping `[query_id][nonce][sequence]` to the primary submission key.
pub const NONCE_INDEX_TABLE: &str = "NONCE_INDEX";
/// Table holding the last accepted nonce per `[query_id][reporter]`.
pub const LAST_NONCE_TABLE: &str = "LAST_NONCE";
/// Table holding the store-wide sequence counter.
pub const SEQUENCE_TABLE: &str = "SEQUENCE";
/// Table holding the query payload that produced an identifier.
pub const QUERY_PAYLOADS_TABLE: &str = "QUERY_PAYLOADS";
/// Table holding the consumer's "already acted" markers.
pub const ACTED_MARKERS_TABLE: &str = "ACTED_MARKERS";
