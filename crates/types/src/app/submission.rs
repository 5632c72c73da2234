// Path: crates/types/src/app/submission.rs
//! Records produced by the reporting network and views handed to consumers.

use super::{Address, QueryId, Timestamp};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// One reporter's timestamped, nonced value for a query identifier.
///
/// Submissions are append-only. The only mutable field is `disputed`, which moves
/// from `false` to `true` at most once.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    /// The query this value answers.
    pub identifier: QueryId,
    /// The opaque, codec-encoded value bytes.
    pub value: Vec<u8>,
    /// When the store accepted the submission.
    pub submitted_at: Timestamp,
    /// The reporter that submitted the value.
    pub reporter: Address,
    /// The reporter's nonce for this identifier.
    pub nonce: u64,
    /// Store-assigned append position, strictly increasing across the store.
    pub sequence: u64,
    /// Whether the value has been disputed and must no longer be trusted.
    pub disputed: bool,
}

impl Submission {
    /// The listing order key: `submitted_at`, then `nonce`, then `sequence`.
    pub fn order_key(&self) -> (Timestamp, u64, u64) {
        (self.submitted_at, self.nonce, self.sequence)
    }

    /// Projects the fields a consumer is allowed to rely on.
    pub fn to_retrieved(&self) -> RetrievedValue {
        RetrievedValue {
            value: self.value.clone(),
            submitted_at: self.submitted_at,
            reporter: self.reporter,
        }
    }
}

/// A value that passed retrieval validation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RetrievedValue {
    /// The raw value bytes.
    pub value: Vec<u8>,
    /// When the value was submitted.
    pub submitted_at: Timestamp,
    /// Who submitted it.
    pub reporter: Address,
}

/// The consumer-facing "current value" view.
///
/// Absence is reported as `found = false` with empty bytes and a zero timestamp,
/// never as an error: "not yet reported" is a steady state, not a failure.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct CurrentValue {
    /// Whether a non-disputed value exists.
    pub found: bool,
    /// The value bytes, empty when `found` is false.
    pub value: Vec<u8>,
    /// The submission time, zero when `found` is false.
    pub submitted_at: Timestamp,
}

impl From<Option<RetrievedValue>> for CurrentValue {
    fn from(v: Option<RetrievedValue>) -> Self {
        match v {
            Some(r) => Self {
                found: true,
                value: r.value,
                submitted_at: r.submitted_at,
            },
            None => Self::default(),
        }
    }
}
