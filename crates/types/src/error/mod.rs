// Path: crates/types/src/error/mod.rs
//! Core error types for oraclegate.
//!
//! "No qualifying value" is deliberately absent from this module: it is an
//! ordinary outcome (`Option::None`, `CurrentValue { found: false, .. }`,
//! `ConditionOutcome::Unsatisfied`) and never travels as an error.

use crate::app::{Address, QueryId};
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors produced when parsing textual identifiers and integers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input was not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    /// The decoded input had the wrong number of bytes.
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// The required byte length.
        expected: usize,
        /// The byte length that was supplied.
        got: usize,
    },
    /// The input was not a valid unsigned integer.
    #[error("invalid integer: {0}")]
    InvalidInteger(String),
}

impl ErrorCode for ParseError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidHex(_) => "PARSE_INVALID_HEX",
            Self::InvalidLength { .. } => "PARSE_INVALID_LENGTH",
            Self::InvalidInteger(_) => "PARSE_INVALID_INTEGER",
        }
    }
}

/// Errors raised while encoding a typed tuple into canonical bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The number of values does not match the declared shape.
    #[error("arity mismatch: shape declares {expected} fields, got {got} values")]
    ArityMismatch {
        /// Number of fields in the shape.
        expected: usize,
        /// Number of values supplied.
        got: usize,
    },
    /// A value's kind does not match the declared field type.
    #[error("field {index}: expected {expected}, got {got}")]
    TypeMismatch {
        /// Zero-based field position.
        index: usize,
        /// The declared field type.
        expected: String,
        /// The kind of the supplied value.
        got: String,
    },
    /// A value does not fit the declared field type.
    #[error("field {index}: value out of range for {ty}: {reason}")]
    OutOfRange {
        /// Zero-based field position.
        index: usize,
        /// The declared field type.
        ty: String,
        /// Why the value does not fit.
        reason: String,
    },
    /// The declared type itself is not representable (e.g. `uint7`, `bytes33`).
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
}

impl ErrorCode for EncodingError {
    fn code(&self) -> &'static str {
        match self {
            Self::ArityMismatch { .. } => "ENCODING_ARITY_MISMATCH",
            Self::TypeMismatch { .. } => "ENCODING_TYPE_MISMATCH",
            Self::OutOfRange { .. } => "ENCODING_OUT_OF_RANGE",
            Self::UnsupportedType(_) => "ENCODING_UNSUPPORTED_TYPE",
        }
    }
}

/// Errors raised while strictly decoding bytes against an expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended before a required word or tail could be read.
    #[error("truncated input: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Byte offset of the read.
        offset: usize,
        /// Bytes required.
        needed: usize,
        /// Bytes remaining.
        available: usize,
    },
    /// A `bool` word held something other than 0 or 1.
    #[error("field {index}: invalid bool word")]
    InvalidBool {
        /// Zero-based field position.
        index: usize,
    },
    /// Padding bytes were not zero.
    #[error("field {index}: non-zero padding")]
    DirtyPadding {
        /// Zero-based field position.
        index: usize,
    },
    /// An integer word exceeded the declared bit width.
    #[error("field {index}: integer exceeds {bits} bits")]
    IntegerOverflow {
        /// Zero-based field position.
        index: usize,
        /// The declared width.
        bits: u16,
    },
    /// A dynamic field's offset or length pointed outside the input.
    #[error("field {index}: invalid offset or length {value}")]
    InvalidOffset {
        /// Zero-based field position.
        index: usize,
        /// The offending offset or length word, saturated to `u64`.
        value: u64,
    },
    /// A `string` field was not valid UTF-8.
    #[error("field {index}: invalid utf-8")]
    InvalidUtf8 {
        /// Zero-based field position.
        index: usize,
    },
    /// The input decoded, but is not the canonical encoding of the result
    /// (trailing bytes, gaps between tails, out-of-order offsets).
    #[error("non-canonical encoding: {0}")]
    NonCanonical(String),
    /// A decoded field was read with the wrong accessor.
    #[error("field {index}: expected {expected}")]
    FieldType {
        /// Zero-based field position.
        index: usize,
        /// The kind the caller asked for.
        expected: &'static str,
    },
    /// A decoded field was requested beyond the tuple's arity.
    #[error("field {index} does not exist")]
    FieldMissing {
        /// Zero-based field position.
        index: usize,
    },
    /// The expected shape contains an unrepresentable type.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
}

impl ErrorCode for DecodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Truncated { .. } => "DECODE_TRUNCATED",
            Self::InvalidBool { .. } => "DECODE_INVALID_BOOL",
            Self::DirtyPadding { .. } => "DECODE_DIRTY_PADDING",
            Self::IntegerOverflow { .. } => "DECODE_INTEGER_OVERFLOW",
            Self::InvalidOffset { .. } => "DECODE_INVALID_OFFSET",
            Self::InvalidUtf8 { .. } => "DECODE_INVALID_UTF8",
            Self::NonCanonical(_) => "DECODE_NON_CANONICAL",
            Self::FieldType { .. } => "DECODE_FIELD_TYPE",
            Self::FieldMissing { .. } => "DECODE_FIELD_MISSING",
            Self::UnsupportedType(_) => "DECODE_UNSUPPORTED_TYPE",
        }
    }
}

/// Errors related to the value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The nonce is not strictly greater than the reporter's previous nonce for
    /// this identifier. The submission was discarded.
    #[error("stale nonce {nonce} from reporter {reporter}; last accepted was {last}")]
    StaleNonce {
        /// The reporter whose submission was rejected.
        reporter: Address,
        /// The rejected nonce.
        nonce: u64,
        /// The last nonce accepted from this reporter for the identifier.
        last: u64,
    },
    /// No submission matches the identifier/nonce pair.
    #[error("no submission for {identifier} with nonce {nonce}")]
    NotFound {
        /// The identifier that was searched.
        identifier: QueryId,
        /// The nonce that was searched.
        nonce: u64,
    },
    /// The value exceeds the store's size bound.
    #[error("value of {size} bytes exceeds the maximum of {max}")]
    ValueTooLarge {
        /// Size of the rejected value.
        size: usize,
        /// The configured maximum.
        max: usize,
    },
    /// A failure in the storage backend. Transient: callers may retry with backoff.
    #[error("backend error: {0}")]
    Backend(String),
    /// A storage read did not complete within the caller's deadline. Transient.
    #[error("storage read timed out after {millis} ms")]
    Timeout {
        /// The deadline that elapsed.
        millis: u64,
    },
    /// A persisted record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether the failure is an I/O condition that may succeed on retry.
    ///
    /// A transient failure must never be interpreted as "no qualifying value".
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Timeout { .. })
    }
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::StaleNonce { .. } => "STORE_STALE_NONCE",
            Self::NotFound { .. } => "STORE_NOT_FOUND",
            Self::ValueTooLarge { .. } => "STORE_VALUE_TOO_LARGE",
            Self::Backend(_) => "STORE_BACKEND_ERROR",
            Self::Timeout { .. } => "STORE_TIMEOUT",
            Self::Corrupt(_) => "STORE_CORRUPT_RECORD",
        }
    }
}

/// Errors raised at the reporting ingress.
#[derive(Error, Debug)]
pub enum ReportingError {
    /// The supplied identifier is not the hash of the supplied query payload.
    #[error("identifier {expected} does not match payload hash {derived}")]
    IdentifierMismatch {
        /// The identifier the reporter claimed.
        expected: QueryId,
        /// The identifier derived from the payload.
        derived: QueryId,
    },
    /// The query payload is not a well-formed `(string, bytes)` tuple.
    #[error("malformed query payload: {0}")]
    MalformedPayload(#[from] DecodeError),
    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for ReportingError {
    fn code(&self) -> &'static str {
        match self {
            Self::IdentifierMismatch { .. } => "REPORTING_IDENTIFIER_MISMATCH",
            Self::MalformedPayload(_) => "REPORTING_MALFORMED_PAYLOAD",
            Self::Store(e) => e.code(),
        }
    }
}

/// Errors raised by a dependent action (e.g. releasing escrowed funds).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action inspected the decoded value and declined to run.
    #[error("action rejected: {0}")]
    Rejected(String),
    /// The action attempted to run and failed.
    #[error("action failed: {0}")]
    Failed(String),
}

impl ErrorCode for ActionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "ACTION_REJECTED",
            Self::Failed(_) => "ACTION_FAILED",
        }
    }
}

/// Errors raised by the conditional consumer.
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// No condition is registered for the query kind.
    #[error("unknown condition kind: {0}")]
    UnknownKind(String),
    /// The parameters could not be encoded for the registered shape.
    #[error("parameter encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    /// The store could not be read. Never collapsed into `Unsatisfied`.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The dependent action failed; no marker was written.
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl ErrorCode for ConsumerError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownKind(_) => "CONSUMER_UNKNOWN_KIND",
            Self::Encoding(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Action(e) => e.code(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid TOML for the expected schema.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// The configuration parsed but violates a constraint.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "CONFIG_IO",
            Self::Parse(_) => "CONFIG_PARSE",
            Self::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_io_failures_are_transient() {
        assert!(StoreError::Backend("disk".into()).is_transient());
        assert!(StoreError::Timeout { millis: 5 }.is_transient());
        assert!(!StoreError::StaleNonce {
            reporter: Address::ZERO,
            nonce: 1,
            last: 1
        }
        .is_transient());
        assert!(!StoreError::Corrupt("bad".into()).is_transient());
    }

    #[test]
    fn wrapped_errors_keep_inner_codes() {
        let e = ConsumerError::from(StoreError::Timeout { millis: 10 });
        assert_eq!(e.code(), "STORE_TIMEOUT");
        let e = ReportingError::from(DecodeError::NonCanonical("gap".into()));
        assert_eq!(e.code(), "REPORTING_MALFORMED_PAYLOAD");
    }
}
