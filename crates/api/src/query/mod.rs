// Path: crates/api/src/query/mod.rs
//! Canonical query payloads and the identifiers derived from them.
//!
//! A payload is the two-field tuple `(string kind, bytes parameters)`, where
//! `parameters` is itself the tuple encoding of the kind's typed arguments. The
//! identifier is the Keccak-256 of the payload. Reporters and consumers that use
//! the same kind tag and parameter values always arrive at the same identifier.

use crate::abi::{self, AbiType, AbiValue};
use oraclegate_crypto::keccak256;
use oraclegate_types::app::QueryId;
use oraclegate_types::error::{DecodeError, EncodingError};
use std::fmt;

mod value;
pub use value::*;

/// The outer shape of every query payload.
pub const PAYLOAD_SHAPE: [AbiType; 2] = [AbiType::String, AbiType::Bytes];

/// An ordered, typed parameter tuple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryParameters {
    shape: Vec<AbiType>,
    values: Vec<AbiValue>,
}

impl QueryParameters {
    /// Pairs a shape with its values. Agreement is checked when the tuple is encoded.
    pub fn new(shape: Vec<AbiType>, values: Vec<AbiValue>) -> Self {
        Self { shape, values }
    }

    /// The declared field types.
    pub fn shape(&self) -> &[AbiType] {
        &self.shape
    }

    /// The field values.
    pub fn values(&self) -> &[AbiValue] {
        &self.values
    }

    /// The tuple encoding of the parameters alone.
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        abi::encode(&self.shape, &self.values)
    }
}

/// The canonical byte encoding of `(kind, encoded parameters)`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QueryPayload(Vec<u8>);

impl QueryPayload {
    /// Wraps bytes received from elsewhere. No validation is performed; use
    /// [`decode_payload`] to check them.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the payload and returns its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for QueryPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for QueryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryPayload(0x{})", hex::encode(&self.0))
    }
}

/// Builds the canonical payload for `kind` and `params`.
///
/// Deterministic: equal inputs always yield equal bytes.
pub fn build_payload(kind: &str, params: &QueryParameters) -> Result<QueryPayload, EncodingError> {
    let inner = params.encode()?;
    let outer = abi::encode(
        &PAYLOAD_SHAPE,
        &[AbiValue::String(kind.to_string()), AbiValue::Bytes(inner)],
    )?;
    Ok(QueryPayload(outer))
}

/// Hashes a payload into its query identifier.
pub fn derive_identifier(payload: &QueryPayload) -> QueryId {
    QueryId(keccak256(payload.as_bytes()))
}

/// Builds the payload and derives its identifier in one step.
pub fn query_id(kind: &str, params: &QueryParameters) -> Result<(QueryPayload, QueryId), EncodingError> {
    let payload = build_payload(kind, params)?;
    let id = derive_identifier(&payload);
    Ok((payload, id))
}

/// Splits a payload into its kind tag and encoded parameter bytes.
pub fn decode_payload(payload: &[u8]) -> Result<(String, Vec<u8>), DecodeError> {
    let mut fields = abi::decode(payload, &PAYLOAD_SHAPE)?.into_iter();
    match (fields.next(), fields.next()) {
        (Some(AbiValue::String(kind)), Some(AbiValue::Bytes(params))) => Ok((kind, params)),
        _ => Err(DecodeError::NonCanonical("payload is not (string, bytes)".into())),
    }
}

/// Decodes parameter bytes against the expected shape.
pub fn decode_parameters(bytes: &[u8], shape: &[AbiType]) -> Result<QueryParameters, DecodeError> {
    let values = abi::decode(bytes, shape)?;
    Ok(QueryParameters::new(shape.to_vec(), values))
}
