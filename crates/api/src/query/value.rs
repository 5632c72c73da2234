// Path: crates/api/src/query/value.rs
//! Typed views over submitted value bytes.

use crate::abi::{self, AbiType, AbiValue};
use oraclegate_types::app::{Address, U256};
use oraclegate_types::error::{DecodeError, EncodingError};

/// The expected layout of a kind's value, e.g. `(bool released, address beneficiary)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueShape {
    fields: Vec<(String, AbiType)>,
}

impl ValueShape {
    /// Declares a shape from named fields, in encoding order.
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = (S, AbiType)>) -> Self {
        Self {
            fields: fields.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        }
    }

    /// The field types in encoding order.
    pub fn types(&self) -> Vec<AbiType> {
        self.fields.iter().map(|(_, t)| *t).collect()
    }

    /// The field names in encoding order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the shape has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The position of a named field.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }
}

/// A value decoded against a [`ValueShape`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedValue {
    fields: Vec<AbiValue>,
}

impl DecodedValue {
    /// All decoded fields in order.
    pub fn fields(&self) -> &[AbiValue] {
        &self.fields
    }

    fn field(&self, index: usize) -> Result<&AbiValue, DecodeError> {
        self.fields
            .get(index)
            .ok_or(DecodeError::FieldMissing { index })
    }

    /// Reads field `index` as a `bool`.
    pub fn bool_at(&self, index: usize) -> Result<bool, DecodeError> {
        match self.field(index)? {
            AbiValue::Bool(b) => Ok(*b),
            _ => Err(DecodeError::FieldType {
                index,
                expected: "bool",
            }),
        }
    }

    /// Reads field `index` as an address.
    pub fn address_at(&self, index: usize) -> Result<Address, DecodeError> {
        match self.field(index)? {
            AbiValue::Address(a) => Ok(*a),
            _ => Err(DecodeError::FieldType {
                index,
                expected: "address",
            }),
        }
    }

    /// Reads field `index` as an unsigned integer.
    pub fn uint_at(&self, index: usize) -> Result<U256, DecodeError> {
        match self.field(index)? {
            AbiValue::Uint(u) => Ok(*u),
            _ => Err(DecodeError::FieldType {
                index,
                expected: "uint",
            }),
        }
    }

    /// Reads field `index` as bytes (fixed or dynamic).
    pub fn bytes_at(&self, index: usize) -> Result<&[u8], DecodeError> {
        match self.field(index)? {
            AbiValue::Bytes(b) | AbiValue::FixedBytes(b) => Ok(b),
            _ => Err(DecodeError::FieldType {
                index,
                expected: "bytes",
            }),
        }
    }

    /// Reads field `index` as a string.
    pub fn string_at(&self, index: usize) -> Result<&str, DecodeError> {
        match self.field(index)? {
            AbiValue::String(s) => Ok(s),
            _ => Err(DecodeError::FieldType {
                index,
                expected: "string",
            }),
        }
    }
}

/// Strictly decodes value bytes against `shape`.
///
/// Any deviation from the canonical encoding of the shape is an error. Callers
/// treat a failure as "cannot interpret", never as a negative answer.
pub fn decode_value(bytes: &[u8], shape: &ValueShape) -> Result<DecodedValue, DecodeError> {
    let fields = abi::decode(bytes, &shape.types())?;
    Ok(DecodedValue { fields })
}

/// Encodes typed fields as value bytes of `shape`. Used by reporters.
pub fn encode_value(values: &[AbiValue], shape: &ValueShape) -> Result<Vec<u8>, EncodingError> {
    abi::encode(&shape.types(), values)
}
