// Path: crates/api/src/abi/mod.rs
//! The tuple codec shared by reporters and consumers.
//!
//! Tuples are laid out as a head of 32-byte words followed by the tails of
//! dynamic fields. Static fields (`bool`, `address`, `uintN`, `bytesN`) occupy one
//! head word. Dynamic fields (`bytes`, `string`) put an offset into the head and a
//! length-prefixed, zero-padded body into the tail.
//!
//! Decoding is strict. Every padding byte is checked, every integer is checked
//! against its declared width, and the decoded tuple must re-encode to exactly the
//! input. Two byte strings that decode to the same tuple therefore cannot both be
//! accepted, which keeps identifiers and values unambiguous.

use oraclegate_types::app::{Address, U256};
use oraclegate_types::error::{DecodeError, EncodingError};
use std::fmt;
use std::str::FromStr;

/// The width of one head word.
pub const WORD: usize = 32;

/// A field type in a tuple shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// A boolean, encoded as the word 0 or 1.
    Bool,
    /// A 20-byte account address, left-padded.
    Address,
    /// An unsigned integer of the given bit width (8..=256, multiple of 8).
    Uint(u16),
    /// A fixed byte array of the given length (1..=32), right-padded.
    FixedBytes(u8),
    /// A length-prefixed byte string.
    Bytes,
    /// A length-prefixed UTF-8 string.
    String,
}

impl AbiType {
    /// Whether the field lives in the tail.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes | Self::String)
    }

    /// Rejects widths that have no encoding.
    pub fn check(&self) -> Result<(), String> {
        match *self {
            Self::Uint(bits) if bits == 0 || bits > 256 || bits % 8 != 0 => Err(self.to_string()),
            Self::FixedBytes(n) if n == 0 || n > 32 => Err(self.to_string()),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Address => f.write_str("address"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::FixedBytes(n) => write!(f, "bytes{n}"),
            Self::Bytes => f.write_str("bytes"),
            Self::String => f.write_str("string"),
        }
    }
}

impl FromStr for AbiType {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || EncodingError::UnsupportedType(s.to_string());
        let ty = match s {
            "bool" => Self::Bool,
            "address" => Self::Address,
            "uint" => Self::Uint(256),
            "bytes" => Self::Bytes,
            "string" => Self::String,
            _ => {
                if let Some(bits) = s.strip_prefix("uint") {
                    Self::Uint(bits.parse().map_err(|_| unsupported())?)
                } else if let Some(n) = s.strip_prefix("bytes") {
                    Self::FixedBytes(n.parse().map_err(|_| unsupported())?)
                } else {
                    return Err(unsupported());
                }
            }
        };
        ty.check().map_err(EncodingError::UnsupportedType)?;
        Ok(ty)
    }
}

/// A typed field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiValue {
    /// A boolean.
    Bool(bool),
    /// An account address.
    Address(Address),
    /// An unsigned integer.
    Uint(U256),
    /// A fixed-size byte array. Its length must equal the declared width.
    FixedBytes(Vec<u8>),
    /// A byte string.
    Bytes(Vec<u8>),
    /// A UTF-8 string.
    String(String),
}

impl AbiValue {
    /// The kind name used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Address(_) => "address",
            Self::Uint(_) => "uint",
            Self::FixedBytes(_) => "fixed bytes",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
        }
    }

    /// Parses a textual value for the given field type.
    ///
    /// Addresses and byte fields are hex (optional `0x`), integers are decimal or
    /// `0x` hex, booleans are `true`/`false`. `index` is the field's position in
    /// its tuple and is reported in errors.
    pub fn parse(ty: AbiType, raw: &str, index: usize) -> Result<Self, EncodingError> {
        let out_of_range = |reason: String| EncodingError::OutOfRange {
            index,
            ty: ty.to_string(),
            reason,
        };
        let hex_body = |s: &str| -> Result<Vec<u8>, EncodingError> {
            hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|e| out_of_range(e.to_string()))
        };
        ty.check().map_err(EncodingError::UnsupportedType)?;
        Ok(match ty {
            AbiType::Bool => match raw {
                "true" => Self::Bool(true),
                "false" => Self::Bool(false),
                other => return Err(out_of_range(format!("not a bool: {other}"))),
            },
            AbiType::Address => {
                Self::Address(Address::from_str(raw).map_err(|e| out_of_range(e.to_string()))?)
            }
            AbiType::Uint(_) => {
                Self::Uint(U256::from_str(raw).map_err(|e| out_of_range(e.to_string()))?)
            }
            AbiType::FixedBytes(_) => Self::FixedBytes(hex_body(raw)?),
            AbiType::Bytes => Self::Bytes(hex_body(raw)?),
            AbiType::String => Self::String(raw.to_string()),
        })
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Address(a) => write!(f, "{a}"),
            Self::Uint(u) => write!(f, "{u}"),
            Self::FixedBytes(b) | Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

fn word_from_u64(x: u64) -> [u8; WORD] {
    let mut w = [0u8; WORD];
    w.split_at_mut(WORD - 8).1.copy_from_slice(&x.to_be_bytes());
    w
}

fn encode_static(index: usize, ty: AbiType, value: &AbiValue) -> Result<[u8; WORD], EncodingError> {
    let mismatch = || EncodingError::TypeMismatch {
        index,
        expected: ty.to_string(),
        got: value.kind().to_string(),
    };
    let mut w = [0u8; WORD];
    match (ty, value) {
        (AbiType::Bool, AbiValue::Bool(b)) => {
            if let Some(last) = w.last_mut() {
                *last = u8::from(*b);
            }
        }
        (AbiType::Address, AbiValue::Address(a)) => {
            w.split_at_mut(WORD - 20).1.copy_from_slice(a.as_ref())
        }
        (AbiType::Uint(bits), AbiValue::Uint(u)) => {
            if u.bits() > u32::from(bits) {
                return Err(EncodingError::OutOfRange {
                    index,
                    ty: ty.to_string(),
                    reason: format!("{u} needs {} bits", u.bits()),
                });
            }
            w = u.0;
        }
        (AbiType::FixedBytes(n), AbiValue::FixedBytes(b)) => {
            if b.len() != usize::from(n) {
                return Err(EncodingError::OutOfRange {
                    index,
                    ty: ty.to_string(),
                    reason: format!("expected {n} bytes, got {}", b.len()),
                });
            }
            w.iter_mut().zip(b).for_each(|(dst, src)| *dst = *src);
        }
        _ => return Err(mismatch()),
    }
    Ok(w)
}

fn dynamic_body<'a>(index: usize, ty: AbiType, value: &'a AbiValue) -> Result<&'a [u8], EncodingError> {
    match (ty, value) {
        (AbiType::Bytes, AbiValue::Bytes(b)) => Ok(b),
        (AbiType::String, AbiValue::String(s)) => Ok(s.as_bytes()),
        _ => Err(EncodingError::TypeMismatch {
            index,
            expected: ty.to_string(),
            got: value.kind().to_string(),
        }),
    }
}

/// Encodes `values` as a tuple of the given shape.
///
/// Fails without producing bytes if the arity differs, a value has the wrong
/// kind for its field, or a value does not fit its declared width.
pub fn encode(shape: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, EncodingError> {
    if shape.len() != values.len() {
        return Err(EncodingError::ArityMismatch {
            expected: shape.len(),
            got: values.len(),
        });
    }
    let head_len = WORD * shape.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for (index, (ty, value)) in shape.iter().zip(values).enumerate() {
        ty.check().map_err(EncodingError::UnsupportedType)?;
        if ty.is_dynamic() {
            let body = dynamic_body(index, *ty, value)?;
            head.extend_from_slice(&word_from_u64((head_len + tail.len()) as u64));
            tail.extend_from_slice(&word_from_u64(body.len() as u64));
            tail.extend_from_slice(body);
            tail.resize(tail.len() + padded_len(body.len()) - body.len(), 0);
        } else {
            head.extend_from_slice(&encode_static(index, *ty, value)?);
        }
    }
    head.extend_from_slice(&tail);
    Ok(head)
}

/// A bounds-checked view over the input being decoded.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn slice(&self, offset: usize, needed: usize) -> Result<&'a [u8], DecodeError> {
        let truncated = || DecodeError::Truncated {
            offset,
            needed,
            available: self.bytes.len().saturating_sub(offset),
        };
        let end = offset.checked_add(needed).ok_or_else(truncated)?;
        self.bytes.get(offset..end).ok_or_else(truncated)
    }

    fn word(&self, offset: usize) -> Result<&'a [u8], DecodeError> {
        self.slice(offset, WORD)
    }

    /// Reads a word that must hold a small unsigned integer (an offset or length).
    fn usize_word(&self, index: usize, offset: usize) -> Result<usize, DecodeError> {
        let w = self.word(offset)?;
        let (high, low) = w.split_at(WORD - 8);
        let mut buf = [0u8; 8];
        buf.copy_from_slice(low);
        let value = u64::from_be_bytes(buf);
        if high.iter().any(|b| *b != 0) {
            return Err(DecodeError::InvalidOffset {
                index,
                value: u64::MAX,
            });
        }
        usize::try_from(value).map_err(|_| DecodeError::InvalidOffset { index, value })
    }
}

fn all_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0)
}

fn decode_static(index: usize, ty: AbiType, w: &[u8]) -> Result<AbiValue, DecodeError> {
    let mut word = [0u8; WORD];
    word.copy_from_slice(w);
    match ty {
        AbiType::Bool => {
            let (pad, last) = word.split_at(WORD - 1);
            if !all_zero(pad) {
                return Err(DecodeError::InvalidBool { index });
            }
            match last {
                [0] => Ok(AbiValue::Bool(false)),
                [1] => Ok(AbiValue::Bool(true)),
                _ => Err(DecodeError::InvalidBool { index }),
            }
        }
        AbiType::Address => {
            let (pad, body) = word.split_at(WORD - 20);
            if !all_zero(pad) {
                return Err(DecodeError::DirtyPadding { index });
            }
            let mut a = [0u8; 20];
            a.copy_from_slice(body);
            Ok(AbiValue::Address(Address(a)))
        }
        AbiType::Uint(bits) => {
            let value = U256(word);
            if value.bits() > u32::from(bits) {
                return Err(DecodeError::IntegerOverflow { index, bits });
            }
            Ok(AbiValue::Uint(value))
        }
        AbiType::FixedBytes(n) => {
            let (body, pad) = word.split_at(usize::from(n));
            if !all_zero(pad) {
                return Err(DecodeError::DirtyPadding { index });
            }
            Ok(AbiValue::FixedBytes(body.to_vec()))
        }
        AbiType::Bytes | AbiType::String => Err(DecodeError::UnsupportedType(ty.to_string())),
    }
}

fn decode_dynamic(
    reader: &Reader<'_>,
    index: usize,
    ty: AbiType,
    offset: usize,
) -> Result<AbiValue, DecodeError> {
    let len = reader.usize_word(index, offset)?;
    let body_at = offset
        .checked_add(WORD)
        .ok_or(DecodeError::InvalidOffset {
            index,
            value: offset as u64,
        })?;
    let body = reader.slice(body_at, len)?;
    let pad_len = padded_len(len) - len;
    let pad = reader.slice(body_at + len, pad_len)?;
    if !all_zero(pad) {
        return Err(DecodeError::DirtyPadding { index });
    }
    match ty {
        AbiType::Bytes => Ok(AbiValue::Bytes(body.to_vec())),
        AbiType::String => std::str::from_utf8(body)
            .map(|s| AbiValue::String(s.to_string()))
            .map_err(|_| DecodeError::InvalidUtf8 { index }),
        _ => Err(DecodeError::UnsupportedType(ty.to_string())),
    }
}

/// Strictly decodes `bytes` as a tuple of the given shape.
///
/// Rejects truncated input, dirty padding, over-wide integers, offsets or
/// lengths that point outside the input, invalid UTF-8, and any input that is
/// not the exact canonical encoding of what it decodes to (trailing bytes,
/// gaps or overlaps between tails).
pub fn decode(bytes: &[u8], shape: &[AbiType]) -> Result<Vec<AbiValue>, DecodeError> {
    for ty in shape {
        ty.check().map_err(DecodeError::UnsupportedType)?;
    }
    let reader = Reader { bytes };
    let mut values = Vec::with_capacity(shape.len());
    for (index, ty) in shape.iter().enumerate() {
        let at = index * WORD;
        let value = if ty.is_dynamic() {
            let offset = reader.usize_word(index, at)?;
            decode_dynamic(&reader, index, *ty, offset)?
        } else {
            decode_static(index, *ty, reader.word(at)?)?
        };
        values.push(value);
    }
    let canonical = encode(shape, &values).map_err(|e| DecodeError::NonCanonical(e.to_string()))?;
    if canonical != bytes {
        return Err(DecodeError::NonCanonical(format!(
            "{} input bytes, canonical form has {}",
            bytes.len(),
            canonical.len()
        )));
    }
    Ok(values)
}

#[cfg(test)]
mod tests;
