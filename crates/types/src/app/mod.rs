// Path: crates/types/src/app/mod.rs
//! Core identity and record types shared by the codec, the store and the consumer.

use crate::error::ParseError;
use crate::QUERY_ID_LEN;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod submission;
pub use submission::*;

/// Seconds since the UNIX epoch. All freshness arithmetic is done in this unit.
pub type Timestamp = u64;

fn decode_hex_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ParseError::InvalidLength { expected: N, got })
}

/// A 20-byte account address, used both as a query parameter type and as the
/// identity of a reporter.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Hash,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_fixed::<20>(s).map(Self)
    }
}

/// The fixed-width identifier of a query: the hash of its canonical payload.
///
/// This is the sole lookup key into the value store.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Hash,
)]
pub struct QueryId(pub [u8; QUERY_ID_LEN]);

impl AsRef<[u8]> for QueryId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; QUERY_ID_LEN]> for QueryId {
    fn from(bytes: [u8; QUERY_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryId(0x{})", hex::encode(self.0))
    }
}

impl FromStr for QueryId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_fixed::<QUERY_ID_LEN>(s).map(Self)
    }
}

/// An unsigned 256-bit integer held as a big-endian word.
///
/// Arithmetic is never performed on it; it only needs to travel through the codec
/// losslessly and be narrowed when an application reads it.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Hash,
)]
pub struct U256(pub [u8; 32]);

impl U256 {
    /// Zero.
    pub const ZERO: U256 = U256([0u8; 32]);

    /// Number of significant bits (0 for zero).
    pub fn bits(&self) -> u32 {
        match self.0.iter().position(|b| *b != 0) {
            Some(i) => {
                let leading = self.0[i].leading_zeros();
                ((32 - i) as u32) * 8 - leading
            }
            None => 0,
        }
    }

    /// Narrows to `u64`, returning `None` if the value does not fit.
    pub fn to_u64(&self) -> Option<u64> {
        let (high, low) = self.0.split_at(24);
        if high.iter().any(|b| *b != 0) {
            return None;
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(low);
        Some(u64::from_be_bytes(buf))
    }

    /// Narrows to `u128`, returning `None` if the value does not fit.
    pub fn to_u128(&self) -> Option<u128> {
        let (high, low) = self.0.split_at(16);
        if high.iter().any(|b| *b != 0) {
            return None;
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(low);
        Some(u128::from_be_bytes(buf))
    }
}

impl From<u64> for U256 {
    fn from(v: u64) -> Self {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&v.to_be_bytes());
        Self(word)
    }
}

impl From<u128> for U256 {
    fn from(v: u128) -> Self {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&v.to_be_bytes());
        Self(word)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u128() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

impl FromStr for U256 {
    type Err = ParseError;

    /// Accepts a decimal literal up to `2^256 - 1`, or a `0x`-prefixed hex word of
    /// at most 32 bytes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hex_part) = s.strip_prefix("0x") {
            let bytes =
                hex::decode(hex_part).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
            if bytes.len() > 32 {
                return Err(ParseError::InvalidLength {
                    expected: 32,
                    got: bytes.len(),
                });
            }
            let mut word = [0u8; 32];
            word[32 - bytes.len()..].copy_from_slice(&bytes);
            return Ok(Self(word));
        }
        Self::from_decimal(s)
    }
}

impl U256 {
    fn from_decimal(s: &str) -> Result<Self, ParseError> {
        if s.is_empty() {
            return Err(ParseError::InvalidInteger("empty literal".into()));
        }
        let mut word = [0u8; 32];
        for c in s.chars() {
            let mut carry = c
                .to_digit(10)
                .ok_or_else(|| ParseError::InvalidInteger(format!("invalid digit {c:?}")))?;
            // word = word * 10 + digit, least significant byte first.
            for byte in word.iter_mut().rev() {
                let v = u32::from(*byte) * 10 + carry;
                *byte = (v & 0xff) as u8;
                carry = v >> 8;
            }
            if carry != 0 {
                return Err(ParseError::InvalidInteger(
                    "number too large for 256 bits".into(),
                ));
            }
        }
        Ok(Self(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parses_with_and_without_prefix() {
        let a: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let b: Address = "00000000000000000000000000000000000000aa".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.0[19], 0xaa);
        assert_eq!(a.to_string(), "0x00000000000000000000000000000000000000aa");
    }

    #[test]
    fn address_rejects_wrong_length() {
        let err = "0xabcd".parse::<Address>().unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidLength {
                expected: 20,
                got: 2
            }
        ));
    }

    #[test]
    fn u256_narrowing_and_bits() {
        let v = U256::from(300u64);
        assert_eq!(v.to_u64(), Some(300));
        assert_eq!(v.bits(), 9);
        assert_eq!(U256::ZERO.bits(), 0);

        let mut big = [0u8; 32];
        big[0] = 0x80;
        let big = U256(big);
        assert_eq!(big.bits(), 256);
        assert_eq!(big.to_u64(), None);
        assert_eq!(big.to_u128(), None);
    }

    #[test]
    fn u256_parses_decimal_and_hex() {
        assert_eq!("42".parse::<U256>().unwrap(), U256::from(42u64));
        assert_eq!("0x2a".parse::<U256>().unwrap(), U256::from(42u64));
        assert!("-1".parse::<U256>().is_err());
        assert!("".parse::<U256>().is_err());
        assert!("1_000".parse::<U256>().is_err());
    }

    #[test]
    fn query_id_is_exactly_the_agreed_width() {
        let hex = "ab".repeat(QUERY_ID_LEN);
        assert_eq!(hex.parse::<QueryId>().unwrap().0, [0xab; QUERY_ID_LEN]);
        let err = "ab".repeat(QUERY_ID_LEN - 1).parse::<QueryId>().unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidLength { expected: QUERY_ID_LEN, got } if got == QUERY_ID_LEN - 1
        ));
    }

    #[test]
    fn u256_decimal_covers_the_full_word() {
        let two_128: U256 = "340282366920938463463374607431768211456".parse().unwrap();
        let mut expected = [0u8; 32];
        expected[15] = 1;
        assert_eq!(two_128, U256(expected));

        let max: U256 =
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
                .parse()
                .unwrap();
        assert_eq!(max, U256([0xff; 32]));

        let err = "115792089237316195423570985008687907853269984665640564039457584007913129639936"
            .parse::<U256>()
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidInteger(_)));

        assert_eq!("000042".parse::<U256>().unwrap(), U256::from(42u64));
        assert_eq!(
            "340282366920938463463374607431768211455".parse::<U256>().unwrap(),
            U256::from(u128::MAX)
        );
    }
}
