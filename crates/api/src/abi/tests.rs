// Path: crates/api/src/abi/tests.rs
use super::*;
use proptest::prelude::*;

fn word(byte_at_end: u64) -> Vec<u8> {
    word_from_u64(byte_at_end).to_vec()
}

fn album_shape() -> Vec<AbiType> {
    vec![AbiType::Address, AbiType::Uint(256)]
}

#[test]
fn type_names_parse_and_print() {
    for name in ["bool", "address", "uint256", "uint8", "bytes32", "bytes1", "bytes", "string"] {
        let ty: AbiType = name.parse().unwrap();
        assert_eq!(ty.to_string(), name);
    }
    assert_eq!("uint".parse::<AbiType>().unwrap(), AbiType::Uint(256));
    for bad in ["uint7", "uint264", "bytes0", "bytes33", "int256", "tuple"] {
        assert!(matches!(
            bad.parse::<AbiType>(),
            Err(EncodingError::UnsupportedType(_))
        ));
    }
}

#[test]
fn static_tuple_layout() {
    let addr = Address([0x11; 20]);
    let bytes = encode(
        &album_shape(),
        &[AbiValue::Address(addr), AbiValue::Uint(U256::from(1u64))],
    )
    .unwrap();
    assert_eq!(bytes.len(), 64);
    let mut expected = vec![0u8; 12];
    expected.extend_from_slice(&[0x11; 20]);
    expected.extend(word(1));
    assert_eq!(bytes, expected);
}

#[test]
fn dynamic_tuple_layout() {
    // ("albumDrop", 0xabcd): two head words, then each tail.
    let bytes = encode(
        &[AbiType::String, AbiType::Bytes],
        &[
            AbiValue::String("albumDrop".into()),
            AbiValue::Bytes(vec![0xab, 0xcd]),
        ],
    )
    .unwrap();
    let mut expected = word(0x40);
    expected.extend(word(0x80));
    expected.extend(word(9));
    let mut s = b"albumDrop".to_vec();
    s.resize(32, 0);
    expected.extend(s);
    expected.extend(word(2));
    let mut b = vec![0xab, 0xcd];
    b.resize(32, 0);
    expected.extend(b);
    assert_eq!(bytes, expected);
    assert_eq!(
        decode(&bytes, &[AbiType::String, AbiType::Bytes]).unwrap(),
        vec![
            AbiValue::String("albumDrop".into()),
            AbiValue::Bytes(vec![0xab, 0xcd])
        ]
    );
}

#[test]
fn empty_dynamic_field_has_no_body() {
    let bytes = encode(&[AbiType::Bytes], &[AbiValue::Bytes(vec![])]).unwrap();
    let mut expected = word(0x20);
    expected.extend(word(0));
    assert_eq!(bytes, expected);
    assert_eq!(
        decode(&bytes, &[AbiType::Bytes]).unwrap(),
        vec![AbiValue::Bytes(vec![])]
    );
}

#[test]
fn encode_rejects_bad_input() {
    let shape = album_shape();
    assert_eq!(
        encode(&shape, &[AbiValue::Bool(true)]),
        Err(EncodingError::ArityMismatch {
            expected: 2,
            got: 1
        })
    );
    assert!(matches!(
        encode(&shape, &[AbiValue::Bool(true), AbiValue::Uint(U256::ZERO)]),
        Err(EncodingError::TypeMismatch { index: 0, .. })
    ));
    assert!(matches!(
        encode(&[AbiType::Uint(8)], &[AbiValue::Uint(U256::from(256u64))]),
        Err(EncodingError::OutOfRange { index: 0, .. })
    ));
    assert!(matches!(
        encode(&[AbiType::FixedBytes(4)], &[AbiValue::FixedBytes(vec![1, 2, 3])]),
        Err(EncodingError::OutOfRange { index: 0, .. })
    ));
}

#[test]
fn decode_rejects_truncation() {
    let bytes = encode(&[AbiType::Bool], &[AbiValue::Bool(true)]).unwrap();
    assert!(matches!(
        decode(&bytes[..31], &[AbiType::Bool]),
        Err(DecodeError::Truncated { .. })
    ));
    assert!(matches!(
        decode(&[], &album_shape()),
        Err(DecodeError::Truncated { .. })
    ));
}

#[test]
fn decode_rejects_trailing_bytes() {
    let mut bytes = encode(&[AbiType::Bool], &[AbiValue::Bool(true)]).unwrap();
    bytes.push(0);
    assert!(matches!(
        decode(&bytes, &[AbiType::Bool]),
        Err(DecodeError::NonCanonical(_))
    ));
}

#[test]
fn decode_rejects_invalid_bool_and_padding() {
    let mut bytes = word(2);
    assert_eq!(
        decode(&bytes, &[AbiType::Bool]),
        Err(DecodeError::InvalidBool { index: 0 })
    );
    bytes = word(1);
    bytes[0] = 1;
    assert_eq!(
        decode(&bytes, &[AbiType::Bool]),
        Err(DecodeError::InvalidBool { index: 0 })
    );
    assert_eq!(
        decode(&bytes, &[AbiType::Address]),
        Err(DecodeError::DirtyPadding { index: 0 })
    );
    let mut fixed = vec![0u8; 32];
    fixed[4] = 9;
    assert_eq!(
        decode(&fixed, &[AbiType::FixedBytes(4)]),
        Err(DecodeError::DirtyPadding { index: 0 })
    );
}

#[test]
fn decode_rejects_overwide_integer() {
    let bytes = word(256);
    assert_eq!(
        decode(&bytes, &[AbiType::Uint(8)]),
        Err(DecodeError::IntegerOverflow { index: 0, bits: 8 })
    );
    assert_eq!(
        decode(&bytes, &[AbiType::Uint(16)]).unwrap(),
        vec![AbiValue::Uint(U256::from(256u64))]
    );
}

#[test]
fn decode_rejects_bad_offsets() {
    // Offset beyond the input.
    let bytes = word(0x1000);
    assert!(matches!(
        decode(&bytes, &[AbiType::Bytes]),
        Err(DecodeError::Truncated { .. })
    ));
    // Offset with high bits set.
    let mut bytes = word(0x20);
    bytes[0] = 0xff;
    bytes.extend(word(0));
    assert!(matches!(
        decode(&bytes, &[AbiType::Bytes]),
        Err(DecodeError::InvalidOffset { index: 0, .. })
    ));
    // Length running past the end.
    let mut bytes = word(0x20);
    bytes.extend(word(64));
    bytes.extend(vec![0u8; 32]);
    assert!(matches!(
        decode(&bytes, &[AbiType::Bytes]),
        Err(DecodeError::Truncated { .. })
    ));
}

#[test]
fn decode_rejects_gap_before_tail() {
    // A valid body placed one word later than the canonical offset.
    let mut bytes = word(0x40);
    bytes.extend(word(0));
    bytes.extend(word(0));
    assert!(matches!(
        decode(&bytes, &[AbiType::Bytes]),
        Err(DecodeError::NonCanonical(_))
    ));
}

#[test]
fn decode_rejects_dirty_tail_padding_and_bad_utf8() {
    let mut bytes = encode(&[AbiType::Bytes], &[AbiValue::Bytes(vec![1])]).unwrap();
    let last = bytes.len() - 1;
    bytes[last] = 7;
    assert_eq!(
        decode(&bytes, &[AbiType::Bytes]),
        Err(DecodeError::DirtyPadding { index: 0 })
    );

    let mut bytes = encode(&[AbiType::Bytes], &[AbiValue::Bytes(vec![0xff, 0xfe])]).unwrap();
    assert_eq!(
        decode(&bytes, &[AbiType::String]),
        Err(DecodeError::InvalidUtf8 { index: 0 })
    );
    bytes.truncate(64);
    assert!(matches!(
        decode(&bytes, &[AbiType::Bytes]),
        Err(DecodeError::Truncated { .. })
    ));
}

#[test]
fn parses_textual_values() {
    assert_eq!(
        AbiValue::parse(AbiType::Bool, "true", 0).unwrap(),
        AbiValue::Bool(true)
    );
    assert_eq!(
        AbiValue::parse(AbiType::Uint(256), "42", 0).unwrap(),
        AbiValue::Uint(U256::from(42u64))
    );
    assert_eq!(
        AbiValue::parse(AbiType::Bytes, "0xabcd", 0).unwrap(),
        AbiValue::Bytes(vec![0xab, 0xcd])
    );
    assert!(AbiValue::parse(AbiType::Bool, "yes", 0).is_err());
    assert!(AbiValue::parse(AbiType::Address, "0x1234", 0).is_err());
}

#[test]
fn decimal_integers_use_the_whole_word() {
    let two_128 = AbiValue::parse(AbiType::Uint(256), "340282366920938463463374607431768211456", 0)
        .unwrap();
    let mut word = [0u8; 32];
    word[15] = 1;
    assert_eq!(two_128, AbiValue::Uint(U256(word)));
    let from_hex = AbiValue::parse(
        AbiType::Uint(256),
        "0x0100000000000000000000000000000000",
        0,
    )
    .unwrap();
    assert_eq!(two_128, from_hex);

    let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
    assert_eq!(
        AbiValue::parse(AbiType::Uint(256), max, 0).unwrap(),
        AbiValue::Uint(U256([0xff; 32]))
    );
    let over = "115792089237316195423570985008687907853269984665640564039457584007913129639936";
    assert!(matches!(
        AbiValue::parse(AbiType::Uint(256), over, 0),
        Err(EncodingError::OutOfRange { .. })
    ));
}

#[test]
fn parse_errors_name_the_field() {
    let err = AbiValue::parse(AbiType::Bool, "maybe", 3).unwrap_err();
    assert!(matches!(err, EncodingError::OutOfRange { index: 3, .. }));
    let err = AbiValue::parse(AbiType::Uint(8), "-1", 1).unwrap_err();
    assert!(matches!(err, EncodingError::OutOfRange { index: 1, .. }));
}

fn arb_value() -> impl Strategy<Value = (AbiType, AbiValue)> {
    prop_oneof![
        any::<bool>().prop_map(|b| (AbiType::Bool, AbiValue::Bool(b))),
        any::<[u8; 20]>().prop_map(|a| (AbiType::Address, AbiValue::Address(Address(a)))),
        any::<u64>().prop_map(|n| (AbiType::Uint(64), AbiValue::Uint(U256::from(n)))),
        any::<[u8; 32]>().prop_map(|w| (AbiType::Uint(256), AbiValue::Uint(U256(w)))),
        any::<[u8; 32]>().prop_map(|w| (AbiType::FixedBytes(32), AbiValue::FixedBytes(w.to_vec()))),
        proptest::collection::vec(any::<u8>(), 0..80)
            .prop_map(|b| (AbiType::Bytes, AbiValue::Bytes(b))),
        ".{0,40}".prop_map(|s| (AbiType::String, AbiValue::String(s))),
    ]
}

proptest! {
    #[test]
    fn decode_inverts_encode(fields in proptest::collection::vec(arb_value(), 0..6)) {
        let (shape, values): (Vec<_>, Vec<_>) = fields.into_iter().unzip();
        let bytes = encode(&shape, &values).unwrap();
        prop_assert_eq!(bytes.len() % WORD, 0);
        prop_assert_eq!(decode(&bytes, &shape).unwrap(), values);
    }

    #[test]
    fn single_byte_corruption_never_decodes_to_the_same_tuple(
        fields in proptest::collection::vec(arb_value(), 1..4),
        pos in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let (shape, values): (Vec<_>, Vec<_>) = fields.into_iter().unzip();
        let mut bytes = encode(&shape, &values).unwrap();
        let i = pos.index(bytes.len());
        bytes[i] ^= flip;
        if let Ok(decoded) = decode(&bytes, &shape) {
            prop_assert_ne!(decoded, values);
        }
    }
}
