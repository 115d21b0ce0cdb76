#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for archives and buffers
//! Boundary values, hostile length prefixes, invalid scalars and truncated input

use bytes::Bytes;
use peerlink::core::archive::Archive;
use peerlink::core::buffer::{from_bytes, to_bytes, BufferReader, BufferWriter};
use peerlink::error::ProtocolError;
use std::collections::BTreeSet;

// ============================================================================
// SCALAR BOUNDARIES
// ============================================================================

#[test]
fn test_integer_extremes_roundtrip() {
    assert_eq!(from_bytes::<i8>(&to_bytes(&mut i8::MIN).unwrap()).unwrap(), i8::MIN);
    assert_eq!(from_bytes::<u64>(&to_bytes(&mut u64::MAX).unwrap()).unwrap(), u64::MAX);
    assert_eq!(
        from_bytes::<i128>(&to_bytes(&mut i128::MIN).unwrap()).unwrap(),
        i128::MIN
    );
}

#[test]
fn test_float_special_values() {
    let nan = from_bytes::<f64>(&to_bytes(&mut f64::NAN).unwrap()).unwrap();
    assert!(nan.is_nan());

    let neg_zero = from_bytes::<f32>(&to_bytes(&mut -0.0f32).unwrap()).unwrap();
    assert!(neg_zero.is_sign_negative());
    assert_eq!(neg_zero, 0.0);

    assert_eq!(
        from_bytes::<f64>(&to_bytes(&mut f64::INFINITY).unwrap()).unwrap(),
        f64::INFINITY
    );
}

#[test]
fn test_bool_byte_must_be_zero_or_one() {
    assert!(from_bytes::<bool>(&[1]).unwrap());
    assert!(!from_bytes::<bool>(&[0]).unwrap());
    assert!(matches!(
        from_bytes::<bool>(&[2]),
        Err(ProtocolError::InvalidValue { type_name: "bool", raw: 2 })
    ));
}

#[test]
fn test_char_rejects_surrogates() {
    let surrogate = 0xD800u32.to_ne_bytes();
    assert!(matches!(
        from_bytes::<char>(&surrogate),
        Err(ProtocolError::InvalidValue { .. })
    ));
    assert_eq!(from_bytes::<char>(&to_bytes(&mut 'ß').unwrap()).unwrap(), 'ß');
}

#[test]
fn test_zero_length_array() {
    let mut empty: [u32; 0] = [];
    let bytes = to_bytes(&mut empty).unwrap();
    assert!(bytes.is_empty());
    assert_eq!(from_bytes::<[u32; 0]>(&bytes).unwrap(), empty);
}

#[test]
fn test_array_of_floats_roundtrip() {
    let mut position = [1.5f32, -2.25, 1e-3];
    let bytes = to_bytes(&mut position).unwrap();
    assert_eq!(bytes.len(), 12);
    assert_eq!(from_bytes::<[f32; 3]>(&bytes).unwrap(), position);
}

// ============================================================================
// LENGTH PREFIXES
// ============================================================================

#[test]
fn test_hostile_sequence_count_fails_without_huge_allocation() {
    // Claims the maximum accepted count but carries only two elements
    let mut raw = (16u32 * 1024 * 1024).to_ne_bytes().to_vec();
    raw.extend_from_slice(&1u64.to_ne_bytes());
    raw.extend_from_slice(&2u64.to_ne_bytes());

    let err = from_bytes::<Vec<u64>>(&raw).unwrap_err();
    assert!(matches!(err, ProtocolError::UnexpectedEof { needed: 8, remaining: 0 }));
}

#[test]
fn test_count_above_limit_rejected_before_reading_elements() {
    let mut raw = u32::MAX.to_ne_bytes().to_vec();
    raw.push(0);

    let err = from_bytes::<Vec<u8>>(&raw).unwrap_err();
    assert!(matches!(err, ProtocolError::OversizedLength { .. }));
}

#[test]
fn test_custom_reader_limit_applies_to_strings() {
    let bytes = to_bytes(&mut "x".repeat(100)).unwrap();

    let mut text = String::new();
    let err = BufferReader::new(bytes.clone())
        .with_max_length(99)
        .load(&mut text)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::OversizedLength { length: 100, limit: 99 }));

    BufferReader::new(bytes)
        .with_max_length(100)
        .load(&mut text)
        .unwrap();
    assert_eq!(text.len(), 100);
}

#[test]
fn test_empty_string_roundtrip() {
    let bytes = to_bytes(&mut String::new()).unwrap();
    assert_eq!(bytes.as_ref(), &[0; 4]);
    assert_eq!(from_bytes::<String>(&bytes).unwrap(), "");
}

#[test]
fn test_multibyte_utf8_length_counts_bytes() {
    let mut text = String::from("héllo wörld ✓");
    let bytes = to_bytes(&mut text).unwrap();
    let prefix = u32::from_ne_bytes(bytes[..4].try_into().unwrap());
    assert_eq!(prefix as usize, text.len());
    assert_eq!(from_bytes::<String>(&bytes).unwrap(), text);
}

// ============================================================================
// TRUNCATION AND STATE
// ============================================================================

#[test]
fn test_empty_buffer() {
    assert!(matches!(
        from_bytes::<u16>(&[]),
        Err(ProtocolError::UnexpectedEof { needed: 2, remaining: 0 })
    ));
    assert!(from_bytes::<String>(&[]).is_err());
    assert!(from_bytes::<BTreeSet<u8>>(&[]).is_err());
}

#[test]
fn test_truncated_nested_sequence() {
    let mut nested = vec![vec![1u16, 2], vec![3, 4, 5]];
    let bytes = to_bytes(&mut nested).unwrap();

    for cut in 0..bytes.len() {
        assert!(
            from_bytes::<Vec<Vec<u16>>>(&bytes[..cut]).is_err(),
            "prefix of {cut} bytes decoded"
        );
    }
    assert_eq!(from_bytes::<Vec<Vec<u16>>>(&bytes).unwrap(), nested);
}

#[test]
fn test_reader_reports_remaining_after_partial_load() {
    let mut writer = BufferWriter::new();
    writer.field(&mut 7u32).unwrap().field(&mut 9u8).unwrap();

    let mut reader = BufferReader::new(writer.into_bytes());
    let mut first = 0u32;
    reader.load(&mut first).unwrap();
    assert_eq!(first, 7);
    assert_eq!(reader.remaining(), 1);
    assert!(!reader.is_exhausted());
}

#[test]
fn test_swap_is_a_no_op_for_single_bytes() {
    let mut reader = BufferReader::new(Bytes::from_static(&[0xAB, 1])).with_swap(true);
    let mut byte = 0u8;
    let mut flag = false;
    reader.field(&mut byte).unwrap().field(&mut flag).unwrap();
    assert_eq!(byte, 0xAB);
    assert!(flag);
}

#[test]
fn test_set_save_leaves_set_intact_on_error() {
    let mut set: BTreeSet<u32> = (0..10).collect();
    let mut reader = BufferReader::new(Bytes::new());

    // Saving through a loading archive is refused outright
    assert!(reader.save(&mut set).is_err());
    assert_eq!(set.len(), 10);
}
