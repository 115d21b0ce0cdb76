// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::error::ProtocolError;
use crate::protocol::handshake::*;
use std::io::Cursor;

#[test]
fn test_marker_roundtrip() {
    assert!(decode_marker(encode_marker(true)).unwrap());
    assert!(!decode_marker(encode_marker(false)).unwrap());
}

#[test]
fn test_unknown_marker_rejected() {
    let err = decode_marker(0x7F).unwrap_err();
    match err {
        ProtocolError::HandshakeError(message) => assert!(message.contains("0x7F")),
        other => panic!("Expected HandshakeError, got {other:?}"),
    }
}

#[test]
fn test_exchange_writes_marker_then_reads_peer() {
    let mut inbound = Cursor::new(vec![BIG_ENDIAN_MARKER]);
    let mut outbound = Vec::new();

    let agreement = exchange_endianness(&mut inbound, &mut outbound, true).unwrap();

    assert_eq!(outbound, vec![LITTLE_ENDIAN_MARKER]);
    assert!(agreement.my_little_endian);
    assert!(!agreement.contact_little_endian);
    assert!(agreement.needs_swap());
}

#[test]
fn test_matching_orders_need_no_swap() {
    let mut inbound = Cursor::new(vec![LITTLE_ENDIAN_MARKER]);
    let mut outbound = Vec::new();

    let agreement = exchange_endianness(&mut inbound, &mut outbound, true).unwrap();
    assert!(!agreement.needs_swap());
}

#[test]
fn test_peer_closing_before_marker() {
    let mut inbound = Cursor::new(Vec::new());
    let mut outbound = Vec::new();

    let err = exchange_endianness(&mut inbound, &mut outbound, false).unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
    // Our marker still went out first
    assert_eq!(outbound, vec![BIG_ENDIAN_MARKER]);
}
