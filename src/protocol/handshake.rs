//! Endianness handshake performed once while a connection is being built.
//!
//! Each side writes a single marker byte announcing its byte order and then
//! reads the marker of the peer. Writing first on both sides keeps the
//! exchange deadlock-free: one byte always fits in the socket send buffer.
//!
//! ```text
//! [marker(1)]   0x01 = little-endian, 0x00 = big-endian
//! ```
//!
//! After the exchange both flags are fixed for the lifetime of the
//! connection. Multi-byte primitives loaded from a peer with the other byte
//! order are swapped on the receiving side.

use crate::error::{constants, ProtocolError, Result};
use std::io::{self, Read, Write};
use tracing::{debug, instrument, warn};

/// Marker announcing a little-endian host
pub const LITTLE_ENDIAN_MARKER: u8 = 0x01;

/// Marker announcing a big-endian host
pub const BIG_ENDIAN_MARKER: u8 = 0x00;

/// Byte orders settled by the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndiannessAgreement {
    /// Byte order this side announced
    pub my_little_endian: bool,
    /// Byte order the peer announced
    pub contact_little_endian: bool,
}

impl EndiannessAgreement {
    /// Whether loaded multi-byte primitives must be byte-swapped
    pub fn needs_swap(&self) -> bool {
        self.my_little_endian != self.contact_little_endian
    }
}

/// Marker byte for the given byte order
pub fn encode_marker(little_endian: bool) -> u8 {
    if little_endian {
        LITTLE_ENDIAN_MARKER
    } else {
        BIG_ENDIAN_MARKER
    }
}

/// Interpret a marker byte received from the peer
///
/// # Errors
/// Returns `ProtocolError::HandshakeError` for any byte other than the two markers
pub fn decode_marker(marker: u8) -> Result<bool> {
    match marker {
        LITTLE_ENDIAN_MARKER => Ok(true),
        BIG_ENDIAN_MARKER => Ok(false),
        other => Err(ProtocolError::HandshakeError(format!(
            "{}: 0x{other:02X}",
            constants::ERR_BAD_ENDIAN_MARKER
        ))),
    }
}

/// Announce `announce_little_endian` on `writer` and read the peer's marker from `reader`.
///
/// `reader` and `writer` are two handles to the same socket.
///
/// # Errors
/// - `ProtocolError::ConnectionClosed` if the peer closes before sending its marker
/// - `ProtocolError::Io` for any other transport failure
/// - `ProtocolError::HandshakeError` if the marker is not recognised
#[instrument(skip(reader, writer))]
pub fn exchange_endianness<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    announce_little_endian: bool,
) -> Result<EndiannessAgreement> {
    writer.write_all(&[encode_marker(announce_little_endian)])?;
    writer.flush()?;

    let mut marker = [0u8; 1];
    if let Err(e) = reader.read_exact(&mut marker) {
        return Err(match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                warn!("Peer closed during endianness handshake");
                ProtocolError::ConnectionClosed
            }
            _ => ProtocolError::Io(e),
        });
    }

    let contact_little_endian = decode_marker(marker[0])?;
    let agreement = EndiannessAgreement {
        my_little_endian: announce_little_endian,
        contact_little_endian,
    };

    debug!(
        my_little_endian = agreement.my_little_endian,
        contact_little_endian = agreement.contact_little_endian,
        "Endianness handshake complete"
    );

    Ok(agreement)
}
