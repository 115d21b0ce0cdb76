//! # In-Memory Archives
//!
//! [`BufferWriter`] saves into a growable `BytesMut`; [`BufferReader`] loads
//! from a `Bytes` snapshot. They produce exactly the bytes a
//! [`Connection`](crate::transport::connection::Connection) would put on the
//! wire, which makes them the building block for tests, fuzzing and for
//! callers that frame records themselves.
//!
//! ```rust
//! use peerlink::core::buffer::{from_bytes, to_bytes};
//!
//! let mut ids = vec![1i32, 2, 3];
//! let bytes = to_bytes(&mut ids)?;
//! assert_eq!(bytes.len(), 4 + 3 * 4);
//! assert_eq!(from_bytes::<Vec<i32>>(&bytes)?, vec![1, 2, 3]);
//! # Ok::<(), peerlink::error::ProtocolError>(())
//! ```

use crate::config::{MAX_LENGTH_PREFIX, PROTOCOL_VERSION};
use crate::core::archive::Archive;
use crate::core::kind::Archived;
use crate::core::primitive::Primitive;
use crate::error::{ProtocolError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Saving archive backed by a `BytesMut`
#[derive(Debug)]
pub struct BufferWriter {
    buf: BytesMut,
    version: u32,
}

impl BufferWriter {
    /// Create an empty writer using [`PROTOCOL_VERSION`]
    pub fn new() -> Self {
        Self::with_version(PROTOCOL_VERSION)
    }

    /// Create an empty writer that hands `version` to composites
    pub fn with_version(version: u32) -> Self {
        Self {
            buf: BytesMut::new(),
            version,
        }
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View the bytes written so far
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Drop everything written so far, keeping the allocation
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Take the written bytes
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for BufferWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Archive for BufferWriter {
    const LOADING: bool = false;

    fn version(&self) -> u32 {
        self.version
    }

    fn max_length(&self) -> usize {
        u32::MAX as usize
    }

    #[inline]
    fn primitive<P: Primitive>(&mut self, value: &mut P) -> Result<()> {
        value.put(&mut self.buf);
        Ok(())
    }

    fn bytes(&mut self, data: &mut Vec<u8>, len: usize) -> Result<()> {
        debug_assert_eq!(data.len(), len);
        self.buf.put_slice(data);
        Ok(())
    }
}

/// Loading archive over an immutable `Bytes` buffer
#[derive(Debug, Clone)]
pub struct BufferReader {
    buf: Bytes,
    version: u32,
    swap: bool,
    max_length: usize,
}

impl BufferReader {
    /// Create a reader with the default version, no byte swapping and the default length limit
    pub fn new(buf: Bytes) -> Self {
        Self {
            buf,
            version: PROTOCOL_VERSION,
            swap: false,
            max_length: MAX_LENGTH_PREFIX,
        }
    }

    /// Hand `version` to composites instead of [`PROTOCOL_VERSION`]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Treat the buffer as written by a host with the other byte order
    pub fn with_swap(mut self, swap: bool) -> Self {
        self.swap = swap;
        self
    }

    /// Reject length prefixes above `max_length`
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Bytes not consumed yet
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Whether every byte has been consumed
    pub fn is_exhausted(&self) -> bool {
        !self.buf.has_remaining()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(ProtocolError::UnexpectedEof { needed, remaining });
        }
        Ok(())
    }
}

impl Archive for BufferReader {
    const LOADING: bool = true;

    fn version(&self) -> u32 {
        self.version
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    #[inline]
    fn primitive<P: Primitive>(&mut self, value: &mut P) -> Result<()> {
        self.ensure(P::SIZE)?;
        *value = P::get(self.buf.chunk(), self.swap)?;
        self.buf.advance(P::SIZE);
        Ok(())
    }

    fn bytes(&mut self, data: &mut Vec<u8>, len: usize) -> Result<()> {
        self.ensure(len)?;
        data.clear();
        data.extend_from_slice(&self.buf.chunk()[..len]);
        self.buf.advance(len);
        Ok(())
    }
}

/// Save `value` into a fresh buffer
pub fn to_bytes<T: Archived>(value: &mut T) -> Result<Bytes> {
    let mut writer = BufferWriter::new();
    writer.save(value)?;
    Ok(writer.into_bytes())
}

/// Load a `T` from `data`, requiring every byte to be consumed
pub fn from_bytes<T: Archived + Default>(data: &[u8]) -> Result<T> {
    let mut reader = BufferReader::new(Bytes::copy_from_slice(data));
    let mut value = T::default();
    reader.load(&mut value)?;

    if !reader.is_exhausted() {
        return Err(ProtocolError::Custom(format!(
            "{} trailing bytes after value",
            reader.remaining()
        )));
    }
    Ok(value)
}
