//! # Error Types
//!
//! Error handling for archives and connections.
//!
//! This module defines every error variant that can occur while classifying,
//! saving, loading or moving bytes across a connection.
//!
//! ## Error Categories
//! - **Classification**: a value whose type is neither primitive nor serializable
//! - **I/O Errors**: transport failures; the connection is marked disconnected
//! - **Malformed Input**: oversized length prefixes, truncated buffers, invalid values
//! - **Setup**: handshake and configuration failures
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! ## Example Usage
//! ```rust
//! use peerlink::core::buffer::{from_bytes, to_bytes};
//! use peerlink::error::{ProtocolError, Result};
//! use tracing::{error, info};
//!
//! fn roundtrip(text: &str) -> Result<String> {
//!     let mut owned = text.to_string();
//!     let bytes = to_bytes(&mut owned)?;
//!     from_bytes::<String>(&bytes)
//! }
//!
//! match roundtrip("hello") {
//!     Ok(text) => info!(%text, "Roundtrip succeeded"),
//!     Err(ProtocolError::OversizedLength { length, .. }) => error!(length, "Length rejected"),
//!     Err(e) => error!(error = %e, "Roundtrip failed"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Lock-related error messages
    pub const ERR_READ_LOCK: &str = "Failed to acquire read lock on connection";
    pub const ERR_WRITE_LOCK: &str = "Failed to acquire write lock on connection";

    /// Connection errors
    pub const ERR_NO_ADDRESS: &str = "Host did not resolve to any address";

    /// Handshake errors
    pub const ERR_BAD_ENDIAN_MARKER: &str = "Peer sent an invalid endianness marker";

    /// Archive errors
    pub const ERR_SAVE_ON_READER: &str = "save called on a loading archive";
    pub const ERR_LOAD_ON_WRITER: &str = "load called on a saving archive";
}

// ProtocolError is the primary error type for all archive and connection operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Type `{type_name}` is neither primitive nor serializable")]
    Classification { type_name: &'static str },

    #[error("Length prefix {length} exceeds limit of {limit}")]
    OversizedLength { length: usize, limit: usize },

    #[error("Unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("String payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Invalid {type_name} value on the wire: {raw}")]
    InvalidValue { type_name: &'static str, raw: u128 },

    #[error("Wrong archive direction: {0}")]
    WrongDirection(&'static str),

    #[error("Handshake failed: {0}")]
    HandshakeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Synchronization failure: {0}")]
    LockPoisoned(&'static str),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Whether this error means the underlying transport can no longer be used
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ProtocolError::ConnectionClosed | ProtocolError::Io(_))
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
