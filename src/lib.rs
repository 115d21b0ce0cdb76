//! # peerlink
//!
//! Symmetric binary archives and a full-duplex blocking connection for
//! peer-to-peer protocols.
//!
//! ## Overview
//! - **Classification**: every archivable type is primitive (raw bytes) or
//!   composite (serializes itself); other types are rejected at compile time
//! - **Archive**: one field operator that saves or loads depending on the
//!   archive direction, so a single `serialize` body covers both
//! - **Codecs**: `String`, `Vec<T>` and `BTreeSet<T>` with `u32` length prefixes
//! - **Connection**: an owned socket with separate read and write locks, an
//!   endianness handshake and typed `save` / `load`
//!
//! ## Example
//! ```rust,no_run
//! use peerlink::{Archive, Connection, Result, Serializable};
//! use std::net::TcpListener;
//!
//! #[derive(Debug, Default)]
//! struct Announce {
//!     port: u16,
//!     files: Vec<String>,
//! }
//!
//! impl Serializable for Announce {
//!     fn serialize<A: Archive>(&mut self, ar: &mut A, _version: u32) -> Result<()> {
//!         ar.field(&mut self.port)?.field(&mut self.files)?;
//!         Ok(())
//!     }
//! }
//!
//! fn serve(listener: &TcpListener) -> Result<Announce> {
//!     let conn = Connection::accept(listener, "inbound")?;
//!     let mut announce = Announce::default();
//!     conn.load(&mut announce)?;
//!     Ok(announce)
//! }
//! ```
//!
//! ## Wire Compatibility
//! Primitives travel in the sender's native byte order; the receiver swaps
//! them when the handshake reported the other order. Protocol version
//! [`PROTOCOL_VERSION`] is handed to every composite.

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

// Used by `primitive_enum!` expansions in downstream crates
pub use bytes;

pub use crate::config::{ConnectionConfig, NetworkConfig, PROTOCOL_VERSION};
pub use crate::core::archive::Archive;
pub use crate::core::buffer::{from_bytes, to_bytes, BufferReader, BufferWriter};
pub use crate::core::kind::{Archived, Serializable, SerializationKind};
pub use crate::core::primitive::Primitive;
pub use crate::error::{ProtocolError, Result};
pub use crate::transport::connection::{Connection, ConnectionReader, ConnectionWriter};
pub use crate::transport::Transport;
