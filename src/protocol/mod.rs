//! # Connection Setup Protocol
//!
//! Steps exchanged on a fresh transport before any typed value is sent.
//!
//! ## Components
//! - **Handshake**: one-byte endianness announcement in each direction
//!
//! No protocol version negotiation happens here; composites receive the
//! local protocol version and are responsible for staying compatible.

pub mod handshake;

#[cfg(test)]
mod tests;
