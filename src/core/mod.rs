//! # Core Serialization Components
//!
//! Type classification, the symmetric archive and the container codecs.
//!
//! ## Components
//! - **Kind**: compile-time classification into primitive, composite or invalid
//! - **Primitive**: raw byte layout of fixed-size values
//! - **Archive**: the direction-agnostic field operator
//! - **Codecs**: strings, sequences and sets as composites
//! - **Buffer**: in-memory archives over `bytes` buffers
//!
//! ## Wire Format
//! ```text
//! primitive   [native bytes]                 no tag, no length
//! string      [len: u32] [bytes]
//! sequence    [count: u32] [element]*        original order
//! set         [count: u32] [element]*        ascending order
//! composite   whatever its serialize visits, in visit order
//! ```
//!
//! ## Security
//! - Every length prefix is checked against a limit before allocation
//! - Invalid `bool`, `char` and enum bytes are rejected, never transmuted

pub mod archive;
pub mod buffer;
pub mod codecs;
pub mod kind;
pub mod primitive;
